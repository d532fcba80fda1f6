//! The move unit. Every move operation is one of five transfers between places; `transfer`
//! names the places an instruction touches and `execute` carries it out.

use crate::bytecode::{DecodedInstruction, MoveOp};
use crate::error::Result;
use crate::machine::Core;
use crate::operand::{Operand, Place};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transfer {
  Copy { dest: Place, source: Operand },
  Swap(Place, Place),
  Push(Operand),
  Pop(Place),
  Peek(Place),
}

pub fn transfer(op: MoveOp, instruction: &DecodedInstruction) -> Transfer {
  use Place::{Memory, MemoryAt, Microcode, Register};

  let dest      = instruction.dest();
  let src0      = instruction.src0();
  let immediate = instruction.immediate();

  match op {
    MoveOp::Move                  => Transfer::Copy { dest: Register(dest), source: Register(src0).into() },
    MoveOp::Swap                  => Transfer::Swap(Register(dest), Register(src0)),
    MoveOp::SwapRegMem            => Transfer::Swap(Register(dest), Memory(src0)),
    MoveOp::SwapMemMem            => Transfer::Swap(Memory(dest), Memory(src0)),
    MoveOp::SwapRegAddr           => Transfer::Swap(Register(dest), MemoryAt(immediate)),
    MoveOp::SwapMemAddr           => Transfer::Swap(Memory(dest), MemoryAt(immediate)),
    MoveOp::Set                   => Transfer::Copy { dest: Register(dest), source: Operand::Literal(immediate) },
    MoveOp::Load                  => Transfer::Copy { dest: Register(dest), source: Memory(src0).into() },
    MoveOp::LoadImmediate         => Transfer::Copy { dest: Register(dest), source: MemoryAt(immediate).into() },
    MoveOp::Store                 => Transfer::Copy { dest: Memory(dest), source: Register(src0).into() },
    MoveOp::StoreMemory           => Transfer::Copy { dest: Memory(dest), source: Memory(src0).into() },
    MoveOp::StoreImmediateAddress => Transfer::Copy { dest: MemoryAt(immediate), source: Register(dest).into() },
    MoveOp::StoreImmediate        => Transfer::Copy { dest: Memory(dest), source: Operand::Literal(immediate) },
    MoveOp::Push                  => Transfer::Push(Register(dest).into()),
    MoveOp::PushImmediate         => Transfer::Push(Operand::Literal(immediate)),
    MoveOp::Pop                   => Transfer::Pop(Register(dest)),
    MoveOp::Peek                  => Transfer::Peek(Register(dest)),
    MoveOp::LoadMicrocode         => Transfer::Copy { dest: Register(dest), source: Microcode(src0).into() },
    MoveOp::StoreMicrocode        => Transfer::Copy { dest: Microcode(dest), source: Register(src0).into() },
  }
}

pub fn execute(core: &mut Core, op: MoveOp, instruction: &DecodedInstruction) -> Result<()> {
  match transfer(op, instruction) {

    Transfer::Copy { dest, source } => {
      let value = core.read_operand(source)?;
      core.write_place(dest, value)
    }

    Transfer::Swap(a, b) => {
      let first  = core.read_place(a)?;
      let second = core.read_place(b)?;
      core.write_place(a, second)?;
      if let Err(error) = core.write_place(b, first) {
        // Undo the first half so a failed swap changes nothing.
        core.write_place(a, first)?;
        return Err(error);
      }
      Ok(())
    }

    Transfer::Push(source) => {
      let value = core.read_operand(source)?;
      core.push_data(value)
    }

    // The destination is written before the pointer moves, so a refused write leaves the
    // stack as it was.
    Transfer::Pop(dest) => {
      let value = core.peek_data()?;
      core.write_place(dest, value)?;
      core.pop_data().map(|_| ())
    }

    Transfer::Peek(dest) => {
      let value = core.peek_data()?;
      core.write_place(dest, value)
    }

  }
}
