use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use super::operation::*;
use super::binary::{decode_instruction, encode_instruction};
use crate::error::{CoreError, Result};

/// The raw 32 bit instruction word as it sits in code memory.
#[derive(Clone, Copy, Default, Eq, PartialEq, Debug, Hash)]
pub struct Instruction(pub u32);

impl Instruction {
  pub fn decode(self) -> DecodedInstruction {
    decode_instruction(self)
  }

  pub fn bits(self) -> u32 {
    self.0
  }
}

impl From<u32> for Instruction {
  fn from(word: u32) -> Self {
    Instruction(word)
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.decode())
  }
}

/**
  The unencoded components of an instruction. Any combination of `group < 8` and `op < 32` is
  representable; whether the operation exists is decided at dispatch, not here.

  ```text
    [op:5|group:3][dest:8][src0:8][src1:8]
    [op:5|group:3][dest:8][imm low:8][imm high:8]
  ```
*/
#[derive(Clone, Copy, Default, Eq, PartialEq, Debug, Hash)]
pub struct DecodedInstruction {
  group : u8,
  op    : u8,
  data  : [u8; 3],
}

impl DecodedInstruction {
  pub const GROUP_BITS : u32 = 3;
  pub const OP_BITS    : u32 = 5;

  /// Rejects a `group` or `op` wider than its bit field.
  pub fn new(group: u8, op: u8, data: [u8; 3]) -> Result<DecodedInstruction> {
    if group as usize >= GROUP_SLOTS {
      return Err(CoreError::IndexOutOfRange { what: "group", index: group as usize, limit: GROUP_SLOTS });
    }
    if op as usize >= OP_SLOTS {
      return Err(CoreError::IndexOutOfRange { what: "operation", index: op as usize, limit: OP_SLOTS });
    }
    Ok(DecodedInstruction { group, op, data })
  }

  /// Only for callers that have already masked `group` and `op` to their widths.
  pub(crate) fn from_fields(group: u8, op: u8, data: [u8; 3]) -> DecodedInstruction {
    debug_assert!((group as usize) < GROUP_SLOTS && (op as usize) < OP_SLOTS);
    DecodedInstruction { group, op, data }
  }

  pub fn encode(&self) -> Instruction {
    encode_instruction(*self)
  }

  pub fn group(&self) -> u8 { self.group }
  pub fn op(&self)    -> u8 { self.op }
  pub fn data(&self)  -> [u8; 3] { self.data }

  pub fn dest(&self)  -> u8 { self.data[0] }
  pub fn src0(&self)  -> u8 { self.data[1] }
  pub fn src1(&self)  -> u8 { self.data[2] }

  /// The 16 bit immediate packed little-endian in the last two operand bytes.
  pub fn immediate(&self) -> u16 {
    ((self.data[2] as u16) << 8) | self.data[1] as u16
  }

  /// Operand byte by position.
  pub fn operand(&self, position: usize) -> Result<u8> {
    self.data.get(position).copied().ok_or(CoreError::DecodeRange(position))
  }

  pub fn decoded_group(&self) -> Option<Group> {
    Group::try_from(self.group).ok()
  }

  // region Builders

  fn with_registers(group: Group, op: u8, dest: u8, src0: u8, src1: u8) -> DecodedInstruction {
    DecodedInstruction::from_fields(group.into(), op, [dest, src0, src1])
  }

  fn with_immediate(group: Group, op: u8, dest: u8, immediate: u16) -> DecodedInstruction {
    let [low, high] = immediate.to_le_bytes();
    DecodedInstruction::from_fields(group.into(), op, [dest, low, high])
  }

  pub fn arithmetic(op: ArithmeticOp, dest: u8, src0: u8, src1: u8) -> DecodedInstruction {
    Self::with_registers(Group::Arithmetic, op.code(), dest, src0, src1)
  }

  /// `dest <- dest (op) immediate`
  pub fn arithmetic_immediate(op: ArithmeticOp, dest: u8, immediate: u16) -> DecodedInstruction {
    Self::with_immediate(Group::Arithmetic, op.code(), dest, immediate)
  }

  pub fn movement(op: MoveOp, dest: u8, src0: u8) -> DecodedInstruction {
    Self::with_registers(Group::Move, op.code(), dest, src0, 0)
  }

  pub fn movement_immediate(op: MoveOp, dest: u8, immediate: u16) -> DecodedInstruction {
    Self::with_immediate(Group::Move, op.code(), dest, immediate)
  }

  /// Register-form and select-form jumps; `target` is `dest`, the select registers are the
  /// two source bytes.
  pub fn jump(op: JumpOp, target: u8, then_register: u8, else_register: u8) -> DecodedInstruction {
    Self::with_registers(Group::Jump, op.code(), target, then_register, else_register)
  }

  pub fn jump_immediate(op: JumpOp, address: u16) -> DecodedInstruction {
    Self::with_immediate(Group::Jump, op.code(), 0, address)
  }

  /// Compares always target the predicate register, so `dest` is left zero.
  pub fn compare(op: CompareOp, src0: u8, src1: u8) -> DecodedInstruction {
    Self::with_registers(Group::Compare, op.code(), 0, src0, src1)
  }

  pub fn system_call(selector: u8, src0: u8, src1: u8) -> DecodedInstruction {
    Self::with_registers(Group::Misc, MiscOp::SystemCall.into(), selector, src0, src1)
  }

  pub fn system_call_immediate(selector: u8, immediate: u16) -> DecodedInstruction {
    Self::with_immediate(Group::Misc, MiscOp::SystemCall.into(), selector, immediate)
  }

  pub fn terminate() -> DecodedInstruction {
    Self::system_call(SystemCommand::Terminate.into(), 0, 0)
  }

  // endregion

  fn write_operands(&self, f: &mut Formatter<'_>, layout: OperandLayout) -> std::fmt::Result {
    match layout {
      OperandLayout::Three         => write!(f, " r{}, r{}, r{}", self.dest(), self.src0(), self.src1()),
      OperandLayout::Two           => write!(f, " r{}, r{}", self.dest(), self.src0()),
      OperandLayout::One           => write!(f, " r{}", self.dest()),
      OperandLayout::Pair          => write!(f, " r{}, r{}", self.src0(), self.src1()),
      OperandLayout::DestImmediate => write!(f, " r{}, {:#06x}", self.dest(), self.immediate()),
      OperandLayout::Immediate     => write!(f, " {:#06x}", self.immediate()),
      OperandLayout::None          => Ok(())
    }
  }
}

/// Disassembly. Operations without a variant print as a raw `.word`.
impl Display for DecodedInstruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let named: Option<(String, OperandLayout)> =
      match self.decoded_group() {
        Some(Group::Arithmetic) => ArithmeticOp::try_from(self.op).ok().map(|op| (op.to_string(), op.layout())),
        Some(Group::Move)       => MoveOp::try_from(self.op).ok().map(|op| (op.to_string(), op.layout())),
        Some(Group::Jump)       => JumpOp::try_from(self.op).ok().map(|op| (op.to_string(), op.layout())),
        Some(Group::Compare)    => CompareOp::try_from(self.op).ok().map(|op| (op.to_string(), op.layout())),
        Some(Group::Misc)       => MiscOp::try_from(self.op).ok().map(|op| (op.to_string(), op.layout())),
        None                    => None
      };

    match named {
      Some((mnemonic, layout)) => {
        write!(f, "{}", mnemonic)?;
        self.write_operands(f, layout)
      }
      None => write!(f, ".word {:#010x}", self.encode().bits())
    }
  }
}
