//! The functional units a pipeline is built from. Each one wraps the same semantics the
//! interpreter's execution units use; only the way operands arrive differs.

use std::convert::TryFrom;

use super::FunctionalUnit;
use crate::bytecode::{ArithmeticOp, CompareOp, DecodedInstruction, Instruction};
use crate::error::{CoreError, Result};
use crate::memory::Segment;
use crate::profile::{IsaProfile, Word};
use crate::registers::RegisterFile;
use crate::units::arithmetic::function_for;
use crate::units::compare::evaluate;
use crate::units::jump::{apply, ControlState, JumpForm};

// region Decode

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum DecodeOp {
  Decode,
}

/// Operand: the raw instruction word.
pub struct DecodeUnit;

impl FunctionalUnit for DecodeUnit {
  type Operation = DecodeOp;
  type Output    = DecodedInstruction;

  const NAME          : &'static str = "decode";
  const OPERAND_PORTS : usize        = 1;

  fn operand_count(_operation: &DecodeOp) -> usize {
    1
  }

  fn execute(&mut self, _operation: DecodeOp, operands: &[Word]) -> Result<DecodedInstruction> {
    let word = u32::try_from(operands[0]).map_err(|_| CoreError::IndexOutOfRange {
      what  : "instruction word",
      index : operands[0] as usize,
      limit : u32::MAX as usize
    })?;
    Ok(Instruction(word).decode())
  }
}

// endregion

// region Register file

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum RegisterOp {
  Read(u8),
  /// Operand: the value. Outputs the value as stored, truncated to the word width.
  Write(u8),
}

pub struct RegisterFileUnit {
  registers: RegisterFile,
}

impl RegisterFileUnit {
  pub fn new(profile: &IsaProfile) -> RegisterFileUnit {
    RegisterFileUnit { registers: RegisterFile::new(profile) }
  }

  pub fn with_registers(registers: RegisterFile) -> RegisterFileUnit {
    RegisterFileUnit { registers }
  }

  pub fn registers(&self) -> &RegisterFile {
    &self.registers
  }
}

impl FunctionalUnit for RegisterFileUnit {
  type Operation = RegisterOp;
  type Output    = Word;

  const NAME          : &'static str = "register file";
  const OPERAND_PORTS : usize        = 1;

  fn operand_count(operation: &RegisterOp) -> usize {
    match operation {
      RegisterOp::Read(_)  => 0,
      RegisterOp::Write(_) => 1,
    }
  }

  fn execute(&mut self, operation: RegisterOp, operands: &[Word]) -> Result<Word> {
    match operation {
      RegisterOp::Read(index)  => Ok(self.registers.get(index)),
      RegisterOp::Write(index) => {
        self.registers.set(index, operands[0])?;
        Ok(self.registers.get(index))
      }
    }
  }
}

// endregion

// region Arithmetic

/// Operands: the two arguments. For immediate forms the first is the destination register's
/// value and the second the immediate.
pub struct ArithmeticUnit {
  mask: Word,
}

impl ArithmeticUnit {
  pub fn new(profile: &IsaProfile) -> ArithmeticUnit {
    ArithmeticUnit { mask: profile.word_mask() }
  }
}

impl FunctionalUnit for ArithmeticUnit {
  type Operation = ArithmeticOp;
  type Output    = Word;

  const NAME          : &'static str = "arithmetic";
  const OPERAND_PORTS : usize        = 2;

  fn operand_count(_operation: &ArithmeticOp) -> usize {
    2
  }

  fn execute(&mut self, operation: ArithmeticOp, operands: &[Word]) -> Result<Word> {
    let result = function_for(operation)(operands[0] & self.mask, operands[1] & self.mask)?;
    Ok(result & self.mask)
  }
}

// endregion

// region Compare

/// Operands: the current predicate, then the two values compared. Outputs 0 or 1.
pub struct CompareUnit;

impl FunctionalUnit for CompareUnit {
  type Operation = CompareOp;
  type Output    = Word;

  const NAME          : &'static str = "compare";
  const OPERAND_PORTS : usize        = 3;

  fn operand_count(_operation: &CompareOp) -> usize {
    3
  }

  fn execute(&mut self, operation: CompareOp, operands: &[Word]) -> Result<Word> {
    Ok(evaluate(operation, operands[0] != 0, operands[1], operands[2]) as Word)
  }
}

// endregion

// region Branch

/// Where control goes after a jump.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct BranchOutcome {
  pub instruction_pointer : Word,
  pub call_pointer        : Word,
}

/**
  Owns the call stack. Operands: the instruction pointer, the predicate, and the call stack
  pointer. The call stack pointer register stays the source of truth; the unit hands back its
  new value with the new instruction pointer.
*/
pub struct BranchUnit {
  call_stack          : Segment<Word>,
  mask                : Word,
  instruction_pointer : Word,
  call_pointer        : Word,
}

impl BranchUnit {
  pub fn new(profile: &IsaProfile) -> BranchUnit {
    BranchUnit::with_call_stack(profile, Segment::new("call stack", profile.call_stack_capacity))
  }

  pub fn with_call_stack(profile: &IsaProfile, call_stack: Segment<Word>) -> BranchUnit {
    BranchUnit {
      call_stack,
      mask                : profile.word_mask(),
      instruction_pointer : 0,
      call_pointer        : profile.stack_empty(),
    }
  }

  pub fn call_stack(&self) -> &Segment<Word> {
    &self.call_stack
  }
}

impl ControlState for BranchUnit {
  fn instruction_pointer(&self) -> Word {
    self.instruction_pointer
  }

  fn set_instruction_pointer(&mut self, address: Word) -> Result<()> {
    self.instruction_pointer = address & self.mask;
    Ok(())
  }

  fn push_return_address(&mut self, address: Word) -> Result<()> {
    self.call_pointer = self.call_stack.push(self.call_pointer, address, self.mask)?;
    Ok(())
  }

  fn pop_return_address(&mut self) -> Result<Word> {
    let (address, pointer) = self.call_stack.pop(self.call_pointer, self.mask)?;
    self.call_pointer = pointer;
    Ok(address)
  }

  // Every jump sets the instruction pointer, so there is no advance to suppress here.
  fn suppress_advance(&mut self) {}

  fn word_mask(&self) -> Word {
    self.mask
  }
}

impl FunctionalUnit for BranchUnit {
  type Operation = JumpForm<Word>;
  type Output    = BranchOutcome;

  const NAME          : &'static str = "branch";
  const OPERAND_PORTS : usize        = 3;

  fn operand_count(_operation: &JumpForm<Word>) -> usize {
    3
  }

  fn execute(&mut self, operation: JumpForm<Word>, operands: &[Word]) -> Result<BranchOutcome> {
    self.instruction_pointer = operands[0];
    self.call_pointer        = operands[2];
    apply(self, operation, operands[1] != 0)?;
    Ok(BranchOutcome { instruction_pointer: self.instruction_pointer, call_pointer: self.call_pointer })
  }
}

// endregion

// region Memory controller

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum MemoryOp {
  /// Operand: the address.
  Load,
  /// Operands: the address, then the value. Outputs the value as stored.
  Store,
  /// Operand: the microcode address.
  LoadMicrocode,
  /// Operands: the microcode address, then the value. Outputs the value as stored.
  StoreMicrocode,
  /// Operands: the stack pointer, then the value. Outputs the new stack pointer.
  Push,
  /// Operand: the stack pointer. Outputs the new stack pointer; read the value with `Peek` first.
  Pop,
  /// Operand: the stack pointer. Outputs the value on top of the stack.
  Peek,
}

/**
  Owns data RAM, the data stack, and microcode. The stack pointer register stays the source of
  truth, as with the branch unit's call stack: stack operations take the pointer in and hand the
  new pointer back.
*/
pub struct MemoryControllerUnit {
  data      : Segment<Word>,
  stack     : Segment<Word>,
  microcode : Segment<Word>,
  mask      : Word,
}

impl MemoryControllerUnit {
  pub fn new(profile: &IsaProfile) -> MemoryControllerUnit {
    MemoryControllerUnit::with_segments(
      profile,
      Segment::new("data", profile.data_capacity),
      Segment::new("stack", profile.stack_capacity),
      Segment::new("microcode", profile.microcode_capacity)
    )
  }

  pub fn with_segments(
      profile   : &IsaProfile,
      data      : Segment<Word>,
      stack     : Segment<Word>,
      microcode : Segment<Word>
    ) -> MemoryControllerUnit
  {
    MemoryControllerUnit { data, stack, microcode, mask: profile.word_mask() }
  }

  pub fn data(&self) -> &Segment<Word> {
    &self.data
  }

  pub fn stack(&self) -> &Segment<Word> {
    &self.stack
  }

  pub fn microcode(&self) -> &Segment<Word> {
    &self.microcode
  }
}

impl FunctionalUnit for MemoryControllerUnit {
  type Operation = MemoryOp;
  type Output    = Word;

  const NAME          : &'static str = "memory controller";
  const OPERAND_PORTS : usize        = 2;

  fn operand_count(operation: &MemoryOp) -> usize {
    match operation {
      MemoryOp::Load
      | MemoryOp::LoadMicrocode
      | MemoryOp::Pop
      | MemoryOp::Peek => 1,

      MemoryOp::Store
      | MemoryOp::StoreMicrocode
      | MemoryOp::Push => 2,
    }
  }

  fn execute(&mut self, operation: MemoryOp, operands: &[Word]) -> Result<Word> {
    match operation {
      MemoryOp::Load           => self.data.load(operands[0]),
      MemoryOp::Store          => {
        let value = operands[1] & self.mask;
        self.data.store(operands[0], value)?;
        Ok(value)
      }
      MemoryOp::LoadMicrocode  => self.microcode.load(operands[0]),
      MemoryOp::StoreMicrocode => {
        let value = operands[1] & self.mask;
        self.microcode.store(operands[0], value)?;
        Ok(value)
      }
      MemoryOp::Push           => self.stack.push(operands[0], operands[1] & self.mask, self.mask),
      MemoryOp::Pop            => self.stack.pop(operands[0], self.mask).map(|(_, pointer)| pointer),
      MemoryOp::Peek           => self.stack.peek(operands[0]),
    }
  }
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{Combinator, JumpOp, Relation};
  use crate::units::jump::jump_form;

  const COMPACT: IsaProfile = IsaProfile::COMPACT16;

  #[test]
  fn decode_unit_decodes(){
    let mut unit = DecodeUnit;
    let instruction = DecodedInstruction::arithmetic(ArithmeticOp::Add, 6, 7, 8);
    let word = instruction.encode().bits() as Word;
    assert_eq!(unit.execute(DecodeOp::Decode, &[word]).unwrap(), instruction);
    assert!(unit.execute(DecodeOp::Decode, &[1 << 40]).is_err());
  }

  #[test]
  fn arithmetic_unit_masks(){
    let mut unit = ArithmeticUnit::new(&COMPACT);
    assert_eq!(unit.execute(ArithmeticOp::Add, &[0xFFFF, 2]).unwrap(), 1);
    assert_eq!(unit.execute(ArithmeticOp::BinaryNot, &[0, 0]).unwrap(), 0xFFFF);
  }

  #[test]
  fn compare_unit_combines(){
    let mut unit = CompareUnit;
    let ge_and   = CompareOp::new(Relation::GreaterThanOrEqual, Combinator::And);
    assert_eq!(unit.execute(ge_and, &[1, 5, 5]).unwrap(), 1);
    assert_eq!(unit.execute(ge_and, &[0, 5, 5]).unwrap(), 0);
  }

  #[test]
  fn branch_unit_calls_and_returns(){
    let mut unit = BranchUnit::new(&COMPACT);
    let call     = jump_form(JumpOp::Call, &DecodedInstruction::jump_immediate(JumpOp::Call, 0x30))
                     .try_map(|_| Ok(0x30)).unwrap();

    let outcome = unit.execute(call, &[7, 0, 0xFFFF]).unwrap();
    assert_eq!(outcome, BranchOutcome { instruction_pointer: 0x30, call_pointer: 0 });
    assert_eq!(unit.call_stack().load(0).unwrap(), 8);

    let outcome = unit.execute(JumpForm::Return, &[0x35, 0, outcome.call_pointer]).unwrap();
    assert_eq!(outcome, BranchOutcome { instruction_pointer: 8, call_pointer: 0xFFFF });

    let not_taken = JumpForm::Conditional { call: true, when: true, target: 0x99 };
    let outcome   = unit.execute(not_taken, &[8, 0, 0xFFFF]).unwrap();
    assert_eq!(outcome, BranchOutcome { instruction_pointer: 9, call_pointer: 0xFFFF });

    assert!(unit.execute(JumpForm::Return, &[9, 0, 0xFFFF]).is_err());
  }

  #[test]
  fn memory_controller_is_bounds_checked(){
    let mut unit = MemoryControllerUnit::new(&COMPACT);
    assert_eq!(unit.execute(MemoryOp::Store, &[0x10, 0x1_0005]).unwrap(), 5);
    assert_eq!(unit.execute(MemoryOp::Load, &[0x10]).unwrap(), 5);
    assert!(matches!(
      unit.execute(MemoryOp::Load, &[0xF000]),
      Err(CoreError::AddressOutOfRange { segment: "data", .. })
    ));
    assert_eq!(unit.data().load(0x10).unwrap(), 5);
  }

  #[test]
  fn memory_controller_hands_back_the_stack_pointer(){
    let mut unit  = MemoryControllerUnit::new(&COMPACT);
    let empty     = COMPACT.stack_empty();

    let pointer = unit.execute(MemoryOp::Push, &[empty, 0x1_0007]).unwrap();
    assert_eq!(pointer, 0);
    assert_eq!(unit.stack().load(0).unwrap(), 7);
    let pointer = unit.execute(MemoryOp::Push, &[pointer, 9]).unwrap();
    assert_eq!(pointer, 1);

    assert_eq!(unit.execute(MemoryOp::Peek, &[pointer]).unwrap(), 9);
    let pointer = unit.execute(MemoryOp::Pop, &[pointer]).unwrap();
    assert_eq!(unit.execute(MemoryOp::Peek, &[pointer]).unwrap(), 7);
    assert_eq!(unit.execute(MemoryOp::Pop, &[pointer]).unwrap(), empty);

    assert!(matches!(
      unit.execute(MemoryOp::Pop, &[empty]),
      Err(CoreError::AddressOutOfRange { segment: "stack", .. })
    ));
  }

  #[test]
  fn memory_controller_microcode(){
    let mut unit = MemoryControllerUnit::new(&IsaProfile::WIDE64);
    assert_eq!(unit.execute(MemoryOp::StoreMicrocode, &[3, 42]).unwrap(), 42);
    assert_eq!(unit.execute(MemoryOp::LoadMicrocode, &[3]).unwrap(), 42);
    assert_eq!(unit.microcode().load(3).unwrap(), 42);

    // The compact profile has no microcode at all.
    let mut compact = MemoryControllerUnit::new(&COMPACT);
    assert!(compact.execute(MemoryOp::LoadMicrocode, &[0]).is_err());
  }

  #[test]
  fn register_file_unit_protects_constants(){
    let mut unit = RegisterFileUnit::new(&COMPACT);
    assert_eq!(unit.execute(RegisterOp::Write(7), &[0x1_0001]).unwrap(), 1);
    assert_eq!(unit.execute(RegisterOp::Read(1), &[]).unwrap(), 1);
    assert!(unit.execute(RegisterOp::Write(1), &[0]).is_err());
  }
}
