//! The arithmetic unit. Register forms compute `dest <- src0 (op) src1`; immediate forms
//! compute `dest <- dest (op) imm16`, because the immediate occupies both source bytes.
//! Results are truncated to the word width when they are written back.

use std::convert::TryFrom;

use crate::bytecode::{ArithmeticOp, DecodedInstruction};
use crate::error::{CoreError, Result};
use crate::machine::Core;
use crate::profile::Word;

pub type ArithmeticFn = fn(Word, Word) -> Result<Word>;

#[derive(Clone, Copy, Debug)]
pub struct ArithmeticEntry {
  pub op             : ArithmeticOp,
  pub immediate_form : bool,
  pub function       : ArithmeticFn,
}

pub fn entry_for(code: u8) -> Option<ArithmeticEntry> {
  let op = ArithmeticOp::try_from(code).ok()?;
  Some(ArithmeticEntry { op, immediate_form: op.is_immediate(), function: function_for(op) })
}

pub fn function_for(op: ArithmeticOp) -> ArithmeticFn {
  match op {
    | ArithmeticOp::Add
    | ArithmeticOp::AddImmediate        => add,
    | ArithmeticOp::Sub
    | ArithmeticOp::SubImmediate        => sub,
    | ArithmeticOp::Mul
    | ArithmeticOp::MulImmediate        => mul,
    | ArithmeticOp::Div
    | ArithmeticOp::DivImmediate        => div,
    | ArithmeticOp::Rem
    | ArithmeticOp::RemImmediate        => rem,
    | ArithmeticOp::ShiftLeft
    | ArithmeticOp::ShiftLeftImmediate  => shift_left,
    | ArithmeticOp::ShiftRight
    | ArithmeticOp::ShiftRightImmediate => shift_right,
    ArithmeticOp::BinaryAnd             => |a, b| Ok(a & b),
    ArithmeticOp::BinaryOr              => |a, b| Ok(a | b),
    ArithmeticOp::BinaryXor             => |a, b| Ok(a ^ b),
    ArithmeticOp::BinaryNot             => |a, _| Ok(!a),
    ArithmeticOp::Increment             => |a, _| Ok(a.wrapping_add(1)),
    ArithmeticOp::Decrement             => |a, _| Ok(a.wrapping_sub(1)),
    ArithmeticOp::Double                => |a, _| Ok(a.wrapping_mul(2)),
    ArithmeticOp::Halve                 => |a, _| Ok(a >> 1),
  }
}

fn add(a: Word, b: Word) -> Result<Word> {
  Ok(a.wrapping_add(b))
}

fn sub(a: Word, b: Word) -> Result<Word> {
  Ok(a.wrapping_sub(b))
}

fn mul(a: Word, b: Word) -> Result<Word> {
  Ok(a.wrapping_mul(b))
}

fn div(a: Word, b: Word) -> Result<Word> {
  match b {
    0 => Err(CoreError::DivideByZero),
    1 => Ok(a),
    _ => Ok(a / b)
  }
}

fn rem(a: Word, b: Word) -> Result<Word> {
  match b {
    0 => Err(CoreError::DivideByZero),
    1 => Ok(0),
    _ => Ok(a % b)
  }
}

/// Shifting by the word width or more leaves nothing.
fn shift_left(a: Word, b: Word) -> Result<Word> {
  match b < Word::BITS as Word {
    true  => Ok(a << b),
    false => Ok(0)
  }
}

fn shift_right(a: Word, b: Word) -> Result<Word> {
  match b < Word::BITS as Word {
    true  => Ok(a >> b),
    false => Ok(0)
  }
}

pub fn execute(core: &mut Core, entry: &ArithmeticEntry, instruction: &DecodedInstruction) -> Result<()> {
  let dest = instruction.dest();
  let (left, right) =
    match entry.immediate_form {
      true  => (core.register(dest), instruction.immediate() as Word),
      false => (core.register(instruction.src0()), core.register(instruction.src1())),
    };

  let result = (entry.function)(left, right)?;
  core.set_register(dest, result)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::profile::IsaProfile;
  use proptest::prelude::*;

  fn run(core: &mut Core, instruction: DecodedInstruction) -> Result<()> {
    core.dispatch(&instruction)
  }

  #[test]
  fn register_forms(){
    let mut core = Core::new(IsaProfile::COMPACT16);
    core.set_register(7, 12).unwrap();
    core.set_register(8, 5).unwrap();

    let expectations = [
      (ArithmeticOp::Add,        17),
      (ArithmeticOp::Sub,        7),
      (ArithmeticOp::Mul,        60),
      (ArithmeticOp::Div,        2),
      (ArithmeticOp::Rem,        2),
      (ArithmeticOp::ShiftLeft,  384),
      (ArithmeticOp::ShiftRight, 0),
      (ArithmeticOp::BinaryAnd,  4),
      (ArithmeticOp::BinaryOr,   13),
      (ArithmeticOp::BinaryXor,  9),
      (ArithmeticOp::BinaryNot,  0xFFF3),
      (ArithmeticOp::Increment,  13),
      (ArithmeticOp::Decrement,  11),
      (ArithmeticOp::Double,     24),
      (ArithmeticOp::Halve,      6),
    ];
    for (op, expected) in expectations.iter() {
      run(&mut core, DecodedInstruction::arithmetic(*op, 9, 7, 8)).unwrap();
      assert_eq!(core.register(9), *expected, "{}", op);
    }
  }

  #[test]
  fn immediate_forms_accumulate_into_dest(){
    let mut core = Core::new(IsaProfile::COMPACT16);
    core.set_register(7, 10).unwrap();
    run(&mut core, DecodedInstruction::arithmetic_immediate(ArithmeticOp::AddImmediate, 7, 5)).unwrap();
    assert_eq!(core.register(7), 15);
    run(&mut core, DecodedInstruction::arithmetic_immediate(ArithmeticOp::MulImmediate, 7, 4)).unwrap();
    assert_eq!(core.register(7), 60);
    run(&mut core, DecodedInstruction::arithmetic_immediate(ArithmeticOp::ShiftRightImmediate, 7, 2)).unwrap();
    assert_eq!(core.register(7), 15);
  }

  #[test]
  fn results_wrap_at_the_word_width(){
    let mut core = Core::new(IsaProfile::COMPACT16);
    core.set_register(7, 0xFFFF).unwrap();
    run(&mut core, DecodedInstruction::arithmetic(ArithmeticOp::Increment, 7, 7, 0)).unwrap();
    assert_eq!(core.register(7), 0);
    run(&mut core, DecodedInstruction::arithmetic(ArithmeticOp::Decrement, 7, 7, 0)).unwrap();
    assert_eq!(core.register(7), 0xFFFF);

    let mut wide = Core::new(IsaProfile::WIDE64);
    wide.set_register(9, u64::MAX).unwrap();
    run(&mut wide, DecodedInstruction::arithmetic(ArithmeticOp::Double, 9, 9, 0)).unwrap();
    assert_eq!(wide.register(9), u64::MAX - 1);
  }

  #[test]
  fn division_by_zero_leaves_dest_untouched(){
    let mut core = Core::new(IsaProfile::WIDE64);
    core.set_register(9, 33).unwrap();
    for op in [ArithmeticOp::Div, ArithmeticOp::Rem].iter() {
      assert!(matches!(
        run(&mut core, DecodedInstruction::arithmetic(*op, 9, 9, 0)),
        Err(CoreError::DivideByZero)
      ));
      assert_eq!(core.register(9), 33);
    }
    assert!(matches!(
      run(&mut core, DecodedInstruction::arithmetic_immediate(ArithmeticOp::DivImmediate, 9, 0)),
      Err(CoreError::DivideByZero)
    ));
  }

  #[test]
  fn writing_a_constant_register_fails(){
    let mut core = Core::new(IsaProfile::COMPACT16);
    assert!(matches!(
      run(&mut core, DecodedInstruction::arithmetic(ArithmeticOp::Add, 1, 1, 1)),
      Err(CoreError::WriteProtected(1))
    ));
  }

  #[test]
  fn wide_shifts_clear(){
    assert_eq!(shift_left(1, 64).unwrap(), 0);
    assert_eq!(shift_right(u64::MAX, 200).unwrap(), 0);
    assert_eq!(shift_left(1, 63).unwrap(), 1 << 63);

    let mut core = Core::new(IsaProfile::COMPACT16);
    core.set_register(7, 0xFF).unwrap();
    run(&mut core, DecodedInstruction::arithmetic_immediate(ArithmeticOp::ShiftLeftImmediate, 7, 16)).unwrap();
    assert_eq!(core.register(7), 0);
  }

  proptest! {
    #[test]
    fn division_identities(a in any::<u64>(), b in any::<u64>()) {
      prop_assert_eq!(div(a, 1).unwrap(), a);
      prop_assert_eq!(rem(a, 1).unwrap(), 0);
      if b != 0 {
        let q = div(a, b).unwrap();
        let r = rem(a, b).unwrap();
        prop_assert!(r < b);
        prop_assert_eq!(q.wrapping_mul(b).wrapping_add(r), a);
      }
    }

    #[test]
    fn add_then_sub_restores(a in any::<u64>(), b in any::<u64>()) {
      prop_assert_eq!(sub(add(a, b).unwrap(), b).unwrap(), a);
    }
  }
}
