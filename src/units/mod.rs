/*!
  The execution units. Each instruction group has a 32-slot table indexed by the operation code;
  a slot is either an operation the unit implements or empty. The tables are built once, are
  immutable afterward, and are shared by every core. Dispatch picks the table by group and the
  slot by op, and an empty slot is that group's "invalid operation" error.
*/

pub mod arithmetic;
pub mod compare;
pub mod jump;
pub mod misc;
pub mod movement;
pub mod syscall;

use std::convert::TryFrom;

use crate::bytecode::{CompareOp, DecodedInstruction, Group, JumpOp, MiscOp, MoveOp, OP_SLOTS};
use crate::error::{CoreError, Result};
use crate::machine::Core;

use arithmetic::ArithmeticEntry;

/// Number of groups with an execution unit. Group codes at or above this fail at dispatch.
pub const IMPLEMENTED_GROUPS: usize = 5;

#[derive(Clone, Copy, Debug)]
pub struct DispatchTable<T> {
  slots: [Option<T>; OP_SLOTS],
}

impl<T: Copy> DispatchTable<T> {
  /// Fills slot `i` with `build(i)`.
  pub fn from_fn<F>(build: F) -> DispatchTable<T>
    where F: Fn(u8) -> Option<T>
  {
    let mut slots = [None; OP_SLOTS];
    for (code, slot) in slots.iter_mut().enumerate() {
      *slot = build(code as u8);
    }
    DispatchTable { slots }
  }

  pub fn lookup(&self, op: u8) -> Option<T> {
    self.slots.get(op as usize).copied().flatten()
  }

  /// How many of the 32 slots hold an operation.
  pub fn implemented(&self) -> usize {
    self.slots.iter().filter(|slot| slot.is_some()).count()
  }
}

lazy_static! {
  static ref ARITHMETIC_UNIT: DispatchTable<ArithmeticEntry> =
    DispatchTable::from_fn(arithmetic::entry_for);
  static ref MOVE_UNIT: DispatchTable<MoveOp> =
    DispatchTable::from_fn(|code| MoveOp::try_from(code).ok());
  static ref JUMP_UNIT: DispatchTable<JumpOp> =
    DispatchTable::from_fn(|code| JumpOp::try_from(code).ok());
  static ref COMPARE_UNIT: DispatchTable<CompareOp> =
    DispatchTable::from_fn(|code| CompareOp::try_from(code).ok());
  static ref MISC_UNIT: DispatchTable<MiscOp> =
    DispatchTable::from_fn(|code| MiscOp::try_from(code).ok());
}

/// The five unit tables a core dispatches through.
#[derive(Clone, Copy)]
pub struct ExecutionUnits {
  pub arithmetic : &'static DispatchTable<ArithmeticEntry>,
  pub movement   : &'static DispatchTable<MoveOp>,
  pub jump       : &'static DispatchTable<JumpOp>,
  pub compare    : &'static DispatchTable<CompareOp>,
  pub misc       : &'static DispatchTable<MiscOp>,
}

impl ExecutionUnits {
  pub fn standard() -> ExecutionUnits {
    ExecutionUnits {
      arithmetic : &*ARITHMETIC_UNIT,
      movement   : &*MOVE_UNIT,
      jump       : &*JUMP_UNIT,
      compare    : &*COMPARE_UNIT,
      misc       : &*MISC_UNIT,
    }
  }
}

impl Core {
  /// Routes `instruction` to the unit for its group.
  pub(crate) fn dispatch(&mut self, instruction: &DecodedInstruction) -> Result<()> {
    let units = self.units();
    let op    = instruction.op();
    let group =
      instruction
        .decoded_group()
        .ok_or(CoreError::IndexOutOfRange {
          what  : "instruction group",
          index : instruction.group() as usize,
          limit : IMPLEMENTED_GROUPS
        })?;

    match group {

      Group::Arithmetic => {
        let entry = units.arithmetic.lookup(op).ok_or(CoreError::NotImplemented { group: "arithmetic", op })?;
        arithmetic::execute(self, &entry, instruction)
      }

      Group::Move => {
        let operation = units.movement.lookup(op).ok_or(CoreError::InvalidMoveOperation(op))?;
        movement::execute(self, operation, instruction)
      }

      Group::Jump => {
        let operation = units.jump.lookup(op).ok_or(CoreError::IllegalJumpOperation(op))?;
        jump::execute(self, operation, instruction)
      }

      Group::Compare => {
        let operation = units.compare.lookup(op).ok_or(CoreError::InvalidCompareOperation(op))?;
        compare::execute(self, operation, instruction)
      }

      Group::Misc => {
        let operation = units.misc.lookup(op).ok_or(CoreError::InvalidMiscOperation(op))?;
        misc::execute(self, operation, instruction)
      }

    } // end match on group
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::profile::IsaProfile;

  #[test]
  fn table_population(){
    let units = ExecutionUnits::standard();
    assert_eq!(units.arithmetic.implemented(), 22);
    assert_eq!(units.movement.implemented(), 19);
    assert_eq!(units.jump.implemented(), 17);
    assert_eq!(units.compare.implemented(), 24);
    assert_eq!(units.misc.implemented(), 1);
    assert_eq!(units.compare.lookup(24), None);
    assert_eq!(units.jump.lookup(200), None);
  }

  #[test]
  fn empty_slots_fail_with_the_group_error(){
    let mut core = Core::new(IsaProfile::COMPACT16);
    let cases = [
      (Group::Arithmetic, 31u8),
      (Group::Move,       31),
      (Group::Jump,       31),
      (Group::Compare,    24),
      (Group::Misc,       1),
    ];
    for (group, op) in cases.iter() {
      let instruction = DecodedInstruction::new((*group).into(), *op, [6, 7, 8]).unwrap();
      let error = core.dispatch(&instruction).unwrap_err();
      let expected = match group {
        Group::Arithmetic => matches!(error, CoreError::NotImplemented { group: "arithmetic", op: 31 }),
        Group::Move       => matches!(error, CoreError::InvalidMoveOperation(31)),
        Group::Jump       => matches!(error, CoreError::IllegalJumpOperation(31)),
        Group::Compare    => matches!(error, CoreError::InvalidCompareOperation(24)),
        Group::Misc       => matches!(error, CoreError::InvalidMiscOperation(1)),
      };
      assert!(expected, "{:?} op {} gave {:?}", group, op, error);
    }
  }

  #[test]
  fn unimplemented_groups_are_out_of_range(){
    let mut core = Core::new(IsaProfile::COMPACT16);
    for group in 5..8u8 {
      let instruction = DecodedInstruction::new(group, 0, [0, 0, 0]).unwrap();
      assert!(matches!(
        core.dispatch(&instruction),
        Err(CoreError::IndexOutOfRange { index, limit: IMPLEMENTED_GROUPS, .. }) if index == group as usize
      ));
    }
  }
}
