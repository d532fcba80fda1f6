/*!
  The jump unit. Every jump operation sets the instruction pointer itself, so the run loop's
  automatic advance is suppressed for all of them, including a conditional that is not taken
  (which sets `ip + 1` explicitly).

  A call pushes `ip + 1` on the call stack before jumping; `return` pops it. The primitives are
  generic over `ControlState` so the branch functional unit shares them with the interpreter.
*/

use crate::bytecode::{DecodedInstruction, JumpOp};
use crate::error::Result;
use crate::machine::Core;
use crate::operand::{Operand, Place};
use crate::profile::Word;

/// The control-flow state a jump reads and writes.
pub trait ControlState {
  fn instruction_pointer(&self) -> Word;
  fn set_instruction_pointer(&mut self, address: Word) -> Result<()>;
  fn push_return_address(&mut self, address: Word) -> Result<()>;
  fn pop_return_address(&mut self) -> Result<Word>;
  fn suppress_advance(&mut self);
  fn word_mask(&self) -> Word;

  fn next_address(&self) -> Word {
    self.instruction_pointer().wrapping_add(1) & self.word_mask()
  }
}

/// The shape of a jump with its targets still abstract: operands before they are read, or
/// addresses after.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JumpForm<T> {
  Unconditional { call: bool, target: T },
  /// Taken when the predicate equals `when`.
  Conditional   { call: bool, when: bool, target: T },
  /// Goes to `then` when the predicate equals `when`, to `otherwise` when it does not.
  Select        { call: bool, when: bool, then: T, otherwise: T },
  Return,
}

impl<T> JumpForm<T> {
  pub fn try_map<U, F>(self, mut f: F) -> Result<JumpForm<U>>
    where F: FnMut(T) -> Result<U>
  {
    Ok(
      match self {
        JumpForm::Unconditional { call, target }           => JumpForm::Unconditional { call, target: f(target)? },
        JumpForm::Conditional { call, when, target }       => JumpForm::Conditional { call, when, target: f(target)? },
        JumpForm::Select { call, when, then, otherwise }   => {
          let then      = f(then)?;
          let otherwise = f(otherwise)?;
          JumpForm::Select { call, when, then, otherwise }
        }
        JumpForm::Return                                   => JumpForm::Return,
      }
    )
  }

  pub fn is_call(&self) -> bool {
    match self {
      | JumpForm::Unconditional { call, .. }
      | JumpForm::Conditional { call, .. }
      | JumpForm::Select { call, .. } => *call,
      JumpForm::Return                => false,
    }
  }
}

/// Immediate forms jump to the 16 bit immediate, register forms to the address in `dest`,
/// selects to the address in `src0` or `src1`.
pub fn jump_form(op: JumpOp, instruction: &DecodedInstruction) -> JumpForm<Operand> {
  let literal  = Operand::Literal(instruction.immediate());
  let register = Operand::Place(Place::Register(instruction.dest()));
  let then      = Operand::Place(Place::Register(instruction.src0()));
  let otherwise = Operand::Place(Place::Register(instruction.src1()));

  match op {
    JumpOp::Branch                => JumpForm::Unconditional { call: false, target: literal },
    JumpOp::BranchRegister        => JumpForm::Unconditional { call: false, target: register },
    JumpOp::Call                  => JumpForm::Unconditional { call: true,  target: literal },
    JumpOp::CallRegister          => JumpForm::Unconditional { call: true,  target: register },

    JumpOp::BranchIfTrue          => JumpForm::Conditional { call: false, when: true,  target: literal },
    JumpOp::BranchIfTrueRegister  => JumpForm::Conditional { call: false, when: true,  target: register },
    JumpOp::CallIfTrue            => JumpForm::Conditional { call: true,  when: true,  target: literal },
    JumpOp::CallIfTrueRegister    => JumpForm::Conditional { call: true,  when: true,  target: register },

    JumpOp::BranchIfFalse         => JumpForm::Conditional { call: false, when: false, target: literal },
    JumpOp::BranchIfFalseRegister => JumpForm::Conditional { call: false, when: false, target: register },
    JumpOp::CallIfFalse           => JumpForm::Conditional { call: true,  when: false, target: literal },
    JumpOp::CallIfFalseRegister   => JumpForm::Conditional { call: true,  when: false, target: register },

    JumpOp::SelectIfTrue          => JumpForm::Select { call: false, when: true,  then, otherwise },
    JumpOp::SelectIfFalse         => JumpForm::Select { call: false, when: false, then, otherwise },
    JumpOp::SelectCallIfTrue      => JumpForm::Select { call: true,  when: true,  then, otherwise },
    JumpOp::SelectCallIfFalse     => JumpForm::Select { call: true,  when: false, then, otherwise },

    JumpOp::Return                => JumpForm::Return,
  }
}

// region Primitives

pub fn branch<S>(state: &mut S, address: Word, is_call: bool) -> Result<()>
  where S: ControlState + ?Sized
{
  if is_call {
    let return_address = state.next_address();
    state.push_return_address(return_address)?;
  }
  state.set_instruction_pointer(address)?;
  state.suppress_advance();
  Ok(())
}

pub fn conditional<S>(state: &mut S, condition: bool, address: Word, is_call: bool) -> Result<()>
  where S: ControlState + ?Sized
{
  match condition {
    true  => branch(state, address, is_call),
    false => {
      let next = state.next_address();
      state.set_instruction_pointer(next)?;
      state.suppress_advance();
      Ok(())
    }
  }
}

pub fn select<S>(state: &mut S, condition: bool, then: Word, otherwise: Word, is_call: bool) -> Result<()>
  where S: ControlState + ?Sized
{
  let address = if condition { then } else { otherwise };
  branch(state, address, is_call)
}

pub fn return_from_call<S>(state: &mut S) -> Result<()>
  where S: ControlState + ?Sized
{
  let address = state.pop_return_address()?;
  state.set_instruction_pointer(address)?;
  state.suppress_advance();
  Ok(())
}

// endregion

/// Carries out a jump whose targets have been resolved to addresses.
pub fn apply<S>(state: &mut S, form: JumpForm<Word>, predicate: bool) -> Result<()>
  where S: ControlState + ?Sized
{
  match form {
    JumpForm::Unconditional { call, target }         => branch(state, target, call),
    JumpForm::Conditional { call, when, target }     => conditional(state, predicate == when, target, call),
    JumpForm::Select { call, when, then, otherwise } => select(state, predicate == when, then, otherwise, call),
    JumpForm::Return                                 => return_from_call(state),
  }
}

pub fn execute(core: &mut Core, op: JumpOp, instruction: &DecodedInstruction) -> Result<()> {
  let form      = jump_form(op, instruction).try_map(|operand| core.read_operand(operand))?;
  let predicate = core.predicate();
  apply(core, form, predicate)
}

impl ControlState for Core {
  fn instruction_pointer(&self) -> Word {
    Core::instruction_pointer(self)
  }

  fn set_instruction_pointer(&mut self, address: Word) -> Result<()> {
    Core::set_instruction_pointer(self, address)
  }

  fn push_return_address(&mut self, address: Word) -> Result<()> {
    self.push_call(address)
  }

  fn pop_return_address(&mut self) -> Result<Word> {
    self.pop_call()
  }

  fn suppress_advance(&mut self) {
    Core::suppress_advance(self)
  }

  fn word_mask(&self) -> Word {
    self.profile().word_mask()
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CoreError;
  use crate::profile::IsaProfile;
  use proptest::prelude::*;

  fn core_at(ip: Word) -> Core {
    let mut core = Core::new(IsaProfile::COMPACT16);
    core.set_instruction_pointer(ip).unwrap();
    core
  }

  fn jump(core: &mut Core, instruction: DecodedInstruction) -> Result<bool> {
    core.dispatch(&instruction)?;
    Ok(core.take_advance())
  }

  #[test]
  fn unconditional_branch_suppresses_advance(){
    let mut core = core_at(10);
    let advance = jump(&mut core, DecodedInstruction::jump_immediate(JumpOp::Branch, 0x40)).unwrap();
    assert!(!advance);
    assert_eq!(core.instruction_pointer(), 0x40);

    core.set_register(6, 0x80).unwrap();
    jump(&mut core, DecodedInstruction::jump(JumpOp::BranchRegister, 6, 0, 0)).unwrap();
    assert_eq!(core.instruction_pointer(), 0x80);
  }

  #[test]
  fn call_and_return_are_disciplined(){
    let mut core    = core_at(10);
    let csp         = core.profile().registers.call_pointer;
    let csp_before  = core.register(csp);

    jump(&mut core, DecodedInstruction::jump_immediate(JumpOp::Call, 0x100)).unwrap();
    assert_eq!(core.instruction_pointer(), 0x100);
    assert_eq!(core.memory().call_stack.load(0).unwrap(), 11);

    jump(&mut core, DecodedInstruction::jump(JumpOp::Return, 0, 0, 0)).unwrap();
    assert_eq!(core.instruction_pointer(), 11);
    assert_eq!(core.register(csp), csp_before);
  }

  proptest! {
    #[test]
    fn call_then_return_resumes_after_the_call(
      wide             in any::<bool>(),
      through_register in any::<bool>(),
      ip               in any::<u64>(),
      target           in any::<u64>()
    ) {
      let profile  = if wide { IsaProfile::WIDE64 } else { IsaProfile::COMPACT16 };
      let csp      = profile.registers.call_pointer;
      let ip       = profile.mask(ip);
      let mut core = Core::new(profile);
      core.set_instruction_pointer(ip).unwrap();
      let csp_before = core.register(csp);

      let (call, expected) =
        match through_register {
          true  => {
            core.set_register(9, target).unwrap();
            (DecodedInstruction::jump(JumpOp::CallRegister, 9, 0, 0), profile.mask(target))
          }
          false => (DecodedInstruction::jump_immediate(JumpOp::Call, target as u16), target as u16 as Word),
        };

      jump(&mut core, call).unwrap();
      prop_assert_eq!(core.instruction_pointer(), expected);
      prop_assert_ne!(core.register(csp), csp_before);

      jump(&mut core, DecodedInstruction::jump(JumpOp::Return, 0, 0, 0)).unwrap();
      prop_assert_eq!(core.instruction_pointer(), profile.mask(ip.wrapping_add(1)));
      prop_assert_eq!(core.register(csp), csp_before);
    }
  }

  #[test]
  fn return_on_an_empty_call_stack_fails(){
    let mut core = core_at(3);
    assert!(matches!(
      jump(&mut core, DecodedInstruction::jump(JumpOp::Return, 0, 0, 0)),
      Err(CoreError::AddressOutOfRange { segment: "call stack", .. })
    ));
  }

  #[test]
  fn conditionals_follow_the_predicate(){
    let mut core = core_at(20);
    core.set_predicate(false).unwrap();

    // Not taken: ip + 1, nothing pushed, advance still suppressed.
    let advance = jump(&mut core, DecodedInstruction::jump_immediate(JumpOp::CallIfTrue, 0x50)).unwrap();
    assert!(!advance);
    assert_eq!(core.instruction_pointer(), 21);
    assert_eq!(core.register(core.profile().registers.call_pointer), 0xFFFF);

    jump(&mut core, DecodedInstruction::jump_immediate(JumpOp::BranchIfFalse, 0x50)).unwrap();
    assert_eq!(core.instruction_pointer(), 0x50);

    core.set_predicate(true).unwrap();
    jump(&mut core, DecodedInstruction::jump_immediate(JumpOp::CallIfTrue, 0x60)).unwrap();
    assert_eq!(core.instruction_pointer(), 0x60);
    assert_eq!(core.pop_call().unwrap(), 0x51);
  }

  #[test]
  fn selects_choose_by_polarity(){
    let mut core = core_at(0);
    core.set_register(6, 0x10).unwrap();
    core.set_register(7, 0x20).unwrap();

    core.set_predicate(true).unwrap();
    jump(&mut core, DecodedInstruction::jump(JumpOp::SelectIfTrue, 0, 6, 7)).unwrap();
    assert_eq!(core.instruction_pointer(), 0x10);
    jump(&mut core, DecodedInstruction::jump(JumpOp::SelectIfFalse, 0, 6, 7)).unwrap();
    assert_eq!(core.instruction_pointer(), 0x20);

    core.set_predicate(false).unwrap();
    jump(&mut core, DecodedInstruction::jump(JumpOp::SelectCallIfFalse, 0, 6, 7)).unwrap();
    assert_eq!(core.instruction_pointer(), 0x10);
    assert_eq!(core.pop_call().unwrap(), 0x21);
  }

  #[test]
  fn forms_resolve_operands(){
    let instruction = DecodedInstruction::jump(JumpOp::SelectCallIfTrue, 9, 6, 7);
    let form        = jump_form(JumpOp::SelectCallIfTrue, &instruction);
    assert!(form.is_call());
    let resolved: JumpForm<Word> =
      form.try_map(|operand| match operand {
        Operand::Place(Place::Register(r)) => Ok(r as Word * 100),
        _                                  => Err(CoreError::DecodeRange(0)),
      }).unwrap();
    assert_eq!(resolved, JumpForm::Select { call: true, when: true, then: 600, otherwise: 700 });
  }
}
