/*!
  The system call table: 256 handlers indexed by selector. The built-ins are `terminate` (0),
  `panic` (1) and `putc` (2); every other selector is an invalid command until a handler is
  installed for it while the core is being built.
*/

use crate::bytecode::{DecodedInstruction, SystemCommand};
use crate::error::{CoreError, Result};
use crate::machine::Core;
use crate::profile::Word;

pub type SystemCallHandler = fn(&mut Core, &DecodedInstruction) -> Result<()>;

pub const SYSTEM_CALL_SLOTS: usize = 256;

#[derive(Clone, Copy)]
pub struct SystemCallTable {
  entries: [Option<SystemCallHandler>; SYSTEM_CALL_SLOTS],
}

impl SystemCallTable {
  pub fn new() -> SystemCallTable {
    let mut table = SystemCallTable { entries: [None; SYSTEM_CALL_SLOTS] };
    table.install(SystemCommand::Terminate.into(), terminate);
    table.install(SystemCommand::Panic.into(), panic);
    table.install(SystemCommand::Putc.into(), putc);
    table
  }

  pub fn install(&mut self, selector: u8, handler: SystemCallHandler) {
    self.entries[selector as usize] = Some(handler);
  }

  pub fn is_installed(&self, selector: u8) -> bool {
    self.entries[selector as usize].is_some()
  }

  /// The handler for `selector`; empty selectors get one that fails with `InvalidSystemCommand`.
  pub fn handler(&self, selector: u8) -> SystemCallHandler {
    self.entries[selector as usize].unwrap_or(invalid_command)
  }
}

impl Default for SystemCallTable {
  fn default() -> Self {
    SystemCallTable::new()
  }
}

fn invalid_command(_core: &mut Core, instruction: &DecodedInstruction) -> Result<()> {
  Err(CoreError::InvalidSystemCommand(instruction.dest()))
}

fn terminate(core: &mut Core, _instruction: &DecodedInstruction) -> Result<()> {
  log::debug!("terminate at {:#x}", core.instruction_pointer());
  core.halt();
  Ok(())
}

/// Fails with the immediate as the panic code.
fn panic(_core: &mut Core, instruction: &DecodedInstruction) -> Result<()> {
  Err(CoreError::Panic(instruction.immediate()))
}

/**
  The character `putc` prints. When both source bytes name the same register (`single`), its
  low byte is the character; otherwise `high` supplies the high 16 bits of the code point and
  `low` the low 16.
*/
pub fn compose_character(low: Word, high: Word, single: bool) -> Result<char> {
  let code_point =
    match single {
      true  => low & 0xFF,
      false => ((high & 0xFFFF) << 16) | (low & 0xFFFF),
    } as u32;
  std::char::from_u32(code_point).ok_or(CoreError::InvalidCodePoint(code_point))
}

fn putc(core: &mut Core, instruction: &DecodedInstruction) -> Result<()> {
  let (low, high) = (instruction.src0(), instruction.src1());
  let character   = compose_character(core.register(low), core.register(high), low == high)?;
  core.emit(character)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::machine::{CoreBuilder, SharedOutput, Status};
  use crate::profile::IsaProfile;

  fn core_with_output() -> (Core, SharedOutput) {
    let output = SharedOutput::new();
    let core   = CoreBuilder::new(IsaProfile::COMPACT16).output(output.clone()).build().unwrap();
    (core, output)
  }

  #[test]
  fn terminate_halts(){
    let (mut core, _) = core_with_output();
    core.dispatch(&DecodedInstruction::terminate()).unwrap();
    assert_eq!(core.status(), Status::Halted);
  }

  #[test]
  fn panic_carries_its_code(){
    let (mut core, _) = core_with_output();
    let instruction = DecodedInstruction::system_call_immediate(SystemCommand::Panic.into(), 0x0BAD);
    assert!(matches!(core.dispatch(&instruction), Err(CoreError::Panic(0x0BAD))));
  }

  #[test]
  fn putc_single_register_and_pair(){
    let (mut core, output) = core_with_output();
    let putc = SystemCommand::Putc.into();

    core.set_register(6, 0x1_48).unwrap();
    core.dispatch(&DecodedInstruction::system_call(putc, 6, 6)).unwrap();

    // U+1F600 split across two registers.
    core.set_register(7, 0xF600).unwrap();
    core.set_register(8, 0x0001).unwrap();
    core.dispatch(&DecodedInstruction::system_call(putc, 7, 8)).unwrap();

    assert_eq!(output.contents(), "H\u{1F600}");
  }

  #[test]
  fn putc_rejects_surrogates(){
    let (mut core, output) = core_with_output();
    core.set_register(7, 0xD800).unwrap();
    assert!(matches!(
      core.dispatch(&DecodedInstruction::system_call(SystemCommand::Putc.into(), 7, 0)),
      Err(CoreError::InvalidCodePoint(0xD800))
    ));
    assert_eq!(output.contents(), "");
  }

  #[test]
  fn unknown_selectors_fail_until_installed(){
    fn bump(core: &mut Core, instruction: &DecodedInstruction) -> Result<()> {
      let value = core.register(instruction.src0()) + 1;
      core.set_register(instruction.src0(), value)
    }

    let (mut core, _) = core_with_output();
    assert!(matches!(
      core.dispatch(&DecodedInstruction::system_call(40, 6, 0)),
      Err(CoreError::InvalidSystemCommand(40))
    ));

    let mut core = CoreBuilder::new(IsaProfile::COMPACT16).system_call(40, bump).build().unwrap();
    core.dispatch(&DecodedInstruction::system_call(40, 6, 0)).unwrap();
    assert_eq!(core.register(6), 1);
  }

  #[test]
  fn built_ins_are_installed(){
    let table = SystemCallTable::new();
    assert!(table.is_installed(0) && table.is_installed(1) && table.is_installed(2));
    assert_eq!((3..=255u8).filter(|s| table.is_installed(*s)).count(), 0);
  }
}
