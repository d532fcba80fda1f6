//! The register file. Indices 0 and 1 are the constants false and true; the special block
//! above them is ordinary storage whose meaning comes from the profile's index layout.

use crate::error::{CoreError, Result};
use crate::profile::{IsaProfile, Word, FALSE_REGISTER, REGISTER_COUNT, TRUE_REGISTER};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisterFile {
  slots : Vec<Word>,
  mask  : Word,
}

impl RegisterFile {
  pub fn new(profile: &IsaProfile) -> RegisterFile {
    let mut slots = vec![0; REGISTER_COUNT];
    slots[TRUE_REGISTER as usize] = 1;
    RegisterFile { slots, mask: profile.word_mask() }
  }

  /// The power-on file: like `new`, with both stack pointers at the empty-stack value.
  pub fn with_stack_pointers(profile: &IsaProfile) -> RegisterFile {
    let mut registers = RegisterFile::new(profile);
    let special       = profile.registers;
    for &pointer in &[special.stack_pointer, special.call_pointer] {
      registers.slots[pointer as usize] = profile.stack_empty();
    }
    registers
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  /// Every operand byte names a register, so this cannot fail.
  pub fn get(&self, index: u8) -> Word {
    self.slots[index as usize]
  }

  /// Stores `value` truncated to the word width.
  pub fn set(&mut self, index: u8, value: Word) -> Result<()> {
    match index {
      FALSE_REGISTER | TRUE_REGISTER => Err(CoreError::WriteProtected(index)),
      _ => {
        self.slots[index as usize] = value & self.mask;
        Ok(())
      }
    }
  }

  /// `get` for callers holding a wider index.
  pub fn read(&self, index: usize) -> Result<Word> {
    self.slots.get(index).copied().ok_or(CoreError::IndexOutOfRange {
      what  : "register",
      index,
      limit : REGISTER_COUNT
    })
  }

  /// `set` for callers holding a wider index.
  pub fn write(&mut self, index: usize, value: Word) -> Result<()> {
    match index < self.slots.len() {
      true  => self.set(index as u8, value),
      false => Err(CoreError::IndexOutOfRange { what: "register", index, limit: REGISTER_COUNT })
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (u8, Word)> + '_ {
    self.slots.iter().enumerate().map(|(i, v)| (i as u8, *v))
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn constants_after_construction(){
    let registers = RegisterFile::new(&IsaProfile::COMPACT16);
    assert_eq!(registers.get(0), 0);
    assert_eq!(registers.get(1), 1);
    assert_eq!(registers.len(), 256);
  }

  #[test]
  fn power_on_stack_pointers(){
    for profile in &[IsaProfile::COMPACT16, IsaProfile::WIDE64] {
      let registers = RegisterFile::with_stack_pointers(profile);
      assert_eq!(registers.get(profile.registers.stack_pointer), profile.stack_empty());
      assert_eq!(registers.get(profile.registers.call_pointer), profile.stack_empty());
      assert_eq!(registers.get(profile.registers.instruction_pointer), 0);
      assert_eq!(registers.get(1), 1);
    }
  }

  #[test]
  fn special_registers_are_writable(){
    let mut registers = RegisterFile::new(&IsaProfile::COMPACT16);
    let ip = IsaProfile::COMPACT16.registers.instruction_pointer;
    registers.set(ip, 0x40).unwrap();
    assert_eq!(registers.get(ip), 0x40);
  }

  #[test]
  fn values_are_truncated_to_the_word(){
    let mut registers = RegisterFile::new(&IsaProfile::COMPACT16);
    registers.set(9, 0xABCD_1234).unwrap();
    assert_eq!(registers.get(9), 0x1234);
  }

  #[test]
  fn wide_indices_are_range_checked(){
    let mut registers = RegisterFile::new(&IsaProfile::WIDE64);
    assert_eq!(registers.read(255).unwrap(), 0);
    assert!(matches!(registers.read(256), Err(CoreError::IndexOutOfRange { index: 256, .. })));
    assert!(matches!(registers.write(300, 1), Err(CoreError::IndexOutOfRange { .. })));
  }

  proptest! {
    #[test]
    fn false_and_true_are_write_protected(
      writes in proptest::collection::vec((any::<u8>(), any::<u64>()), 0..64),
      value in any::<u64>()
    ) {
      let mut registers = RegisterFile::new(&IsaProfile::WIDE64);
      for (index, v) in writes {
        let _ = registers.set(index, v);
      }
      prop_assert!(matches!(registers.set(0, value), Err(CoreError::WriteProtected(0))));
      prop_assert!(matches!(registers.set(1, value), Err(CoreError::WriteProtected(1))));
      prop_assert_eq!(registers.get(0), 0);
      prop_assert_eq!(registers.get(1), 1);
    }
  }
}
