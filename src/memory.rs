/*!
  Memory segments. Each segment is its own address space, `0..capacity`, and no address in one
  segment ever denotes a cell of another.

  The data-stack and call-stack segments grow upward from the "empty" pointer value (all ones
  in the word width). A push pre-increments, so the first element lands at address 0; a pop
  reads then post-decrements. The pointer itself lives in a register owned by the caller, so
  the stack operations take the current pointer and hand back the new one.
*/

use std::convert::TryFrom;

use crate::bytecode::Instruction;
use crate::error::{CoreError, Result};
use crate::profile::{IsaProfile, Word};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Segment<T> {
  name  : &'static str,
  cells : Vec<T>,
}

impl<T: Copy + Default> Segment<T> {
  pub fn new(name: &'static str, capacity: usize) -> Segment<T> {
    Segment { name, cells: vec![T::default(); capacity] }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn capacity(&self) -> usize {
    self.cells.len()
  }

  fn index(&self, address: Word) -> Result<usize> {
    match usize::try_from(address) {
      Ok(i) if i < self.cells.len() => Ok(i),
      _ => Err(CoreError::AddressOutOfRange {
        segment  : self.name,
        address,
        capacity : self.cells.len()
      })
    }
  }

  pub fn load(&self, address: Word) -> Result<T> {
    let i = self.index(address)?;
    Ok(self.cells[i])
  }

  pub fn store(&mut self, address: Word, value: T) -> Result<()> {
    let i = self.index(address)?;
    self.cells[i] = value;
    Ok(())
  }

  pub fn cells(&self) -> &[T] {
    &self.cells
  }

  pub fn cells_mut(&mut self) -> &mut [T] {
    &mut self.cells
  }
}

impl Segment<Word> {
  /// Returns the new pointer. The pointer is unchanged if the store fails.
  pub fn push(&mut self, pointer: Word, value: Word, mask: Word) -> Result<Word> {
    let pointer = pointer.wrapping_add(1) & mask;
    self.store(pointer, value)?;
    Ok(pointer)
  }

  /// Returns `(value, new pointer)`.
  pub fn pop(&self, pointer: Word, mask: Word) -> Result<(Word, Word)> {
    let value = self.load(pointer)?;
    Ok((value, pointer.wrapping_sub(1) & mask))
  }

  pub fn peek(&self, pointer: Word) -> Result<Word> {
    self.load(pointer)
  }
}

/// All the memory a core owns. IO space is not here; it belongs to the device registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemorySegments {
  pub code       : Segment<Instruction>,
  pub data       : Segment<Word>,
  pub stack      : Segment<Word>,
  pub call_stack : Segment<Word>,
  pub microcode  : Segment<Word>,
}

impl MemorySegments {
  pub fn new(profile: &IsaProfile) -> MemorySegments {
    MemorySegments {
      code       : Segment::new("code",       profile.code_capacity),
      data       : Segment::new("data",       profile.data_capacity),
      stack      : Segment::new("stack",      profile.stack_capacity),
      call_stack : Segment::new("call stack", profile.call_stack_capacity),
      microcode  : Segment::new("microcode",  profile.microcode_capacity),
    }
  }
}
