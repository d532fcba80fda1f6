//! Stock IO devices.

use std::collections::VecDeque;
use std::convert::TryFrom;
use std::io::Write;

use crate::error::{CoreError, Result};
use crate::io::IoDevice;
use crate::profile::Word;

/// A window of plain RAM mapped into IO space.
pub struct MappedMemory {
  begin : Word,
  end   : Word,
  cells : Vec<Word>,
}

impl MappedMemory {
  /// A window of `length` cells (at least one) starting at `begin`. Fails if the window would run
  /// past the top of the address space.
  pub fn new(begin: Word, length: usize) -> Result<MappedMemory> {
    let length = length.max(1);
    let end    = Word::try_from(length - 1)
                   .ok()
                   .and_then(|last| begin.checked_add(last))
                   .ok_or_else(|| CoreError::Device(
                     format!("a {} cell window at {:#x} runs past the address space", length, begin)
                   ))?;
    Ok(MappedMemory { begin, end, cells: vec![0; length] })
  }

  fn offset(&self, address: Word) -> Result<usize> {
    match self.responds_to(address) {
      true  => Ok((address - self.begin) as usize),
      false => Err(CoreError::UnmappedIoAddress(address))
    }
  }
}

impl IoDevice for MappedMemory {
  fn begin(&self) -> Word {
    self.begin
  }

  fn end(&self) -> Word {
    self.end
  }

  fn load(&mut self, address: Word) -> Result<Word> {
    let offset = self.offset(address)?;
    Ok(self.cells[offset])
  }

  fn store(&mut self, address: Word, value: Word) -> Result<()> {
    let offset = self.offset(address)?;
    self.cells[offset] = value;
    Ok(())
  }

  fn startup(&mut self) -> Result<()> {
    for cell in self.cells.iter_mut() {
      *cell = 0;
    }
    Ok(())
  }
}

/**
  A one-address character port. A store writes the low byte of the value to the output sink; a
  load takes the next byte of pending input, or all ones once the input is exhausted.
*/
pub struct ConsolePort {
  address : Word,
  output  : Box<dyn Write + Send>,
  input   : VecDeque<u8>,
}

impl ConsolePort {
  pub const END_OF_INPUT: Word = Word::MAX;

  pub fn new<W: Write + Send + 'static>(address: Word, output: W) -> ConsolePort {
    ConsolePort { address, output: Box::new(output), input: VecDeque::new() }
  }

  pub fn with_input(mut self, input: &[u8]) -> ConsolePort {
    self.input.extend(input.iter().copied());
    self
  }
}

impl IoDevice for ConsolePort {
  fn begin(&self) -> Word {
    self.address
  }

  fn end(&self) -> Word {
    self.address
  }

  fn load(&mut self, _address: Word) -> Result<Word> {
    Ok(self.input.pop_front().map(Word::from).unwrap_or(ConsolePort::END_OF_INPUT))
  }

  fn store(&mut self, _address: Word, value: Word) -> Result<()> {
    self.output.write_all(&[value as u8])?;
    Ok(())
  }

  fn shutdown(&mut self) -> Result<()> {
    self.output.flush()?;
    Ok(())
  }
}
