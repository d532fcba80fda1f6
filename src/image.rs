/*!
  Program images. An image is every memory segment of a core, back to back, little-endian:

  ```text
    code        capacity x 4 bytes
    data        capacity x word bytes
    microcode   capacity x word bytes   (absent when the profile has none)
    stack       capacity x word bytes
    call stack  capacity x word bytes
  ```

  Segment sizes come from the profile, so an image carries no header.
*/

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::bytecode::Instruction;
use crate::error::Result;
use crate::machine::Core;
use crate::memory::{MemorySegments, Segment};
use crate::profile::{IsaProfile, Word};

/// Byte length of an image for `profile`.
pub fn image_size(profile: &IsaProfile) -> usize {
  let words =
    profile.data_capacity
      + profile.microcode_capacity
      + profile.stack_capacity
      + profile.call_stack_capacity;
  profile.code_capacity * 4 + words * profile.word_bytes()
}

fn read_words<R: Read>(reader: &mut R, segment: &mut Segment<Word>, word_bytes: usize) -> Result<()> {
  for cell in segment.cells_mut() {
    *cell = reader.read_uint::<LittleEndian>(word_bytes)?;
  }
  Ok(())
}

fn write_words<W: Write>(writer: &mut W, segment: &Segment<Word>, word_bytes: usize) -> Result<()> {
  for cell in segment.cells() {
    writer.write_uint::<LittleEndian>(*cell, word_bytes)?;
  }
  Ok(())
}

impl Core {
  /// Replaces all of memory with the image read from `reader`. On error memory is unchanged.
  pub fn load_image<R: Read>(&mut self, mut reader: R) -> Result<()> {
    let profile    = *self.profile();
    let word_bytes = profile.word_bytes();
    let mut memory = MemorySegments::new(&profile);

    for cell in memory.code.cells_mut() {
      *cell = Instruction(reader.read_u32::<LittleEndian>()?);
    }
    read_words(&mut reader, &mut memory.data, word_bytes)?;
    read_words(&mut reader, &mut memory.microcode, word_bytes)?;
    read_words(&mut reader, &mut memory.stack, word_bytes)?;
    read_words(&mut reader, &mut memory.call_stack, word_bytes)?;

    log::debug!("loaded {} byte {} image", image_size(&profile), profile.generation);
    *self.memory_mut() = memory;
    Ok(())
  }

  pub fn dump_image<W: Write>(&self, mut writer: W) -> Result<()> {
    let word_bytes = self.profile().word_bytes();
    let memory     = self.memory();

    for cell in memory.code.cells() {
      writer.write_u32::<LittleEndian>(cell.bits())?;
    }
    write_words(&mut writer, &memory.data, word_bytes)?;
    write_words(&mut writer, &memory.microcode, word_bytes)?;
    write_words(&mut writer, &memory.stack, word_bytes)?;
    write_words(&mut writer, &memory.call_stack, word_bytes)?;
    writer.flush()?;
    Ok(())
  }
}
