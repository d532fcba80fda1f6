//! The core aggregate: one register file, one set of memory segments, the execution unit
//! tables, the system call table, the IO devices, and the control flags the run loop uses.

use std::fmt::{Display, Formatter};
use std::io::Write;
use std::sync::{Arc, Mutex};

use prettytable::{format as TableFormat, Table};
use strum_macros::{Display as StrumDisplay, IntoStaticStr};

use crate::bytecode::{DecodedInstruction, Instruction};
use crate::error::{CoreError, Result};
use crate::io::{IoDevice, IoDeviceRegistry};
use crate::memory::{MemorySegments, Segment};
use crate::operand::{Operand, Place};
use crate::profile::{IsaProfile, Word};
use crate::registers::RegisterFile;
use crate::units::syscall::{SystemCallHandler, SystemCallTable};
use crate::units::ExecutionUnits;

#[derive(StrumDisplay, IntoStaticStr, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Status {
  Running,
  /// Stopped by the terminate system call.
  Halted,
  /// Stopped by an error; the error was returned to whoever stepped the core.
  Faulted,
}

pub struct Core {
  profile      : IsaProfile,
  registers    : RegisterFile,
  memory       : MemorySegments,
  units        : ExecutionUnits,
  system_calls : SystemCallTable,
  devices      : IoDeviceRegistry,
  output       : Box<dyn Write + Send>,

  // Flags
  advance_pc   : bool, // Cleared by any instruction that sets the instruction pointer itself
  status       : Status,
  steps        : u64,
}

impl Core {

  // region Display methods

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();
    let special   = self.profile.registers;

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    for (i, value) in self.registers.iter() {
      match special.name(i) {

        Some(name) => {
          table.add_row(row![r->format!("{} r{} =", name, i), format!("{:#x}", value)]);
        }

        // General purpose registers are only listed once they hold something.
        None if value != 0 => {
          table.add_row(row![r->format!("r{} =", i), format!("{:#x}", value)]);
        }

        None => {}

      } // end match on register name
    } // end for
    table
  }

  fn make_stack_table(name: char, stack: &Segment<Word>, pointer: Word) -> Table {
    const SHOWN: usize = 8;
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    let top = pointer as usize;
    if top < stack.capacity() {
      for i in top.saturating_sub(SHOWN - 1)..=top {
        let cell = stack.cells()[i];
        match i == top {

          true  => {
            table.add_row(row![r->format!("* --> {}[{}] =", name, i), format!("{:#x}", cell)]);
          }

          false => {
            table.add_row(row![r->format!("{}[{}] =", name, i), format!("{:#x}", cell)]);
          }

        }
      }
    }
    table
  }

  // endregion

  // region Construction

  pub fn new(profile: IsaProfile) -> Core {
    Core::assemble(profile, Box::new(std::io::stdout()), SystemCallTable::new(), IoDeviceRegistry::new())
  }

  fn assemble(
      profile      : IsaProfile,
      output       : Box<dyn Write + Send>,
      system_calls : SystemCallTable,
      devices      : IoDeviceRegistry
    ) -> Core
  {
    let mut core = Core {
      profile,
      registers    : RegisterFile::new(&profile),
      memory       : MemorySegments::new(&profile),
      units        : ExecutionUnits::standard(),
      system_calls,
      devices,
      output,
      advance_pc   : true,
      status       : Status::Running,
      steps        : 0,
    };
    core.reset();
    core
  }

  /// Returns registers and flags to their power-on values. Memory is left alone.
  pub fn reset(&mut self) {
    self.registers  = RegisterFile::with_stack_pointers(&self.profile);
    self.advance_pc = true;
    self.status     = Status::Running;
    self.steps      = 0;
  }

  /// Copies `program` into code memory starting at address 0.
  pub fn install_program(&mut self, program: &[Instruction]) -> Result<()> {
    for (address, instruction) in program.iter().enumerate() {
      self.memory.code.store(address as Word, *instruction)?;
    }
    Ok(())
  }

  /// Encodes and installs `program` starting at address 0.
  pub fn install_decoded(&mut self, program: &[DecodedInstruction]) -> Result<()> {
    let encoded: Vec<Instruction> = program.iter().map(DecodedInstruction::encode).collect();
    self.install_program(&encoded)
  }

  /// Copies `words` into data memory starting at `start`.
  pub fn install_data(&mut self, start: Word, words: &[Word]) -> Result<()> {
    for (offset, word) in words.iter().enumerate() {
      let address = start.checked_add(offset as Word).ok_or(CoreError::AddressOutOfRange {
        segment  : "data",
        address  : start,
        capacity : self.memory.data.capacity()
      })?;
      self.memory.data.store(address, self.profile.mask(*word))?;
    }
    Ok(())
  }

  // endregion

  // region Accessors

  pub fn profile(&self) -> &IsaProfile {
    &self.profile
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn is_halted(&self) -> bool {
    self.status != Status::Running
  }

  /// Instructions retired since the last reset.
  pub fn steps(&self) -> u64 {
    self.steps
  }

  pub fn register(&self, index: u8) -> Word {
    self.registers.get(index)
  }

  pub fn set_register(&mut self, index: u8, value: Word) -> Result<()> {
    self.registers.set(index, value)
  }

  pub fn registers(&self) -> &RegisterFile {
    &self.registers
  }

  pub fn memory(&self) -> &MemorySegments {
    &self.memory
  }

  pub fn memory_mut(&mut self) -> &mut MemorySegments {
    &mut self.memory
  }

  pub(crate) fn units(&self) -> ExecutionUnits {
    self.units
  }

  pub(crate) fn system_calls(&self) -> &SystemCallTable {
    &self.system_calls
  }

  pub(crate) fn devices_mut(&mut self) -> &mut IoDeviceRegistry {
    &mut self.devices
  }

  pub fn instruction_pointer(&self) -> Word {
    self.registers.get(self.profile.registers.instruction_pointer)
  }

  pub fn set_instruction_pointer(&mut self, address: Word) -> Result<()> {
    self.registers.set(self.profile.registers.instruction_pointer, address)
  }

  pub fn predicate(&self) -> bool {
    self.registers.get(self.profile.registers.predicate) != 0
  }

  pub fn set_predicate(&mut self, value: bool) -> Result<()> {
    self.registers.set(self.profile.registers.predicate, value as Word)
  }

  // endregion

  // region Flags

  pub(crate) fn suppress_advance(&mut self) {
    self.advance_pc = false;
  }

  pub(crate) fn take_advance(&mut self) -> bool {
    std::mem::replace(&mut self.advance_pc, true)
  }

  pub(crate) fn halt(&mut self) {
    self.status = Status::Halted;
  }

  pub(crate) fn set_status(&mut self, status: Status) {
    self.status = status;
  }

  pub(crate) fn count_step(&mut self) {
    self.steps += 1;
  }

  // endregion

  // region Operand access

  /// Data memory below the RAM capacity, IO devices above it.
  pub fn load_data(&mut self, address: Word) -> Result<Word> {
    match (address as usize) < self.memory.data.capacity() {
      true  => self.memory.data.load(address),
      false => self.devices.load(address).map(|v| self.profile.mask(v))
    }
  }

  pub fn store_data(&mut self, address: Word, value: Word) -> Result<()> {
    let value = self.profile.mask(value);
    match (address as usize) < self.memory.data.capacity() {
      true  => self.memory.data.store(address, value),
      false => self.devices.store(address, value)
    }
  }

  pub fn read_place(&mut self, place: Place) -> Result<Word> {
    match place {
      Place::Register(r)  => Ok(self.registers.get(r)),
      Place::Memory(r)    => self.load_data(self.registers.get(r)),
      Place::MemoryAt(a)  => self.load_data(a as Word),
      Place::Microcode(r) => self.memory.microcode.load(self.registers.get(r)),
    }
  }

  pub fn write_place(&mut self, place: Place, value: Word) -> Result<()> {
    match place {
      Place::Register(r)  => self.registers.set(r, value),
      Place::Memory(r)    => self.store_data(self.registers.get(r), value),
      Place::MemoryAt(a)  => self.store_data(a as Word, value),
      Place::Microcode(r) => {
        let value = self.profile.mask(value);
        self.memory.microcode.store(self.registers.get(r), value)
      }
    }
  }

  pub fn read_operand(&mut self, operand: Operand) -> Result<Word> {
    match operand {
      Operand::Place(place) => self.read_place(place),
      Operand::Literal(v)   => Ok(v as Word),
    }
  }

  // endregion

  // region Stacks

  pub fn push_data(&mut self, value: Word) -> Result<()> {
    let sp      = self.profile.registers.stack_pointer;
    let pointer = self.memory.stack.push(self.registers.get(sp), self.profile.mask(value), self.profile.word_mask())?;
    self.registers.set(sp, pointer)
  }

  pub fn pop_data(&mut self) -> Result<Word> {
    let sp               = self.profile.registers.stack_pointer;
    let (value, pointer) = self.memory.stack.pop(self.registers.get(sp), self.profile.word_mask())?;
    self.registers.set(sp, pointer)?;
    Ok(value)
  }

  pub fn peek_data(&self) -> Result<Word> {
    self.memory.stack.peek(self.registers.get(self.profile.registers.stack_pointer))
  }

  pub fn push_call(&mut self, address: Word) -> Result<()> {
    let csp     = self.profile.registers.call_pointer;
    let pointer = self.memory.call_stack.push(self.registers.get(csp), self.profile.mask(address), self.profile.word_mask())?;
    self.registers.set(csp, pointer)
  }

  pub fn pop_call(&mut self) -> Result<Word> {
    let csp              = self.profile.registers.call_pointer;
    let (value, pointer) = self.memory.call_stack.pop(self.registers.get(csp), self.profile.word_mask())?;
    self.registers.set(csp, pointer)?;
    Ok(value)
  }

  // endregion

  /// Writes one character to the output sink.
  pub fn emit(&mut self, character: char) -> Result<()> {
    let mut buffer = [0u8; 4];
    self.output.write_all(character.encode_utf8(&mut buffer).as_bytes())?;
    self.output.flush()?;
    Ok(())
  }
}

/**
  Setup-time configuration of a core: the output sink for character output, the IO devices,
  and any system calls beyond the built-ins. Once `build` returns, the system call table and
  the device set are fixed.
*/
pub struct CoreBuilder {
  profile      : IsaProfile,
  output       : Box<dyn Write + Send>,
  devices      : Vec<Box<dyn IoDevice>>,
  system_calls : SystemCallTable,
}

impl CoreBuilder {
  pub fn new(profile: IsaProfile) -> CoreBuilder {
    CoreBuilder {
      profile,
      output       : Box::new(std::io::stdout()),
      devices      : Vec::new(),
      system_calls : SystemCallTable::new(),
    }
  }

  pub fn output<W: Write + Send + 'static>(mut self, output: W) -> CoreBuilder {
    self.output = Box::new(output);
    self
  }

  pub fn device<D: IoDevice + 'static>(mut self, device: D) -> CoreBuilder {
    self.devices.push(Box::new(device));
    self
  }

  /// Installs `handler` under `selector`, replacing a built-in if there is one.
  pub fn system_call(mut self, selector: u8, handler: SystemCallHandler) -> CoreBuilder {
    self.system_calls.install(selector, handler);
    self
  }

  /// Fails with `OverlappingDevice` if two devices claim the same address, or if a device claims
  /// an address that belongs to data RAM.
  pub fn build(self) -> Result<Core> {
    let ram_top      = self.profile.data_capacity as Word;
    let mut registry = IoDeviceRegistry::new();
    for device in self.devices {
      if device.begin() < ram_top {
        return Err(CoreError::OverlappingDevice { begin: device.begin(), end: device.end() });
      }
      registry.register(device)?;
    }
    Ok(Core::assemble(self.profile, self.output, self.system_calls, registry))
  }
}

/// A cloneable in-memory output sink, for capturing what a program prints.
#[derive(Clone, Default, Debug)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
  pub fn new() -> SharedOutput {
    SharedOutput::default()
  }

  pub fn contents(&self) -> String {
    match self.0.lock() {
      Ok(buffer)    => String::from_utf8_lossy(&buffer).into_owned(),
      Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned()
    }
  }
}

impl Write for SharedOutput {
  fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
    let mut buffer = self.0.lock().map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "output lock poisoned"))?;
    buffer.extend_from_slice(bytes);
    Ok(bytes.len())
  }

  fn flush(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Core {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let special  = self.profile.registers;
    let r_table  = self.make_register_table();
    let s_table  = Core::make_stack_table('S', &self.memory.stack,      self.registers.get(special.stack_pointer));
    let c_table  = Core::make_stack_table('C', &self.memory.call_stack, self.registers.get(special.call_pointer));

    let mut combined_table = table!([r_table, s_table, c_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Data Stack", ub->"Call Stack"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let next = match self.memory.code.load(self.instruction_pointer()) {
      Ok(instruction) => instruction.decode().to_string(),
      Err(_)          => "<outside code>".to_string()
    };

    write!(
      f,
      "{} core: {}\tSteps: {}\tNext: {}\n{}",
      self.profile.generation, self.status, self.steps, next, combined_table
    )
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::devices::MappedMemory;

  #[test]
  fn power_on_state(){
    let core    = Core::new(IsaProfile::COMPACT16);
    let special = core.profile().registers;
    assert_eq!(core.instruction_pointer(), 0);
    assert_eq!(core.register(special.stack_pointer), 0xFFFF);
    assert_eq!(core.register(special.call_pointer), 0xFFFF);
    assert!(!core.predicate());
    assert_eq!(core.status(), Status::Running);
  }

  #[test]
  fn data_addresses_above_ram_go_to_devices(){
    let mut core = CoreBuilder::new(IsaProfile::COMPACT16)
      .device(MappedMemory::new(0xF000, 0x10).unwrap())
      .build()
      .unwrap();

    core.store_data(0xF004, 77).unwrap();
    assert_eq!(core.load_data(0xF004).unwrap(), 77);
    core.store_data(0x0004, 5).unwrap();
    assert_eq!(core.memory().data.load(4).unwrap(), 5);
    assert!(matches!(core.load_data(0xF010), Err(CoreError::UnmappedIoAddress(0xF010))));
  }

  #[test]
  fn builder_rejects_overlapping_devices(){
    let built = CoreBuilder::new(IsaProfile::COMPACT16)
      .device(MappedMemory::new(0xF000, 0x10).unwrap())
      .device(MappedMemory::new(0xF008, 0x10).unwrap())
      .build();
    assert!(matches!(built, Err(CoreError::OverlappingDevice { begin: 0xF008, .. })));
  }

  #[test]
  fn builder_rejects_devices_inside_ram(){
    let built = CoreBuilder::new(IsaProfile::COMPACT16)
      .device(MappedMemory::new(0x10, 0x10).unwrap())
      .build();
    assert!(matches!(built, Err(CoreError::OverlappingDevice { begin: 0x10, end: 0x1F })));

    // A window straddling the top of RAM is refused as well.
    let built = CoreBuilder::new(IsaProfile::COMPACT16)
      .device(MappedMemory::new(0xEFF0, 0x20).unwrap())
      .build();
    assert!(matches!(built, Err(CoreError::OverlappingDevice { begin: 0xEFF0, .. })));
  }

  #[test]
  fn install_data_rejects_wrapping_addresses(){
    let mut core = Core::new(IsaProfile::WIDE64);
    assert!(matches!(
      core.install_data(Word::MAX, &[1, 2]),
      Err(CoreError::AddressOutOfRange { segment: "data", .. })
    ));
    core.install_data(0x10, &[1, 2]).unwrap();
    assert_eq!(core.memory().data.load(0x11).unwrap(), 2);
  }

  #[test]
  fn stacks_move_their_pointer_registers(){
    let mut core = Core::new(IsaProfile::COMPACT16);
    let special  = core.profile().registers;
    core.push_data(3).unwrap();
    core.push_data(4).unwrap();
    assert_eq!(core.register(special.stack_pointer), 1);
    assert_eq!(core.peek_data().unwrap(), 4);
    assert_eq!(core.pop_data().unwrap(), 4);
    assert_eq!(core.pop_data().unwrap(), 3);
    assert!(core.pop_data().is_err());
    // The call stack is untouched by data stack traffic.
    assert_eq!(core.register(special.call_pointer), 0xFFFF);
  }

  #[test]
  fn display_lists_special_registers(){
    let mut core = Core::new(IsaProfile::COMPACT16);
    core.set_register(9, 0x2a).unwrap();
    let text = core.to_string();
    assert!(text.contains("ip r2 ="));
    assert!(text.contains("r9 ="));
    assert!(text.contains("0x2a"));
    assert!(!text.contains("r10 ="));
  }
}
