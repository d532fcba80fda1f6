//! Error types for the cores. Every failure of a simulated program, of the execution units, and
//! of the functional unit actors is a `CoreError`; nothing in the crate aborts the host process
//! because of something a program did.

use thiserror::Error;

use crate::profile::Word;

#[derive(Debug, Error)]
pub enum CoreError {
  /// A request for an operand byte beyond the three an instruction carries.
  #[error("operand byte {0} requested, but an instruction carries only three")]
  DecodeRange(usize),

  /// Registers 0 and 1 hold the constants false and true.
  #[error("register {0} is write protected")]
  WriteProtected(u8),

  #[error("{what} index {index} is out of range (limit {limit})")]
  IndexOutOfRange {
    what  : &'static str,
    index : usize,
    limit : usize
  },

  #[error("divide by zero")]
  DivideByZero,

  #[error("{group} operation {op} is not implemented")]
  NotImplemented {
    group : &'static str,
    op    : u8
  },

  #[error("invalid move operation {0}")]
  InvalidMoveOperation(u8),

  #[error("invalid compare operation {0}")]
  InvalidCompareOperation(u8),

  #[error("illegal jump operation {0}")]
  IllegalJumpOperation(u8),

  #[error("invalid misc operation {0}")]
  InvalidMiscOperation(u8),

  #[error("invalid system command {0}")]
  InvalidSystemCommand(u8),

  #[error("address {address:#x} is outside the {segment} segment (capacity {capacity:#x})")]
  AddressOutOfRange {
    segment  : &'static str,
    address  : Word,
    capacity : usize
  },

  #[error("no device responds to IO address {0:#x}")]
  UnmappedIoAddress(Word),

  #[error("device range [{begin:#x}, {end:#x}] overlaps data RAM or a registered device")]
  OverlappingDevice {
    begin : Word,
    end   : Word
  },

  /// Raised by the program itself through the panic system call.
  #[error("program panic with code {0:#06x}")]
  Panic(u16),

  #[error("{0:#x} is not a valid character code point")]
  InvalidCodePoint(u32),

  #[error("functional unit `{0}` is not running")]
  UnitNotRunning(&'static str),

  #[error("functional unit `{0}` is already running")]
  UnitAlreadyRunning(&'static str),

  /// The unit's channels closed underneath a caller, or its thread died.
  #[error("functional unit `{0}` is disconnected")]
  UnitDisconnected(&'static str),

  #[error("device error: {0}")]
  Device(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
