/*!
  Software CPU cores. A core is a fixed-width instruction set (see `bytecode`) executed against
  a register file and segmented memory, either by the sequential interpreter (`Core`) or by a
  pipeline of functional units running as actors (`actor::Pipeline`). Both implement
  `Processor`.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;
extern crate strum;

pub mod actor;
pub mod bytecode;
pub mod devices;
pub mod error;
pub mod image;
pub mod interpreter;
pub mod io;
pub mod machine;
pub mod memory;
pub mod operand;
pub mod profile;
pub mod registers;
pub mod units;

pub use actor::pipeline::Pipeline;
pub use actor::{FunctionalUnit, UnitActor};
pub use error::{CoreError, Result};
pub use interpreter::Processor;
pub use io::{IoDevice, IoDeviceRegistry};
pub use machine::{Core, CoreBuilder, SharedOutput, Status};
pub use profile::{Generation, IsaProfile, Word};
