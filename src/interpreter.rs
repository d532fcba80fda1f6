/*!
  The sequential interpreter: fetch the word at `ip`, decode it, dispatch it, and advance `ip`
  unless the instruction set it. Errors stop the core; they are returned to the caller and the
  core is left `Faulted`, never retried.
*/

use crate::error::Result;
use crate::machine::{Core, Status};
use crate::profile::{IsaProfile, Word};

/// Anything that executes a program one instruction at a time.
pub trait Processor {
  fn profile(&self) -> &IsaProfile;
  fn status(&self) -> Status;
  fn register(&self, index: u8) -> Result<Word>;

  /// Executes one instruction. Stepping a core that is not running does nothing.
  fn step(&mut self) -> Result<()>;

  fn is_halted(&self) -> bool {
    self.status() != Status::Running
  }

  /// Steps until the core halts or faults. Returns the number of instructions executed.
  fn run(&mut self) -> Result<u64> {
    let mut executed = 0;
    while !self.is_halted() {
      self.step()?;
      executed += 1;
    }
    Ok(executed)
  }
}

impl Core {
  pub fn step(&mut self) -> Result<()> {
    if self.status() != Status::Running {
      return Ok(());
    }

    match self.execute_next() {
      Ok(()) => Ok(()),
      Err(error) => {
        log::debug!("fault at {:#x}: {}", self.instruction_pointer(), error);
        self.take_advance();
        self.set_status(Status::Faulted);
        Err(error)
      }
    }
  }

  fn execute_next(&mut self) -> Result<()> {
    let ip          = self.instruction_pointer();
    let instruction = self.memory().code.load(ip)?.decode();

    log::trace!("{:#06x}: {}", ip, instruction);
    self.dispatch(&instruction)?;

    if self.take_advance() {
      let next = self.profile().mask(ip.wrapping_add(1));
      self.set_instruction_pointer(next)?;
    }
    self.count_step();

    #[cfg(feature = "trace_computation")]
    log::trace!("\n{}", self);

    if self.status() == Status::Halted {
      log::debug!("halted after {} steps", self.steps());
    }
    Ok(())
  }

  /// Starts the IO devices, steps until the core stops, and shuts the devices down again.
  /// Returns the number of instructions executed.
  pub fn run(&mut self) -> Result<u64> {
    if let Err(error) = self.devices_mut().startup_all() {
      self.set_status(Status::Faulted);
      return Err(error);
    }

    let outcome  = self.run_for(u64::MAX);
    let shutdown = self.devices_mut().shutdown_all();
    let executed = outcome?;
    shutdown?;
    Ok(executed)
  }

  /// Steps at most `limit` times. Devices are not started or stopped.
  pub fn run_for(&mut self, limit: u64) -> Result<u64> {
    let mut executed = 0;
    while self.status() == Status::Running && executed < limit {
      self.step()?;
      executed += 1;
    }
    Ok(executed)
  }
}

impl Processor for Core {
  fn profile(&self) -> &IsaProfile {
    Core::profile(self)
  }

  fn status(&self) -> Status {
    Core::status(self)
  }

  fn register(&self, index: u8) -> Result<Word> {
    Ok(Core::register(self, index))
  }

  fn step(&mut self) -> Result<()> {
    Core::step(self)
  }

  fn run(&mut self) -> Result<u64> {
    Core::run(self)
  }
}
