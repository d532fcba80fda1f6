/*!
  IO devices plug into the data address space above plain RAM. Each device claims an inclusive
  address range; the registry refuses overlapping claims and routes every access to the first
  device (in registration order) that responds to the address.
*/

use crate::error::{CoreError, Result};
use crate::profile::Word;

pub trait IoDevice: Send {
  /// First address claimed, inclusive.
  fn begin(&self) -> Word;
  /// Last address claimed, inclusive.
  fn end(&self) -> Word;

  fn responds_to(&self, address: Word) -> bool {
    self.begin() <= address && address <= self.end()
  }

  fn load(&mut self, address: Word) -> Result<Word>;
  fn store(&mut self, address: Word, value: Word) -> Result<()>;

  fn startup(&mut self) -> Result<()> {
    Ok(())
  }

  fn shutdown(&mut self) -> Result<()> {
    Ok(())
  }
}

#[derive(Default)]
pub struct IoDeviceRegistry {
  devices: Vec<Box<dyn IoDevice>>,
}

impl IoDeviceRegistry {
  pub fn new() -> IoDeviceRegistry {
    IoDeviceRegistry { devices: Vec::new() }
  }

  pub fn register(&mut self, device: Box<dyn IoDevice>) -> Result<()> {
    let (begin, end) = (device.begin(), device.end());
    let overlaps =
      self.devices
          .iter()
          .any(|existing| {
            existing.responds_to(begin)
              || existing.responds_to(end)
              || (begin <= existing.begin() && existing.end() <= end)
          });
    if overlaps || begin > end {
      return Err(CoreError::OverlappingDevice { begin, end });
    }
    log::debug!("registered IO device at [{:#x}, {:#x}]", begin, end);
    self.devices.push(device);
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.devices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.devices.is_empty()
  }

  fn responder(&mut self, address: Word) -> Result<&mut Box<dyn IoDevice>> {
    self.devices
        .iter_mut()
        .find(|device| device.responds_to(address))
        .ok_or(CoreError::UnmappedIoAddress(address))
  }

  pub fn load(&mut self, address: Word) -> Result<Word> {
    self.responder(address)?.load(address)
  }

  pub fn store(&mut self, address: Word, value: Word) -> Result<()> {
    self.responder(address)?.store(address, value)
  }

  /// Stops at the first device that fails.
  pub fn startup_all(&mut self) -> Result<()> {
    for device in self.devices.iter_mut() {
      log::debug!("starting IO device at [{:#x}, {:#x}]", device.begin(), device.end());
      device.startup()?;
    }
    Ok(())
  }

  /// Stops at the first device that fails.
  pub fn shutdown_all(&mut self) -> Result<()> {
    for device in self.devices.iter_mut() {
      log::debug!("shutting down IO device at [{:#x}, {:#x}]", device.begin(), device.end());
      device.shutdown()?;
    }
    Ok(())
  }
}
