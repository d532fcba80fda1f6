/*!
  Functional units as actors. A `FunctionalUnit` is plain state plus an `execute` function; a
  `UnitActor` runs one on its own thread and talks to it only through channels:

  ```text
            operation ──▶ ┌──────────────┐ ──▶ result
    operand port 0    ──▶ │  processing  │
    operand port 1    ──▶ │     loop     │ ──▶ error
             ...      ──▶ └──────────────┘
            control   ──▶   listener   (Stop: clear `running`, close the shutdown channel)
  ```

  The loop receives an operation, then `operand_count(op)` operands from the operand ports in
  port order, executes, and sends exactly one value on `result` or one error on `error`. Every
  channel is a rendezvous channel, so nothing is buffered and a slow consumer stalls its
  producer. Results leave in the order operations arrived.

  The actor is `Idle` (it owns the unit) or `Running` (the processing thread owns it). `stop`
  blocks until both threads have exited and the unit is back in the handle, so a stopped unit
  can be inspected or started again. An operation that has already been received runs to
  completion; a stop that arrives while the loop waits for operands or for a consumer abandons
  that operation.
*/

pub mod pipeline;
pub mod units;

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, select, Receiver, Sender};

use crate::error::{CoreError, Result};
use crate::profile::Word;

pub trait FunctionalUnit: Send + 'static {
  type Operation: Copy + Debug + Send + 'static;
  type Output: Send + 'static;

  const NAME: &'static str;
  /// Number of operand ports. No operation takes more operands than this.
  const OPERAND_PORTS: usize;

  fn operand_count(operation: &Self::Operation) -> usize;
  fn execute(&mut self, operation: Self::Operation, operands: &[Word]) -> Result<Self::Output>;
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Control {
  Stop,
}

/// The unit's side of the channels.
struct Endpoints<U: FunctionalUnit> {
  operation : Receiver<U::Operation>,
  operands  : Vec<Receiver<Word>>,
  result    : Sender<U::Output>,
  error     : Sender<CoreError>,
}

/// The caller's side of the channels, plus the threads serving them.
struct Running<U: FunctionalUnit> {
  control   : Sender<Control>,
  operation : Sender<U::Operation>,
  operands  : Vec<Sender<Word>>,
  result    : Receiver<U::Output>,
  error     : Receiver<CoreError>,
  processor : JoinHandle<U>,
  listener  : JoinHandle<()>,
}

enum ActorState<U: FunctionalUnit> {
  Idle(U),
  Running(Running<U>),
  /// A thread panicked and took the unit with it.
  Lost,
}

pub struct UnitActor<U: FunctionalUnit> {
  running : Arc<AtomicBool>,
  state   : ActorState<U>,
}

impl<U: FunctionalUnit> UnitActor<U> {
  pub fn new(unit: U) -> UnitActor<U> {
    UnitActor {
      running : Arc::new(AtomicBool::new(false)),
      state   : ActorState::Idle(unit),
    }
  }

  pub fn name(&self) -> &'static str {
    U::NAME
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::SeqCst)
  }

  /// The unit, while the actor is idle.
  pub fn unit(&self) -> Option<&U> {
    match &self.state {
      ActorState::Idle(unit) => Some(unit),
      _                      => None
    }
  }

  pub fn unit_mut(&mut self) -> Option<&mut U> {
    match &mut self.state {
      ActorState::Idle(unit) => Some(unit),
      _                      => None
    }
  }

  /// Idle to running. Fails with `UnitAlreadyRunning` if the actor is running.
  pub fn start(&mut self) -> Result<()> {
    let unit =
      match std::mem::replace(&mut self.state, ActorState::Lost) {
        ActorState::Idle(unit) => unit,
        ActorState::Running(running) => {
          self.state = ActorState::Running(running);
          return Err(CoreError::UnitAlreadyRunning(U::NAME));
        }
        ActorState::Lost => return Err(CoreError::UnitDisconnected(U::NAME)),
      };

    let (control_tx, control_rx)     = bounded::<Control>(0);
    let (shutdown_tx, shutdown_rx)   = bounded::<()>(0);
    let (operation_tx, operation_rx) = bounded(0);
    let (result_tx, result_rx)       = bounded(0);
    let (error_tx, error_rx)         = bounded(0);
    let (operand_tx, operand_rx): (Vec<Sender<Word>>, Vec<Receiver<Word>>) =
      (0..U::OPERAND_PORTS).map(|_| bounded(0)).unzip();

    let endpoints = Endpoints::<U> {
      operation : operation_rx,
      operands  : operand_rx,
      result    : result_tx,
      error     : error_tx,
    };

    self.running.store(true, Ordering::SeqCst);

    let running   = Arc::clone(&self.running);
    let processor =
      thread::Builder::new()
        .name(format!("{} unit", U::NAME))
        .spawn(move || process(unit, endpoints, shutdown_rx, running));
    let processor = match processor {
      Ok(handle) => handle,
      Err(error) => {
        self.running.store(false, Ordering::SeqCst);
        return Err(error.into());
      }
    };

    let running  = Arc::clone(&self.running);
    let listener =
      thread::Builder::new()
        .name(format!("{} control", U::NAME))
        .spawn(move || {
          // A Stop, or the handle going away, ends the run.
          let _ = control_rx.recv();
          running.store(false, Ordering::SeqCst);
          drop(shutdown_tx);
        });
    let listener = match listener {
      Ok(handle) => handle,
      Err(error) => {
        // The shutdown sender went down with the closure, so the loop is already exiting.
        self.running.store(false, Ordering::SeqCst);
        if let Ok(unit) = processor.join() {
          self.state = ActorState::Idle(unit);
        }
        return Err(error.into());
      }
    };

    self.state = ActorState::Running(Running {
      control   : control_tx,
      operation : operation_tx,
      operands  : operand_tx,
      result    : result_rx,
      error     : error_rx,
      processor,
      listener,
    });
    log::debug!("{} unit started", U::NAME);
    Ok(())
  }

  /// Running to idle. Blocks until the unit's threads have exited. Fails with
  /// `UnitNotRunning` if the actor is idle.
  pub fn stop(&mut self) -> Result<()> {
    let running =
      match std::mem::replace(&mut self.state, ActorState::Lost) {
        ActorState::Running(running) => running,
        ActorState::Idle(unit) => {
          self.state = ActorState::Idle(unit);
          return Err(CoreError::UnitNotRunning(U::NAME));
        }
        ActorState::Lost => return Err(CoreError::UnitDisconnected(U::NAME)),
      };

    let Running { control, operation, operands, result, error, processor, listener } = running;
    let signalled = control.send(Control::Stop);
    drop((control, operation, operands, result, error));

    let listened = listener.join();
    let unit     = processor.join().map_err(|_| CoreError::UnitDisconnected(U::NAME))?;
    self.state   = ActorState::Idle(unit);
    self.running.store(false, Ordering::SeqCst);
    log::debug!("{} unit stopped", U::NAME);

    match (signalled, listened) {
      (Ok(()), Ok(())) => Ok(()),
      _                => Err(CoreError::UnitDisconnected(U::NAME))
    }
  }

  fn ports(&self) -> Result<&Running<U>> {
    match &self.state {
      ActorState::Running(running) => Ok(running),
      ActorState::Idle(_)          => Err(CoreError::UnitNotRunning(U::NAME)),
      ActorState::Lost             => Err(CoreError::UnitDisconnected(U::NAME)),
    }
  }

  // region Ports

  pub fn operation_port(&self) -> Result<Sender<U::Operation>> {
    Ok(self.ports()?.operation.clone())
  }

  pub fn operand_port(&self, index: usize) -> Result<Sender<Word>> {
    self.ports()?
        .operands
        .get(index)
        .cloned()
        .ok_or(CoreError::IndexOutOfRange { what: "operand port", index, limit: U::OPERAND_PORTS })
  }

  pub fn result_port(&self) -> Result<Receiver<U::Output>> {
    Ok(self.ports()?.result.clone())
  }

  pub fn error_port(&self) -> Result<Receiver<CoreError>> {
    Ok(self.ports()?.error.clone())
  }

  // endregion

  /// Sends one operation with its operands and waits for the result or the error.
  pub fn submit(&self, operation: U::Operation, operands: &[Word]) -> Result<U::Output> {
    let ports    = self.ports()?;
    let expected = U::operand_count(&operation);
    if operands.len() != expected {
      return Err(CoreError::IndexOutOfRange { what: "operand count", index: operands.len(), limit: expected });
    }

    let disconnected = || CoreError::UnitDisconnected(U::NAME);
    ports.operation.send(operation).map_err(|_| disconnected())?;
    for (port, value) in ports.operands.iter().zip(operands) {
      port.send(*value).map_err(|_| disconnected())?;
    }

    select! {
      recv(ports.result) -> output => output.map_err(|_| disconnected()),
      recv(ports.error) -> error => match error {
        Ok(error) => Err(error),
        Err(_)    => Err(disconnected()),
      },
    }
  }
}

impl<U: FunctionalUnit> Drop for UnitActor<U> {
  fn drop(&mut self) {
    if let ActorState::Running(_) = self.state {
      let _ = self.stop();
    }
  }
}

/// Receives from `port` unless the shutdown channel closes first.
fn receive<T>(port: &Receiver<T>, shutdown: &Receiver<()>) -> Option<T> {
  select! {
    recv(port) -> message => message.ok(),
    recv(shutdown) -> _ => None,
  }
}

/// Sends on `port` unless the shutdown channel closes first.
fn deliver<T>(port: &Sender<T>, value: T, shutdown: &Receiver<()>) -> bool {
  select! {
    send(port, value) -> sent => sent.is_ok(),
    recv(shutdown) -> _ => false,
  }
}

/// The processing loop. Returns the unit when the run ends.
fn process<U: FunctionalUnit>(
    mut unit  : U,
    endpoints : Endpoints<U>,
    shutdown  : Receiver<()>,
    running   : Arc<AtomicBool>
  ) -> U
{
  while running.load(Ordering::SeqCst) {
    let operation = match receive(&endpoints.operation, &shutdown) {
      Some(operation) => operation,
      None            => break
    };

    let count = U::operand_count(&operation);
    debug_assert!(count <= U::OPERAND_PORTS);
    let mut operands = Vec::with_capacity(count);
    for port in endpoints.operands.iter().take(count) {
      match receive(port, &shutdown) {
        Some(value) => operands.push(value),
        None        => return unit
      }
    }

    log::trace!("{} unit: {:?} {:?}", U::NAME, operation, operands);
    let delivered =
      match unit.execute(operation, &operands) {
        Ok(output) => deliver(&endpoints.result, output, &shutdown),
        Err(error) => deliver(&endpoints.error, error, &shutdown),
      };
    if !delivered {
      break;
    }
  }
  unit
}
