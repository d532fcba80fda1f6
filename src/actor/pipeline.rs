/*!
  A reference composition of the functional units:

  ```text
    fetch ─▶ decode ─▶ register read ─▶ arithmetic | compare | branch | memory ─▶ write back
  ```

  Fetch reads the pipeline's own copy of code memory; everything else goes through a unit. The
  pipeline runs the arithmetic, move, compare, and jump groups in full, and the built-in system
  calls. The memory controller holds plain RAM, the data stack, and microcode, so IO devices are
  not reachable from a pipeline.
*/

use std::convert::TryFrom;
use std::io::Write;

use super::units::{
  ArithmeticUnit, BranchUnit, CompareUnit, DecodeOp, DecodeUnit, MemoryControllerUnit, MemoryOp,
  RegisterFileUnit, RegisterOp,
};
use super::UnitActor;
use crate::bytecode::{
  ArithmeticOp, CompareOp, DecodedInstruction, Group, Instruction, JumpOp, MiscOp, MoveOp,
  SystemCommand,
};
use crate::error::{CoreError, Result};
use crate::interpreter::Processor;
use crate::machine::{Core, Status};
use crate::memory::{MemorySegments, Segment};
use crate::operand::{Operand, Place};
use crate::profile::{IsaProfile, Word};
use crate::registers::RegisterFile;
use crate::units::movement::{transfer, Transfer};
use crate::units::syscall::compose_character;
use crate::units::{jump::jump_form, IMPLEMENTED_GROUPS};

pub struct Pipeline {
  profile   : IsaProfile,
  code      : Segment<Instruction>,
  decode    : UnitActor<DecodeUnit>,
  registers : UnitActor<RegisterFileUnit>,
  alu       : UnitActor<ArithmeticUnit>,
  compare   : UnitActor<CompareUnit>,
  branch    : UnitActor<BranchUnit>,
  data      : UnitActor<MemoryControllerUnit>,
  output    : Box<dyn Write + Send>,
  status    : Status,
  steps     : u64,
}

impl Pipeline {
  /// A pipeline in the power-on state with `program` at address 0. The units are started.
  pub fn new(profile: IsaProfile, program: &[Instruction]) -> Result<Pipeline> {
    let mut core = Core::new(profile);
    core.install_program(program)?;
    Pipeline::from_core(&core)
  }

  /// A pipeline holding a copy of `core`'s registers and memory. The units are started.
  pub fn from_core(core: &Core) -> Result<Pipeline> {
    Pipeline::assemble(*core.profile(), core.registers().clone(), core.memory().clone())
  }

  fn assemble(profile: IsaProfile, registers: RegisterFile, memory: MemorySegments) -> Result<Pipeline> {
    let MemorySegments { code, data, stack, call_stack, microcode } = memory;
    let controller = MemoryControllerUnit::with_segments(&profile, data, stack, microcode);

    let mut pipeline = Pipeline {
      profile,
      code,
      decode    : UnitActor::new(DecodeUnit),
      registers : UnitActor::new(RegisterFileUnit::with_registers(registers)),
      alu       : UnitActor::new(ArithmeticUnit::new(&profile)),
      compare   : UnitActor::new(CompareUnit),
      branch    : UnitActor::new(BranchUnit::with_call_stack(&profile, call_stack)),
      data      : UnitActor::new(controller),
      output    : Box::new(std::io::stdout()),
      status    : Status::Running,
      steps     : 0,
    };

    pipeline.decode.start()?;
    pipeline.registers.start()?;
    pipeline.alu.start()?;
    pipeline.compare.start()?;
    pipeline.branch.start()?;
    pipeline.data.start()?;
    Ok(pipeline)
  }

  pub fn with_output<W: Write + Send + 'static>(mut self, output: W) -> Pipeline {
    self.output = Box::new(output);
    self
  }

  /// Stops every unit. Stepping afterward fails with `UnitNotRunning`.
  pub fn shutdown(&mut self) -> Result<()> {
    let stopped = vec![
      self.decode.stop(),
      self.registers.stop(),
      self.alu.stop(),
      self.compare.stop(),
      self.branch.stop(),
      self.data.stop(),
    ];

    // Every unit gets its stop; the first failure is the one reported.
    let mut outcome = Ok(());
    for result in stopped {
      if let Err(error) = result {
        log::debug!("pipeline shutdown: {}", error);
        if outcome.is_ok() {
          outcome = Err(error);
        }
      }
    }
    outcome
  }

  pub fn steps(&self) -> u64 {
    self.steps
  }

  pub fn load_data(&self, address: Word) -> Result<Word> {
    self.data.submit(MemoryOp::Load, &[address])
  }

  // region Unit traffic

  fn read_register(&self, index: u8) -> Result<Word> {
    self.registers.submit(RegisterOp::Read(index), &[])
  }

  fn write_register(&self, index: u8, value: Word) -> Result<()> {
    self.registers.submit(RegisterOp::Write(index), &[value]).map(|_| ())
  }

  fn read_place(&self, place: Place) -> Result<Word> {
    match place {
      Place::Register(r)  => self.read_register(r),
      Place::Memory(r)    => {
        let address = self.read_register(r)?;
        self.data.submit(MemoryOp::Load, &[address])
      }
      Place::MemoryAt(a)  => self.data.submit(MemoryOp::Load, &[a as Word]),
      Place::Microcode(r) => {
        let address = self.read_register(r)?;
        self.data.submit(MemoryOp::LoadMicrocode, &[address])
      }
    }
  }

  fn read_operand(&self, operand: Operand) -> Result<Word> {
    match operand {
      Operand::Literal(value) => Ok(value as Word),
      Operand::Place(place)   => self.read_place(place),
    }
  }

  fn write_place(&self, place: Place, value: Word) -> Result<()> {
    match place {
      Place::Register(r)  => self.write_register(r, value),
      Place::Memory(r)    => {
        let address = self.read_register(r)?;
        self.data.submit(MemoryOp::Store, &[address, value]).map(|_| ())
      }
      Place::MemoryAt(a)  => self.data.submit(MemoryOp::Store, &[a as Word, value]).map(|_| ()),
      Place::Microcode(r) => {
        let address = self.read_register(r)?;
        self.data.submit(MemoryOp::StoreMicrocode, &[address, value]).map(|_| ())
      }
    }
  }

  fn stack_pointer(&self) -> Result<Word> {
    self.read_register(self.profile.registers.stack_pointer)
  }

  // endregion

  // region Groups
  // Each returns whether the instruction pointer should advance.

  fn execute_arithmetic(&self, instruction: &DecodedInstruction) -> Result<bool> {
    let code = instruction.op();
    let op   = ArithmeticOp::try_from(code).map_err(|_| CoreError::NotImplemented { group: "arithmetic", op: code })?;
    let dest = instruction.dest();

    let operands =
      match op.is_immediate() {
        true  => [self.read_register(dest)?, instruction.immediate() as Word],
        false => [self.read_register(instruction.src0())?, self.read_register(instruction.src1())?],
      };
    let value = self.alu.submit(op, &operands)?;
    self.write_register(dest, value)?;
    Ok(true)
  }

  fn execute_compare(&self, instruction: &DecodedInstruction) -> Result<bool> {
    let op        = CompareOp::try_from(instruction.op()).map_err(CoreError::InvalidCompareOperation)?;
    let predicate = self.profile.registers.predicate;

    let operands = [
      self.read_register(predicate)?,
      self.read_register(instruction.src0())?,
      self.read_register(instruction.src1())?,
    ];
    let value = self.compare.submit(op, &operands)?;
    self.write_register(predicate, value)?;
    Ok(true)
  }

  fn execute_jump(&self, instruction: &DecodedInstruction) -> Result<bool> {
    let code    = instruction.op();
    let op      = JumpOp::try_from(code).map_err(|_| CoreError::IllegalJumpOperation(code))?;
    let special = self.profile.registers;
    let form    = jump_form(op, instruction).try_map(|operand| self.read_operand(operand))?;

    let operands = [
      self.read_register(special.instruction_pointer)?,
      self.read_register(special.predicate)?,
      self.read_register(special.call_pointer)?,
    ];
    let outcome = self.branch.submit(form, &operands)?;
    self.write_register(special.call_pointer, outcome.call_pointer)?;
    self.write_register(special.instruction_pointer, outcome.instruction_pointer)?;
    Ok(false)
  }

  fn execute_move(&self, instruction: &DecodedInstruction) -> Result<bool> {
    let code = instruction.op();
    let op   = MoveOp::try_from(code).map_err(|_| CoreError::InvalidMoveOperation(code))?;
    let sp   = self.profile.registers.stack_pointer;

    match transfer(op, instruction) {

      Transfer::Copy { dest, source } => {
        let value = self.read_operand(source)?;
        self.write_place(dest, value)?;
      }

      Transfer::Swap(a, b) => {
        let first  = self.read_place(a)?;
        let second = self.read_place(b)?;
        self.write_place(a, second)?;
        if let Err(error) = self.write_place(b, first) {
          self.write_place(a, first)?;
          return Err(error);
        }
      }

      Transfer::Push(source) => {
        let value   = self.read_operand(source)?;
        let pointer = self.data.submit(MemoryOp::Push, &[self.stack_pointer()?, value])?;
        self.write_register(sp, pointer)?;
      }

      // Write the destination before the pointer moves, as the interpreter does.
      Transfer::Pop(dest) => {
        let pointer = self.stack_pointer()?;
        let value   = self.data.submit(MemoryOp::Peek, &[pointer])?;
        self.write_place(dest, value)?;
        let pointer = self.data.submit(MemoryOp::Pop, &[pointer])?;
        self.write_register(sp, pointer)?;
      }

      Transfer::Peek(dest) => {
        let value = self.data.submit(MemoryOp::Peek, &[self.stack_pointer()?])?;
        self.write_place(dest, value)?;
      }

    }
    Ok(true)
  }

  fn execute_misc(&mut self, instruction: &DecodedInstruction) -> Result<bool> {
    let code = instruction.op();
    MiscOp::try_from(code).map_err(|_| CoreError::InvalidMiscOperation(code))?;

    let selector = instruction.dest();
    match SystemCommand::try_from(selector) {

      Ok(SystemCommand::Terminate) => {
        log::debug!("pipeline terminate after {} steps", self.steps + 1);
        self.status = Status::Halted;
      }

      Ok(SystemCommand::Panic) => return Err(CoreError::Panic(instruction.immediate())),

      Ok(SystemCommand::Putc) => {
        let (low, high) = (instruction.src0(), instruction.src1());
        let character   = compose_character(self.read_register(low)?, self.read_register(high)?, low == high)?;
        let mut buffer  = [0u8; 4];
        self.output.write_all(character.encode_utf8(&mut buffer).as_bytes())?;
        self.output.flush()?;
      }

      Err(_) => return Err(CoreError::InvalidSystemCommand(selector)),

    }
    Ok(true)
  }

  // endregion

  fn execute_next(&mut self) -> Result<()> {
    let ip_register = self.profile.registers.instruction_pointer;
    let ip          = self.read_register(ip_register)?;
    let word        = self.code.load(ip)?.bits() as Word;
    let instruction = self.decode.submit(DecodeOp::Decode, &[word])?;

    log::trace!("{:#06x}: {}", ip, instruction);
    let group = instruction.decoded_group().ok_or(CoreError::IndexOutOfRange {
      what  : "instruction group",
      index : instruction.group() as usize,
      limit : IMPLEMENTED_GROUPS
    })?;

    let advance =
      match group {
        Group::Arithmetic => self.execute_arithmetic(&instruction)?,
        Group::Move       => self.execute_move(&instruction)?,
        Group::Jump       => self.execute_jump(&instruction)?,
        Group::Compare    => self.execute_compare(&instruction)?,
        Group::Misc       => self.execute_misc(&instruction)?,
      };

    if advance {
      self.write_register(ip_register, self.profile.mask(ip.wrapping_add(1)))?;
    }
    self.steps += 1;
    Ok(())
  }
}

impl Processor for Pipeline {
  fn profile(&self) -> &IsaProfile {
    &self.profile
  }

  fn status(&self) -> Status {
    self.status
  }

  fn register(&self, index: u8) -> Result<Word> {
    self.read_register(index)
  }

  fn step(&mut self) -> Result<()> {
    if self.status != Status::Running {
      return Ok(());
    }
    self.execute_next().map_err(|error| {
      log::debug!("pipeline fault: {}", error);
      self.status = Status::Faulted;
      error
    })
  }
}
