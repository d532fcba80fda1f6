use softcore::bytecode::{ArithmeticOp, DecodedInstruction, MoveOp, SystemCommand};
use softcore::{CoreBuilder, IsaProfile, Pipeline, Processor};

fn greeting() -> Vec<DecodedInstruction> {
  let putc = SystemCommand::Putc.into();
  let mut program = Vec::new();

  for character in "Hello from softcore!\n".chars() {
    program.push(DecodedInstruction::movement_immediate(MoveOp::Set, 6, character as u16));
    program.push(DecodedInstruction::system_call(putc, 6, 6));
  }
  program.push(DecodedInstruction::movement_immediate(MoveOp::Set, 7, 20));
  program.push(DecodedInstruction::arithmetic_immediate(ArithmeticOp::MulImmediate, 7, 21));
  program.push(DecodedInstruction::terminate());
  program
}

fn main() -> softcore::Result<()> {
  #[cfg(feature = "trace_computation")]
  println!("Computation Tracing ENABLED");

  let program = greeting();

  let mut core = CoreBuilder::new(IsaProfile::COMPACT16).build()?;
  core.install_decoded(&program)?;
  let mut pipeline = Pipeline::from_core(&core)?;

  let steps = core.run()?;
  println!("Interpreter: {} steps, r7 = {}", steps, core.register(7));
  println!("{}", core);

  let steps = pipeline.run()?;
  println!("Pipeline: {} steps, r7 = {}", steps, pipeline.register(7)?);
  pipeline.shutdown()
}
