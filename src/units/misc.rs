//! The misc unit. Its only operation hands the instruction to the system call table, selected
//! by the `dest` byte.

use crate::bytecode::{DecodedInstruction, MiscOp};
use crate::error::Result;
use crate::machine::Core;

pub fn execute(core: &mut Core, op: MiscOp, instruction: &DecodedInstruction) -> Result<()> {
  match op {
    MiscOp::SystemCall => {
      let handler = core.system_calls().handler(instruction.dest());
      handler(core, instruction)
    }
  }
}
