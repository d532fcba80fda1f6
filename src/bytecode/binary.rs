/*!
  This module is responsible for the encoding and decoding of binary instructions.

  Every 32 bit pattern is a legal instruction, so decoding is total. Whether the decoded
  group/operation pair means anything is decided by the execution units at dispatch.
*/

use super::{DecodedInstruction, Instruction};

// If you change these you must also change `DecodedInstruction::GROUP_BITS` and `OP_BITS`.
const GROUP_MASK : u8 = 0b0000_0111;
const OP_SHIFT   : u8 = 3;

/// `[control][dest][src0][src1]`, little-endian, control = `(op << 3) | group`.
pub fn decode_instruction(instruction: Instruction) -> DecodedInstruction {
  let [control, dest, src0, src1] = instruction.0.to_le_bytes();
  DecodedInstruction::from_fields(control & GROUP_MASK, control >> OP_SHIFT, [dest, src0, src1])
}

/**
  Encodes the instruction into bytecode. `DecodedInstruction` guarantees `group < 8` and
  `op < 32`, so nothing is lost.
*/
pub fn encode_instruction(decoded: DecodedInstruction) -> Instruction {
  let control = (decoded.op() << OP_SHIFT) | decoded.group();
  let [dest, src0, src1] = decoded.data();
  Instruction(u32::from_le_bytes([control, dest, src0, src1]))
}
