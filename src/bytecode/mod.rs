/*!

  Instructions are a fixed 32 bits, stored in code memory as little-endian words. The sizes of
  instruction components are as follows:

    Group:        3 bits
    Operation:    5 bits
    Operands:  3 x 8 bits  (dest, src0, src1), or
               8 + 16 bits (dest, immediate)

  One design decision that needed to be made is whether to store the operands of the
  instruction as data members of enum variants, with one variant per opcode. Decoding must be
  total (every bit pattern is an instruction), and a per-opcode enum cannot represent the
  thousands of undefined patterns without a catch-all variant that the compiler can no longer
  check. Instead, the decoded form keeps the raw fields, and an enum is used per group for the
  operation itself. Matching on those enums is exhaustive, and a missing variant is the visible
  "invalid operation" case at dispatch.

*/

mod binary;
mod instruction;
mod operation;

pub use binary::{decode_instruction, encode_instruction};
pub use instruction::{DecodedInstruction, Instruction};
pub use operation::{
  ArithmeticOp, Combinator, CompareOp, Group, JumpOp, MiscOp, MoveOp, OperandLayout, Relation,
  SystemCommand, COMBINATOR_COUNT, GROUP_SLOTS, OP_SLOTS,
};
