/*!
  Per-group operation codes.

  Each group owns a 5 bit operation field, so every enum below has at most 32 variants. Rust
  stores these fieldless enums as a single byte with consecutive discriminants, which makes the
  discriminant the operation code itself. The order of the variants is therefore significant:
  it IS the binary encoding.

  Operation codes that have no variant are legal bit patterns. They decode without complaint and
  fail at dispatch with the group's "invalid operation" error.
*/

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::EnumCount;
use strum_macros::{Display as StrumDisplay, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// Size of every per-group dispatch table.
pub const OP_SLOTS: usize = 32;

/// How the operand bytes of an instruction are rendered as assembly text.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum OperandLayout {
  /// `dest, src0, src1`
  Three,
  /// `dest, src0`
  Two,
  /// `dest`
  One,
  /// `src0, src1`
  Pair,
  /// `dest, imm16`
  DestImmediate,
  /// `imm16`
  Immediate,
  None,
}

#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, EnumCount, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,     Hash
)]
#[repr(u8)]
#[strum(serialize_all = "snake_case")]
pub enum Group {
  Arithmetic,
  Move,
  Jump,
  Compare,
  Misc,
}

/// Groups 5 through 7 are reserved.
pub const GROUP_SLOTS: usize = 8;

#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, EnumCount, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,     Hash
)]
#[repr(u8)]
pub enum ArithmeticOp {
  #[strum(serialize = "add")]    Add,
  #[strum(serialize = "sub")]    Sub,
  #[strum(serialize = "mul")]    Mul,
  #[strum(serialize = "div")]    Div,
  #[strum(serialize = "rem")]    Rem,
  #[strum(serialize = "shl")]    ShiftLeft,
  #[strum(serialize = "shr")]    ShiftRight,
  #[strum(serialize = "and")]    BinaryAnd,
  #[strum(serialize = "or")]     BinaryOr,
  #[strum(serialize = "not")]    BinaryNot,
  #[strum(serialize = "xor")]    BinaryXor,
  #[strum(serialize = "incr")]   Increment,
  #[strum(serialize = "decr")]   Decrement,
  #[strum(serialize = "double")] Double,
  #[strum(serialize = "halve")]  Halve,
  // Immediate forms //
  #[strum(serialize = "addi")]   AddImmediate,
  #[strum(serialize = "subi")]   SubImmediate,
  #[strum(serialize = "muli")]   MulImmediate,
  #[strum(serialize = "divi")]   DivImmediate,
  #[strum(serialize = "remi")]   RemImmediate,
  #[strum(serialize = "shli")]   ShiftLeftImmediate,
  #[strum(serialize = "shri")]   ShiftRightImmediate,
}

impl ArithmeticOp {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn is_immediate(&self) -> bool {
    self.code() >= ArithmeticOp::AddImmediate.code()
  }

  /// Unary operations ignore their second argument.
  pub fn is_unary(&self) -> bool {
    match self {
      | ArithmeticOp::BinaryNot
      | ArithmeticOp::Increment
      | ArithmeticOp::Decrement
      | ArithmeticOp::Double
      | ArithmeticOp::Halve     => true,
      _                         => false
    }
  }

  pub fn layout(&self) -> OperandLayout {
    match (self.is_immediate(), self.is_unary()) {
      (true, _)      => OperandLayout::DestImmediate,
      (false, true)  => OperandLayout::Two,
      (false, false) => OperandLayout::Three,
    }
  }
}

#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, EnumCount, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,     Hash
)]
#[repr(u8)]
pub enum MoveOp {
  /// `reg[dest] <- reg[src0]`
  #[strum(serialize = "move")]      Move,
  /// `reg[dest] <-> reg[src0]`
  #[strum(serialize = "swap")]      Swap,
  /// `reg[dest] <-> data[reg[src0]]`
  #[strum(serialize = "swap.rm")]   SwapRegMem,
  /// `data[reg[dest]] <-> data[reg[src0]]`
  #[strum(serialize = "swap.mm")]   SwapMemMem,
  /// `reg[dest] <-> data[imm]`
  #[strum(serialize = "swap.ra")]   SwapRegAddr,
  /// `data[reg[dest]] <-> data[imm]`
  #[strum(serialize = "swap.ma")]   SwapMemAddr,
  /// `reg[dest] <- imm`
  #[strum(serialize = "set")]       Set,
  /// `reg[dest] <- data[reg[src0]]`
  #[strum(serialize = "load")]      Load,
  /// `reg[dest] <- data[imm]`
  #[strum(serialize = "load.i")]    LoadImmediate,
  /// `data[reg[dest]] <- reg[src0]`
  #[strum(serialize = "store")]     Store,
  /// `data[reg[dest]] <- data[reg[src0]]`
  #[strum(serialize = "store.m")]   StoreMemory,
  /// `data[imm] <- reg[dest]`
  #[strum(serialize = "store.a")]   StoreImmediateAddress,
  /// `data[reg[dest]] <- imm`
  #[strum(serialize = "store.i")]   StoreImmediate,
  #[strum(serialize = "push")]      Push,
  #[strum(serialize = "push.i")]    PushImmediate,
  #[strum(serialize = "pop")]       Pop,
  #[strum(serialize = "peek")]      Peek,
  /// `reg[dest] <- microcode[reg[src0]]`
  #[strum(serialize = "load.u")]    LoadMicrocode,
  /// `microcode[reg[dest]] <- reg[src0]`
  #[strum(serialize = "store.u")]   StoreMicrocode,
}

impl MoveOp {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn layout(&self) -> OperandLayout {
    match self {
      | MoveOp::Push
      | MoveOp::Pop
      | MoveOp::Peek                  => OperandLayout::One,

      MoveOp::PushImmediate           => OperandLayout::Immediate,

      | MoveOp::SwapRegAddr
      | MoveOp::SwapMemAddr
      | MoveOp::Set
      | MoveOp::LoadImmediate
      | MoveOp::StoreImmediateAddress
      | MoveOp::StoreImmediate        => OperandLayout::DestImmediate,

      _                               => OperandLayout::Two
    }
  }
}

#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, EnumCount, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,     Hash
)]
#[repr(u8)]
pub enum JumpOp {
  // Unconditional //
  #[strum(serialize = "branch")]      Branch,
  #[strum(serialize = "branch.r")]    BranchRegister,
  #[strum(serialize = "call")]        Call,
  #[strum(serialize = "call.r")]      CallRegister,
  // Predicate true //
  #[strum(serialize = "branch.t")]    BranchIfTrue,
  #[strum(serialize = "branch.tr")]   BranchIfTrueRegister,
  #[strum(serialize = "call.t")]      CallIfTrue,
  #[strum(serialize = "call.tr")]     CallIfTrueRegister,
  // Predicate false //
  #[strum(serialize = "branch.f")]    BranchIfFalse,
  #[strum(serialize = "branch.fr")]   BranchIfFalseRegister,
  #[strum(serialize = "call.f")]      CallIfFalse,
  #[strum(serialize = "call.fr")]     CallIfFalseRegister,
  // If-then-else //
  #[strum(serialize = "select.t")]    SelectIfTrue,
  #[strum(serialize = "select.f")]    SelectIfFalse,
  #[strum(serialize = "select.ct")]   SelectCallIfTrue,
  #[strum(serialize = "select.cf")]   SelectCallIfFalse,
  #[strum(serialize = "return")]      Return,
}

impl JumpOp {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn layout(&self) -> OperandLayout {
    match self {
      | JumpOp::Branch
      | JumpOp::Call
      | JumpOp::BranchIfTrue
      | JumpOp::CallIfTrue
      | JumpOp::BranchIfFalse
      | JumpOp::CallIfFalse        => OperandLayout::Immediate,

      | JumpOp::SelectIfTrue
      | JumpOp::SelectIfFalse
      | JumpOp::SelectCallIfTrue
      | JumpOp::SelectCallIfFalse  => OperandLayout::Pair,

      JumpOp::Return               => OperandLayout::None,

      _                            => OperandLayout::One
    }
  }
}

#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, EnumCount, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,     Hash
)]
#[repr(u8)]
pub enum Relation {
  #[strum(serialize = "eq")] Equal,
  #[strum(serialize = "ne")] NotEqual,
  #[strum(serialize = "lt")] LessThan,
  #[strum(serialize = "gt")] GreaterThan,
  #[strum(serialize = "le")] LessThanOrEqual,
  #[strum(serialize = "ge")] GreaterThanOrEqual,
}

/// How a fresh comparison is folded into the current predicate value.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, EnumCount, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,     Hash
)]
#[repr(u8)]
pub enum Combinator {
  #[strum(serialize = "")]     Overwrite,
  #[strum(serialize = ".and")] And,
  #[strum(serialize = ".or")]  Or,
  #[strum(serialize = ".xor")] Xor,
}

pub const COMBINATOR_COUNT: u8 = 4;

/**
  A compare operation is a relation paired with a combinator, packed as
  `op = relation * 4 + combinator`. Six relations by four combinators fill 24 of the 32 slots.
*/
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct CompareOp {
  pub relation   : Relation,
  pub combinator : Combinator,
}

impl CompareOp {
  pub fn new(relation: Relation, combinator: Combinator) -> CompareOp {
    CompareOp { relation, combinator }
  }

  pub fn code(&self) -> u8 {
    Into::<u8>::into(self.relation) * COMBINATOR_COUNT + Into::<u8>::into(self.combinator)
  }

  pub fn layout(&self) -> OperandLayout {
    OperandLayout::Pair
  }
}

impl TryFrom<u8> for CompareOp {
  type Error = u8;

  fn try_from(code: u8) -> Result<Self, Self::Error> {
    let relation   = Relation::try_from(code / COMBINATOR_COUNT).map_err(|_| code)?;
    let combinator = Combinator::try_from(code % COMBINATOR_COUNT).map_err(|_| code)?;
    Ok(CompareOp { relation, combinator })
  }
}

impl Display for CompareOp {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}{}", self.relation, self.combinator)
  }
}

#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, EnumCount, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,     Hash
)]
#[repr(u8)]
pub enum MiscOp {
  #[strum(serialize = "system")] SystemCall,
}

impl MiscOp {
  pub fn layout(&self) -> OperandLayout {
    OperandLayout::Three
  }
}

/// Built-in selectors of the system call table.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, EnumCount, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,     Hash
)]
#[repr(u8)]
#[strum(serialize_all = "snake_case")]
pub enum SystemCommand {
  Terminate,
  Panic,
  Putc,
}

// A variant past slot 31 would be cut from its dispatch table, so growing an enum that far
// stops the build.
const _: () = {
  assert!(ArithmeticOp::COUNT <= OP_SLOTS);
  assert!(MoveOp::COUNT <= OP_SLOTS);
  assert!(JumpOp::COUNT <= OP_SLOTS);
  assert!(MiscOp::COUNT <= OP_SLOTS);
  assert!(Combinator::COUNT == COMBINATOR_COUNT as usize);
  assert!(Relation::COUNT * Combinator::COUNT <= OP_SLOTS);
  assert!(Group::COUNT <= GROUP_SLOTS);
};
