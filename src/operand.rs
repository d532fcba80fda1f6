//! Sum types naming where an operand lives. A `Place` can be written; an `Operand` is a place
//! or a literal, and can only be read.

use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Place {
  /// The register itself.
  Register(u8),
  /// The data memory cell whose address the register holds.
  Memory(u8),
  /// The data memory cell at a literal 16 bit address.
  MemoryAt(u16),
  /// The microcode cell whose address the register holds.
  Microcode(u8),
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Operand {
  Place(Place),
  Literal(u16),
}

impl Place {
  pub fn is_register(&self) -> bool {
    match self {
      Place::Register(_) => true,
      _                  => false
    }
  }
}

impl From<Place> for Operand {
  fn from(place: Place) -> Self {
    Operand::Place(place)
  }
}

impl Display for Place {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Place::Register(r)  => write!(f, "r{}", r),
      Place::Memory(r)    => write!(f, "data[r{}]", r),
      Place::MemoryAt(a)  => write!(f, "data[{:#06x}]", a),
      Place::Microcode(r) => write!(f, "micro[r{}]", r),
    }
  }
}

impl Display for Operand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Operand::Place(place)  => write!(f, "{}", place),
      Operand::Literal(v)    => write!(f, "#{:#06x}", v),
    }
  }
}
