//! The compare unit: `pred <- combine(pred, reg[src0] (relation) reg[src1])`. Comparisons are
//! unsigned.

use crate::bytecode::{Combinator, CompareOp, DecodedInstruction, Relation};
use crate::error::Result;
use crate::machine::Core;
use crate::profile::Word;

impl Relation {
  pub fn holds(self, a: Word, b: Word) -> bool {
    match self {
      Relation::Equal              => a == b,
      Relation::NotEqual           => a != b,
      Relation::LessThan           => a < b,
      Relation::GreaterThan        => a > b,
      Relation::LessThanOrEqual    => a <= b,
      Relation::GreaterThanOrEqual => a >= b,
    }
  }
}

impl Combinator {
  pub fn combine(self, old: bool, new: bool) -> bool {
    match self {
      Combinator::Overwrite => new,
      Combinator::And       => old && new,
      Combinator::Or        => old || new,
      Combinator::Xor       => old ^ new,
    }
  }
}

pub fn evaluate(op: CompareOp, predicate: bool, a: Word, b: Word) -> bool {
  op.combinator.combine(predicate, op.relation.holds(a, b))
}

pub fn execute(core: &mut Core, op: CompareOp, instruction: &DecodedInstruction) -> Result<()> {
  let a      = core.register(instruction.src0());
  let b      = core.register(instruction.src1());
  let result = evaluate(op, core.predicate(), a, b);
  core.set_predicate(result)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::profile::IsaProfile;
  use strum::IntoEnumIterator;

  #[test]
  fn combinator_truth_tables(){
    for old in [false, true].iter().copied() {
      for new in [false, true].iter().copied() {
        assert_eq!(Combinator::Overwrite.combine(old, new), new);
        assert_eq!(Combinator::And.combine(old, new), old && new);
        assert_eq!(Combinator::Or.combine(old, new), old || new);
        assert_eq!(Combinator::Xor.combine(old, new), old != new);
      }
    }
  }

  #[test]
  fn relations_are_unsigned(){
    let big = u64::MAX;
    assert!(Relation::GreaterThan.holds(big, 1));
    assert!(Relation::LessThanOrEqual.holds(3, 3));
    assert!(!Relation::LessThan.holds(3, 3));
    for relation in Relation::iter() {
      // Each relation and its complement disagree on every pair.
      let complement = match relation {
        Relation::Equal              => Relation::NotEqual,
        Relation::NotEqual           => Relation::Equal,
        Relation::LessThan           => Relation::GreaterThanOrEqual,
        Relation::GreaterThan        => Relation::LessThanOrEqual,
        Relation::LessThanOrEqual    => Relation::GreaterThan,
        Relation::GreaterThanOrEqual => Relation::LessThan,
      };
      for (a, b) in [(0, 0), (1, 2), (2, 1), (big, 0)].iter().copied() {
        assert_ne!(relation.holds(a, b), complement.holds(a, b));
      }
    }
  }

  #[test]
  fn chained_compares_fold_into_the_predicate(){
    let mut core = Core::new(IsaProfile::COMPACT16);
    core.set_register(7, 4).unwrap();
    core.set_register(8, 9).unwrap();

    let lt     = CompareOp::new(Relation::LessThan, Combinator::Overwrite);
    let eq_and = CompareOp::new(Relation::Equal, Combinator::And);
    let ne_or  = CompareOp::new(Relation::NotEqual, Combinator::Or);

    core.dispatch(&DecodedInstruction::compare(lt, 7, 8)).unwrap();
    assert!(core.predicate());
    core.dispatch(&DecodedInstruction::compare(eq_and, 7, 8)).unwrap();
    assert!(!core.predicate());
    core.dispatch(&DecodedInstruction::compare(ne_or, 7, 8)).unwrap();
    assert!(core.predicate());
    assert_eq!(core.register(core.profile().registers.predicate), 1);
  }

  #[test]
  fn every_encoded_compare_decodes_back(){
    for code in 0..24u8 {
      let op = <CompareOp as std::convert::TryFrom<u8>>::try_from(code).unwrap();
      assert_eq!(op.code(), code);
    }
  }
}
