/*!
  ISA profiles. The core generations differ in word width, in the layout of the special
  register block, and in the sizes of the memory segments, but they share one instruction
  format and one set of execution units. A profile is selected when a core is constructed and
  never changes afterward.

  Register layout common to every profile:

  ```text
    r0          constant 0 ("false"), write protected
    r1          constant 1 ("true"), write protected
    r2 ..       special registers (profile dependent, see `SpecialRegisters`)
    first_general .. r255   general purpose
  ```
*/

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

/// Architectural state is stored in `u64` cells and masked to the profile's word width.
pub type Word = u64;

/// Every profile has 256 registers, one per value of an operand byte.
pub const REGISTER_COUNT: usize = 256;
pub const FALSE_REGISTER: u8 = 0;
pub const TRUE_REGISTER: u8 = 1;

#[derive(
  StrumDisplay, IntoStaticStr, EnumString,
  Clone,        Copy,          Eq, PartialEq, Debug, Hash
)]
#[strum(serialize_all = "snake_case")]
pub enum Generation {
  /// 16 bit words, no count register, no microcode.
  Compact16,
  /// 64 bit words, a count register, and a microcode segment.
  Wide64,
}

/// Indices of the hardware-reserved registers.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct SpecialRegisters {
  pub instruction_pointer : u8,
  pub stack_pointer       : u8,
  pub predicate           : u8,
  pub call_pointer        : u8,
  pub count               : Option<u8>,
  pub first_general       : u8,
}

impl SpecialRegisters {
  /// The display name of a reserved register, `None` for general purpose registers.
  pub fn name(&self, index: u8) -> Option<&'static str> {
    match index {
      FALSE_REGISTER                        => Some("false"),
      TRUE_REGISTER                         => Some("true"),
      i if i == self.instruction_pointer    => Some("ip"),
      i if i == self.stack_pointer          => Some("sp"),
      i if i == self.predicate              => Some("pred"),
      i if i == self.call_pointer           => Some("csp"),
      i if Some(i) == self.count            => Some("count"),
      _                                     => None
    }
  }

  pub fn is_general(&self, index: u8) -> bool {
    index >= self.first_general
  }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct IsaProfile {
  pub generation          : Generation,
  pub word_bits           : u32,
  pub registers           : SpecialRegisters,
  pub code_capacity       : usize,
  /// Data addresses at or above this capacity are routed to the IO devices.
  pub data_capacity       : usize,
  pub stack_capacity      : usize,
  pub call_stack_capacity : usize,
  /// Zero when the generation has no microcode segment.
  pub microcode_capacity  : usize,
}

impl IsaProfile {
  pub const COMPACT16: IsaProfile = IsaProfile {
    generation          : Generation::Compact16,
    word_bits           : 16,
    registers           : SpecialRegisters {
      instruction_pointer : 2,
      stack_pointer       : 3,
      predicate           : 4,
      call_pointer        : 5,
      count               : None,
      first_general       : 6,
    },
    code_capacity       : 0x1_0000,
    data_capacity       : 0xF000,
    stack_capacity      : 0x1000,
    call_stack_capacity : 0x400,
    microcode_capacity  : 0,
  };

  pub const WIDE64: IsaProfile = IsaProfile {
    generation          : Generation::Wide64,
    word_bits           : 64,
    registers           : SpecialRegisters {
      instruction_pointer : 2,
      stack_pointer       : 3,
      predicate           : 4,
      call_pointer        : 6,
      count               : Some(5),
      first_general       : 7,
    },
    code_capacity       : 0x4000,
    data_capacity       : 0x1_0000,
    stack_capacity      : 0x2000,
    call_stack_capacity : 0x800,
    microcode_capacity  : 0x1000,
  };

  pub fn for_generation(generation: Generation) -> IsaProfile {
    match generation {
      Generation::Compact16 => IsaProfile::COMPACT16,
      Generation::Wide64    => IsaProfile::WIDE64,
    }
  }

  pub fn word_mask(&self) -> Word {
    match self.word_bits >= Word::BITS {
      true  => Word::MAX,
      false => (1 << self.word_bits) - 1
    }
  }

  /// Truncates `value` to the word width.
  pub fn mask(&self, value: Word) -> Word {
    value & self.word_mask()
  }

  /// Width of one word in a program image.
  pub fn word_bytes(&self) -> usize {
    (self.word_bits / 8) as usize
  }

  /// The "top of stack" constant: an empty stack's pointer. Pushing pre-increments, so the
  /// pointer wraps to zero on the first push.
  pub fn stack_empty(&self) -> Word {
    self.word_mask()
  }
}

impl Default for IsaProfile {
  fn default() -> Self {
    IsaProfile::COMPACT16
  }
}
