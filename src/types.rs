//! Shared types used across the beacon
//!
//! This module defines domain-specific types that enforce invariants
//! at construction time and provide type safety throughout the codebase.

use core::fmt;

/// Width of a phase accumulator in bits
///
/// Valid widths are 1 to 32 bits. All phase arithmetic is performed
/// modulo `2^W`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccumulatorWidth(u8);

impl AccumulatorWidth {
    /// Smallest supported width
    pub const MIN_BITS: u8 = 1;

    /// Largest supported width (one machine word)
    pub const MAX_BITS: u8 = 32;

    /// Narrow accumulator used by the compact variant
    pub const NARROW: Self = Self(13);

    /// Full-precision accumulator
    pub const WIDE: Self = Self(32);

    /// Create a width from a bit count, returns None if out of range
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits >= Self::MIN_BITS && bits <= Self::MAX_BITS {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Number of bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Mask selecting the low `W` bits
    #[must_use]
    pub const fn mask(self) -> u32 {
        if self.0 == 32 {
            u32::MAX
        } else {
            (1u32 << self.0) - 1
        }
    }

    /// Number of distinct phase values (`2^W`)
    #[must_use]
    pub const fn modulus(self) -> u64 {
        1u64 << self.0
    }

    /// Mask selecting the most significant bit
    #[must_use]
    pub const fn msb_mask(self) -> u32 {
        1u32 << (self.0 - 1)
    }
}

impl fmt::Debug for AccumulatorWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccumulatorWidth({} bits)", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for AccumulatorWidth {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} bits", self.0);
    }
}

/// Frequency-control word added to the phase accumulator each cycle
///
/// Represents the fraction `word / 2^W` of the synthesis clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrequencyWord(u32);

impl FrequencyWord {
    /// The unit word, which turns the accumulator into a plain counter
    pub const ONE: Self = Self(1);

    /// Wrap a raw value
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Create a word that must fit the given width, returns None otherwise
    #[must_use]
    pub const fn checked(raw: u32, width: AccumulatorWidth) -> Option<Self> {
        if raw & !width.mask() == 0 {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Raw value
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Check whether this word fits in `width` bits
    #[must_use]
    pub const fn fits(self, width: AccumulatorWidth) -> bool {
        self.0 & !width.mask() == 0
    }
}

impl fmt::Debug for FrequencyWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrequencyWord({:#x})", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for FrequencyWord {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u32:#x}", self.0);
    }
}

/// Logical signals produced by the control domain
///
/// These are the only values that cross into the synthesis domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ControlSignals {
    /// Message bit is keyed (tone should be transmitted)
    pub tone_active: bool,
    /// Slow audio-rate toggle choosing the upper or lower tone
    pub pitch_phase: bool,
}

impl ControlSignals {
    /// All signals deasserted
    pub const IDLE: Self = Self {
        tone_active: false,
        pitch_phase: false,
    };

    /// Create a signal pair
    #[must_use]
    pub const fn new(tone_active: bool, pitch_phase: bool) -> Self {
        Self {
            tone_active,
            pitch_phase,
        }
    }

    /// Pack into two bits (bit 0 = tone, bit 1 = pitch)
    #[must_use]
    pub const fn to_bits(self) -> u8 {
        (self.tone_active as u8) | ((self.pitch_phase as u8) << 1)
    }

    /// Unpack from the two-bit form produced by [`Self::to_bits`]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            tone_active: bits & 0b01 != 0,
            pitch_phase: bits & 0b10 != 0,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ControlSignals {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "tone={} pitch={}", self.tone_active, self.pitch_phase);
    }
}

/// Configuration rejected during validation
///
/// Every failure mode of the beacon is caught here; once a
/// [`FrequencyPlan`](crate::config::FrequencyPlan) exists nothing
/// can fail at run time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A clock rate was zero
    ZeroClock,
    /// Accumulator width outside 1..=32 bits
    InvalidWidth(u8),
    /// Fast clock is not sufficiently faster than the control clock
    ClockRatioTooLow {
        /// Actual fast/slow ratio (integer part)
        ratio: u32,
        /// Required minimum ratio
        minimum: u32,
    },
    /// A frequency word rounded to zero
    WordUnderflow {
        /// Frequency that produced the word
        hz: u32,
    },
    /// A frequency word does not fit the accumulator width
    WordOverflow {
        /// Offending raw word
        word: u64,
        /// Accumulator width in bits
        bits: u8,
    },
    /// Deviation collapses HIGH or LOW onto CENTER
    DegenerateDeviation,
    /// Deviation takes LOW to zero or below
    LowWordUnderflow {
        /// CENTER word
        center: u32,
        /// Deviation in word units
        delta: u32,
    },
    /// Morse unit length of zero ticks
    ZeroUnitLength,
    /// Message contains no keyed bits
    EmptyMessage,
    /// Pitch bit index outside the control counter
    InvalidPitchBit(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroClock => write!(f, "clock rate must be non-zero"),
            Self::InvalidWidth(bits) => {
                write!(f, "accumulator width {bits} outside 1..=32 bits")
            }
            Self::ClockRatioTooLow { ratio, minimum } => write!(
                f,
                "fast/slow clock ratio {ratio} below {minimum}; domain crossing is unsafe"
            ),
            Self::WordUnderflow { hz } => {
                write!(f, "{hz} Hz rounds to a zero frequency word")
            }
            Self::WordOverflow { word, bits } => {
                write!(f, "frequency word {word} does not fit in {bits} bits")
            }
            Self::DegenerateDeviation => {
                write!(f, "deviation leaves HIGH or LOW equal to CENTER")
            }
            Self::LowWordUnderflow { center, delta } => {
                write!(f, "LOW word {center} - {delta} is not a positive frequency word")
            }
            Self::ZeroUnitLength => write!(f, "Morse unit must last at least one tick"),
            Self::EmptyMessage => write!(f, "message has no keyed bits"),
            Self::InvalidPitchBit(bit) => {
                write!(f, "pitch bit {bit} outside the 32-bit control counter")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "embedded")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::ZeroClock => defmt::write!(f, "ZeroClock"),
            Self::InvalidWidth(bits) => defmt::write!(f, "InvalidWidth({})", bits),
            Self::ClockRatioTooLow { ratio, minimum } => {
                defmt::write!(f, "ClockRatioTooLow({} < {})", ratio, minimum);
            }
            Self::WordUnderflow { hz } => defmt::write!(f, "WordUnderflow({} Hz)", hz),
            Self::WordOverflow { word, bits } => {
                defmt::write!(f, "WordOverflow({} in {} bits)", word, bits);
            }
            Self::DegenerateDeviation => defmt::write!(f, "DegenerateDeviation"),
            Self::LowWordUnderflow { center, delta } => {
                defmt::write!(f, "LowWordUnderflow({} - {})", center, delta);
            }
            Self::ZeroUnitLength => defmt::write!(f, "ZeroUnitLength"),
            Self::EmptyMessage => defmt::write!(f, "EmptyMessage"),
            Self::InvalidPitchBit(bit) => defmt::write!(f, "InvalidPitchBit({})", bit),
        }
    }
}
