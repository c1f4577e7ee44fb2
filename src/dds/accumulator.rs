//! Phase Accumulator
//!
//! The DDS core. Every fast clock cycle:
//!
//! ```text
//! phase ← (phase + word) mod 2^W
//! out   ← phase[W-1]
//! ```
//!
//! The most significant bit is a square wave whose long-run frequency is
//! `f_clock * word / 2^W`. Individual periods jitter by one clock cycle when
//! `2^W / word` is not an integer; the average is exact.

use crate::types::{AccumulatorWidth, FrequencyWord};

/// A phase register advanced once per fast clock edge
pub trait Accumulator {
    /// Add `word` and return the new output bit
    fn clock(&mut self, word: FrequencyWord) -> bool;

    /// Register contents
    fn phase(&self) -> u32;

    /// Register width
    fn width(&self) -> AccumulatorWidth;

    /// Clear the register
    fn reset(&mut self);

    /// Synthesized output: the most significant phase bit
    fn output(&self) -> bool {
        self.phase() & self.width().msb_mask() != 0
    }
}

/// Single-cycle modular phase accumulator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseAccumulator {
    /// Phase register (low `W` bits used)
    phase: u32,
    /// Register width
    width: AccumulatorWidth,
}

impl PhaseAccumulator {
    /// Create an accumulator at phase zero
    #[must_use]
    pub const fn new(width: AccumulatorWidth) -> Self {
        Self { phase: 0, width }
    }

    /// Create an accumulator at an arbitrary starting phase
    #[must_use]
    pub const fn with_phase(width: AccumulatorWidth, phase: u32) -> Self {
        Self {
            phase: phase & width.mask(),
            width,
        }
    }

    /// `(phase + word) mod 2^W`
    #[must_use]
    pub const fn advance(phase: u32, word: u32, width: AccumulatorWidth) -> u32 {
        phase.wrapping_add(word) & width.mask()
    }
}

impl Accumulator for PhaseAccumulator {
    #[inline]
    fn clock(&mut self, word: FrequencyWord) -> bool {
        self.phase = Self::advance(self.phase, word.value(), self.width);
        self.output()
    }

    fn phase(&self) -> u32 {
        self.phase
    }

    fn width(&self) -> AccumulatorWidth {
        self.width
    }

    fn reset(&mut self) {
        self.phase = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps() {
        let w = AccumulatorWidth::NARROW;
        assert_eq!(PhaseAccumulator::advance(0x1FFF, 1, w), 0);
        assert_eq!(PhaseAccumulator::advance(0x1FFF, 0x1FFF, w), 0x1FFE);
        assert_eq!(
            PhaseAccumulator::advance(u32::MAX, 2, AccumulatorWidth::WIDE),
            1
        );
    }

    #[test]
    fn output_is_msb() {
        let w = AccumulatorWidth::from_bits(4).unwrap();
        let mut acc = PhaseAccumulator::new(w);
        let out: [bool; 16] = core::array::from_fn(|_| acc.clock(FrequencyWord::ONE));
        // phases 1..=15 then 0: MSB set for 8..=15
        for (i, &bit) in out.iter().enumerate() {
            let phase = (i + 1) % 16;
            assert_eq!(bit, phase >= 8, "phase {phase}");
        }
    }

    #[test]
    fn with_phase_masks() {
        let acc = PhaseAccumulator::with_phase(AccumulatorWidth::NARROW, 0xFFFF);
        assert_eq!(acc.phase(), 0x1FFF);
        assert!(acc.output());
    }

    #[test]
    fn reset_clears() {
        let mut acc = PhaseAccumulator::with_phase(AccumulatorWidth::NARROW, 0x1234);
        acc.reset();
        assert_eq!(acc.phase(), 0);
        assert!(!acc.output());
    }
}
