//! Pipelined Phase Accumulator
//!
//! Long carry chains limit how fast an adder can be clocked. Splitting the
//! register into slices and registering the carry between them shortens
//! the chain at the cost of latency:
//!
//! ```text
//!          word[hi]        word[mid]        word[lo]
//!             │               │                │
//!   ... ◀─[c]─┤ slice 2 ◀─[c]─┤ slice 1 ◀─[c]──┤ slice 0
//!             │               │                │
//!        phase[hi]       phase[mid]        phase[lo]
//! ```
//!
//! Each slice adds its part of the word plus the carry its lower neighbour
//! produced on the *previous* cycle. The register therefore trails a
//! single-cycle adder by the carries still in flight, but never loses one:
//!
//! ```text
//! phase + pending_carries ≡ reference_phase  (mod 2^W)
//! ```
//!
//! A word change is fully reflected after one cycle per slice boundary.

use crate::dds::accumulator::Accumulator;
use crate::types::{AccumulatorWidth, FrequencyWord};

/// Maximum number of slices
pub const MAX_SLICES: usize = 8;

/// Phase accumulator with registered inter-slice carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelinedAccumulator {
    /// Phase register
    phase: u32,
    /// Carries in flight, each at the bit offset of the slice it feeds
    carries: u32,
    /// Register width
    width: AccumulatorWidth,
    /// Slice boundaries: slice `i` covers bits `bounds[i]..bounds[i + 1]`
    bounds: [u8; MAX_SLICES + 1],
    /// Number of slices
    slices: usize,
}

impl PipelinedAccumulator {
    /// Split `width` into `slices` nearly equal slices, lowest slices widest
    ///
    /// Returns None if `slices` is zero, exceeds [`MAX_SLICES`] or the width.
    #[must_use]
    pub fn new(width: AccumulatorWidth, slices: usize) -> Option<Self> {
        let bits = usize::from(width.bits());
        if slices == 0 || slices > MAX_SLICES || slices > bits {
            return None;
        }

        let mut bounds = [0u8; MAX_SLICES + 1];
        let base = bits / slices;
        let extra = bits % slices;
        for i in 0..slices {
            let len = base + usize::from(i < extra);
            bounds[i + 1] = bounds[i] + len as u8;
        }

        Some(Self {
            phase: 0,
            carries: 0,
            width,
            bounds,
            slices,
        })
    }

    /// Number of slices
    #[must_use]
    pub const fn slices(&self) -> usize {
        self.slices
    }

    /// Width of slice `index` in bits
    #[must_use]
    pub fn slice_bits(&self, index: usize) -> Option<u8> {
        (index < self.slices).then(|| self.bounds[index + 1] - self.bounds[index])
    }

    /// Carries registered but not yet added, as a phase offset
    #[must_use]
    pub const fn pending_carries(&self) -> u32 {
        self.carries
    }

    /// Phase with all pending carries applied
    #[must_use]
    pub const fn settled_phase(&self) -> u32 {
        self.phase.wrapping_add(self.carries) & self.width.mask()
    }
}

impl Accumulator for PipelinedAccumulator {
    fn clock(&mut self, word: FrequencyWord) -> bool {
        let phase = u64::from(self.phase);
        let word = u64::from(word.value());
        let carries = u64::from(self.carries);

        let mut next_phase = 0u64;
        let mut next_carries = 0u64;

        for i in 0..self.slices {
            let lo = u32::from(self.bounds[i]);
            let hi = u32::from(self.bounds[i + 1]);
            let mask = (1u64 << (hi - lo)) - 1;

            let sum = ((phase >> lo) & mask) + ((word >> lo) & mask) + ((carries >> lo) & 1);
            next_phase |= (sum & mask) << lo;

            // carry out of the top slice is the modulo wrap
            if sum > mask && i + 1 < self.slices {
                next_carries |= 1 << hi;
            }
        }

        self.phase = next_phase as u32;
        self.carries = next_carries as u32;
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
        self.carries = 0;
    }
}
