//! Clock Domain Crossing
//!
//! Control signals change on the slow clock; the accumulator samples them on
//! the fast clock with no phase relationship between the two. Each crossing
//! signal therefore passes through two fast-clock latches in series:
//!
//! ```text
//!   slow domain        fast edge n         fast edge n+1
//!   ──────────▶ [meta] ──────────▶ [stable] ──────────▶ selector
//! ```
//!
//! `meta` may go metastable when it samples a transition; it has a full
//! fast cycle to settle before `stable` copies it. A change becomes visible
//! on the stable output after exactly two fast edges.
//!
//! This is safe only while the source changes far slower than the fast
//! clock. The ratio is checked once when the frequency plan is validated.

use crate::types::ControlSignals;

/// Two-flop synchronizer for one signal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Synchronizer<T> {
    /// First stage, may sample a transition
    meta: T,
    /// Second stage, the only value downstream logic reads
    stable: T,
}

impl<T: Copy> Synchronizer<T> {
    /// Create a synchronizer with both stages holding `initial`
    #[must_use]
    pub const fn new(initial: T) -> Self {
        Self {
            meta: initial,
            stable: initial,
        }
    }

    /// One fast clock edge: shift `input` into the chain, return the stable stage
    pub fn clock(&mut self, input: T) -> T {
        self.stable = self.meta;
        self.meta = input;
        self.stable
    }

    /// Value downstream logic may use
    #[must_use]
    pub const fn stable(&self) -> T {
        self.stable
    }

    /// Force both stages to `value`
    pub fn reset(&mut self, value: T) {
        self.meta = value;
        self.stable = value;
    }
}

/// Synchronizers for every signal entering the synthesis domain
#[derive(Clone, Copy, Debug, Default)]
pub struct ClockDomainBridge {
    /// Keying
    tone_active: Synchronizer<bool>,
    /// Pitch toggle
    pitch_phase: Synchronizer<bool>,
}

impl ClockDomainBridge {
    /// Fast clock edges before a control change is visible
    pub const LATENCY: u32 = 2;

    /// Create a bridge with all signals deasserted
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tone_active: Synchronizer::new(false),
            pitch_phase: Synchronizer::new(false),
        }
    }

    /// One fast clock edge, sampling the raw control-domain signals
    pub fn clock(&mut self, raw: ControlSignals) -> ControlSignals {
        ControlSignals {
            tone_active: self.tone_active.clock(raw.tone_active),
            pitch_phase: self.pitch_phase.clock(raw.pitch_phase),
        }
    }

    /// Synchronized signals
    #[must_use]
    pub const fn output(&self) -> ControlSignals {
        ControlSignals {
            tone_active: self.tone_active.stable(),
            pitch_phase: self.pitch_phase.stable(),
        }
    }

    /// Clear all stages
    pub fn reset(&mut self) {
        self.tone_active.reset(false);
        self.pitch_phase.reset(false);
    }
}
