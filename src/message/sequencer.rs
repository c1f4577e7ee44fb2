//! Message Sequencer
//!
//! Walks the message ROM one Morse unit at a time, clocked by the control
//! (slow) domain. Each call to [`MessageSequencer::tick`] is one control
//! clock edge.
//!
//! # State Machine
//!
//! ```text
//!            enable at unit boundary
//!   ┌──────┐ ───────────────────────▶ ┌─────────┐
//!   │ Idle │                          │ Playing │ ──┐ advance one unit
//!   └──────┘ ◀─────────────────────── └─────────┘ ◀─┘ per boundary
//!            end of message, enable low
//! ```
//!
//! At the end of the message the sequencer wraps to position 0 and pulses
//! `restarted` while enable is high. With enable low it finishes the pass
//! and parks in Idle, holding position 0.
//!
//! The control domain also owns the pitch source: one bit of a
//! free-running tick counter.

use crate::message::MessageRom;
use crate::types::{ConfigError, ControlSignals};

/// Playback position and run flag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SequencerState {
    /// Index into the message ROM
    pub position: usize,
    /// Playing (true) or Idle (false)
    pub running: bool,
}

#[cfg(feature = "embedded")]
impl defmt::Format for SequencerState {
    fn format(&self, f: defmt::Formatter) {
        if self.running {
            defmt::write!(f, "Playing@{}", self.position);
        } else {
            defmt::write!(f, "Idle");
        }
    }
}

/// Control-domain message player
#[derive(Clone, Debug)]
pub struct MessageSequencer<'a> {
    /// Message table
    rom: MessageRom<'a>,
    /// Playback state
    state: SequencerState,
    /// Control ticks per Morse unit
    unit_ticks: u32,
    /// Ticks left until the next unit boundary
    divider: u32,
    /// Free-running tick counter (pitch source)
    counter: u32,
    /// Counter bit used as pitch
    pitch_bit: u8,
    /// External enable input
    enable: bool,
    /// Playback (re)started on the last tick
    restarted: bool,
}

impl<'a> MessageSequencer<'a> {
    /// Create a sequencer in the Idle state
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyMessage`] if the ROM has no key-down units,
    /// [`ConfigError::ZeroUnitLength`] if `unit_ticks` is zero,
    /// [`ConfigError::InvalidPitchBit`] if `pitch_bit` is 32 or more.
    pub fn new(rom: MessageRom<'a>, unit_ticks: u32, pitch_bit: u8) -> Result<Self, ConfigError> {
        if rom.keyed_units() == 0 {
            return Err(ConfigError::EmptyMessage);
        }
        if unit_ticks == 0 {
            return Err(ConfigError::ZeroUnitLength);
        }
        if pitch_bit >= 32 {
            return Err(ConfigError::InvalidPitchBit(pitch_bit));
        }

        Ok(Self {
            rom,
            state: SequencerState::default(),
            unit_ticks,
            divider: 0,
            counter: 0,
            pitch_bit,
            enable: true,
            restarted: false,
        })
    }

    /// Set the external enable input
    pub fn set_enable(&mut self, enable: bool) {
        self.enable = enable;
    }

    /// Current enable input
    #[must_use]
    pub const fn enable(&self) -> bool {
        self.enable
    }

    /// Advance one control clock edge and return the new output signals
    pub fn tick(&mut self) -> ControlSignals {
        self.counter = self.counter.wrapping_add(1);
        self.restarted = false;

        let boundary = self.divider == 0;
        self.divider = if boundary {
            self.unit_ticks - 1
        } else {
            self.divider - 1
        };

        if boundary {
            self.advance();
        }

        self.signals()
    }

    /// Move to the next unit at a unit boundary
    fn advance(&mut self) {
        if self.state.running {
            self.state.position += 1;
            if self.state.position >= self.rom.len() {
                self.state.position = 0;
                if self.enable {
                    self.restarted = true;
                    trace!("message wrapped");
                } else {
                    self.state.running = false;
                    debug!("message finished, enable low: idle");
                }
            }
        } else if self.enable {
            self.state.running = true;
            self.state.position = 0;
            self.restarted = true;
            debug!("message started");
        }
    }

    /// Output signals for the current state
    #[must_use]
    pub fn signals(&self) -> ControlSignals {
        ControlSignals::new(self.tone_active(), self.pitch_phase())
    }

    /// Key state of the current unit (false while Idle)
    #[must_use]
    pub fn tone_active(&self) -> bool {
        self.state.running && self.rom.bit(self.state.position)
    }

    /// Pitch source bit of the free-running counter
    #[must_use]
    pub const fn pitch_phase(&self) -> bool {
        (self.counter >> self.pitch_bit) & 1 != 0
    }

    /// True exactly on the tick where playback started at position 0
    #[must_use]
    pub const fn restarted(&self) -> bool {
        self.restarted
    }

    /// Playback state
    #[must_use]
    pub const fn state(&self) -> SequencerState {
        self.state
    }

    /// Check if the sequencer is playing
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.state.running
    }

    /// Control ticks per Morse unit
    #[must_use]
    pub const fn unit_ticks(&self) -> u32 {
        self.unit_ticks
    }

    /// Ticks in one full pass of the message
    #[must_use]
    pub fn ticks_per_pass(&self) -> u64 {
        self.rom.len() as u64 * u64::from(self.unit_ticks)
    }

    /// Message table
    #[must_use]
    pub const fn rom(&self) -> &MessageRom<'a> {
        &self.rom
    }

    /// Return to power-up state (Idle, position 0, counters cleared)
    pub fn reset(&mut self) {
        self.state = SequencerState::default();
        self.divider = 0;
        self.counter = 0;
        self.restarted = false;
    }
}
