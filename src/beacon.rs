//! Beacon Top Level
//!
//! Wires both clock domains together and drives them from fast-clock steps.
//!
//! ```text
//!  ┌──────────── slow domain ────────────┐   ┌──────────── fast domain ─────────────┐
//!  │ MessageRom ─▶ MessageSequencer ─────┼──▶│ ClockDomainBridge ─▶ FrequencySelector │
//!  │               (tone, pitch, restart)│   │        ─▶ Accumulator ─▶ rf           │
//!  └─────────────────────────────────────┘   │ CalibrationCounter ─▶ cal pulse       │
//!                                            └───────────────────────────────────────┘
//! ```
//!
//! Each [`Beacon::step`] is one fast clock edge. The slow domain is ticked
//! whenever a fractional rate accumulator crosses the fast clock rate, so
//! over any run the number of slow ticks is exactly
//! `floor(fast_cycles * f_slow / f_fast)`.

use heapless::Deque;

use crate::config::{BeaconConfig, FrequencyPlan};
use crate::dds::{
    Accumulator, CalibrationCounter, ClockDomainBridge, FrequencySelector, PhaseAccumulator,
    ToggleMeter,
};
use crate::message::{MessageRom, MessageSequencer, BEACON};
use crate::types::{ConfigError, ControlSignals, FrequencyWord};

/// Capacity of the diagnostic event queue
pub const EVENT_CAPACITY: usize = 32;

/// What happened in the control domain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Playback started at position 0
    Restarted,
    /// Key down
    ToneOn,
    /// Key up
    ToneOff,
    /// Sequencer parked in Idle
    Stopped,
}

/// Control-domain event stamped with the fast cycle it occurred on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeaconEvent {
    /// Event type
    pub kind: EventKind,
    /// Fast cycle (zero based) of the slow tick that produced it
    pub cycle: u64,
}

#[cfg(feature = "embedded")]
impl defmt::Format for BeaconEvent {
    fn format(&self, f: defmt::Formatter) {
        let kind = match self.kind {
            EventKind::Restarted => "restart",
            EventKind::ToneOn => "tone on",
            EventKind::ToneOff => "tone off",
            EventKind::Stopped => "stopped",
        };
        defmt::write!(f, "{=str}@{=u64}", kind, self.cycle);
    }
}

/// Diagnostic outputs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Sequencer is playing
    pub message_active: bool,
    /// High for the slow tick on which playback (re)started
    pub restart: bool,
    /// Top bit of the calibration counter
    pub calibration_pulse: bool,
}

/// Result of one fast clock edge
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BeaconOutput {
    /// Accumulator MSB
    pub rf: bool,
    /// Diagnostic outputs
    pub diagnostics: Diagnostics,
}

/// Complete beacon: control domain, bridge and synthesis domain
#[derive(Debug)]
pub struct Beacon<'a, A: Accumulator = PhaseAccumulator> {
    plan: FrequencyPlan,
    sequencer: MessageSequencer<'a>,
    bridge: ClockDomainBridge,
    selector: FrequencySelector,
    accumulator: A,
    calibration: CalibrationCounter,
    /// Fractional slow-tick accumulator, in units of `f_slow`
    rate: u64,
    /// Slow-domain outputs as last registered
    raw: ControlSignals,
    /// Word fed to the accumulator on the last step
    word: FrequencyWord,
    fast_cycles: u64,
    slow_ticks: u64,
    events: Deque<BeaconEvent, EVENT_CAPACITY>,
    dropped_events: u32,
}

impl<'a> Beacon<'a> {
    /// Create a beacon with a single-cycle accumulator
    ///
    /// # Errors
    ///
    /// Propagates [`MessageSequencer::new`] errors for the ROM.
    pub fn new(plan: &FrequencyPlan, rom: MessageRom<'a>) -> Result<Self, ConfigError> {
        Self::with_accumulator(plan, rom, PhaseAccumulator::new(plan.width()))
    }
}

impl Beacon<'static> {
    /// Validate `config` and build a beacon playing the compiled-in message
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`BeaconConfig::validate`].
    pub fn from_config(config: &BeaconConfig) -> Result<Self, ConfigError> {
        let plan = config.validate()?;
        Self::new(&plan, BEACON)
    }
}

impl<'a, A: Accumulator> Beacon<'a, A> {
    /// Create a beacon around a caller-supplied accumulator
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidWidth`] if the accumulator width differs from
    /// the plan, otherwise any [`MessageSequencer::new`] error.
    pub fn with_accumulator(
        plan: &FrequencyPlan,
        rom: MessageRom<'a>,
        accumulator: A,
    ) -> Result<Self, ConfigError> {
        if accumulator.width() != plan.width() {
            return Err(ConfigError::InvalidWidth(accumulator.width().bits()));
        }
        let sequencer = MessageSequencer::new(rom, plan.unit_ticks(), plan.pitch_bit())?;

        Ok(Self {
            plan: *plan,
            sequencer,
            bridge: ClockDomainBridge::new(),
            selector: FrequencySelector::new(plan),
            accumulator,
            calibration: CalibrationCounter::new(plan.width()),
            rate: 0,
            raw: ControlSignals::IDLE,
            word: plan.center(),
            fast_cycles: 0,
            slow_ticks: 0,
            events: Deque::new(),
            dropped_events: 0,
        })
    }

    /// One fast clock edge
    pub fn step(&mut self) -> BeaconOutput {
        self.rate += u64::from(self.plan.slow_clock_hz());
        if self.rate >= u64::from(self.plan.fast_clock_hz()) {
            self.rate -= u64::from(self.plan.fast_clock_hz());
            self.tick_slow();
        }

        let synced = self.bridge.clock(self.raw);
        self.word = self.selector.select(synced);
        let rf = self.accumulator.clock(self.word);
        let calibration_pulse = self.calibration.clock();
        self.fast_cycles += 1;

        BeaconOutput {
            rf,
            diagnostics: Diagnostics {
                message_active: self.sequencer.is_running(),
                restart: self.sequencer.restarted(),
                calibration_pulse,
            },
        }
    }

    /// One slow clock edge
    fn tick_slow(&mut self) {
        let was_running = self.sequencer.is_running();
        let previous = self.raw;
        self.raw = self.sequencer.tick();
        self.slow_ticks += 1;

        if self.sequencer.restarted() {
            self.record(EventKind::Restarted);
        }
        if self.raw.tone_active != previous.tone_active {
            self.record(if self.raw.tone_active {
                EventKind::ToneOn
            } else {
                EventKind::ToneOff
            });
        }
        if was_running && !self.sequencer.is_running() {
            self.record(EventKind::Stopped);
        }
    }

    /// Queue an event, discarding the oldest when full
    fn record(&mut self, kind: EventKind) {
        let event = BeaconEvent {
            kind,
            cycle: self.fast_cycles,
        };
        if self.events.is_full() {
            self.events.pop_front();
            self.dropped_events = self.dropped_events.saturating_add(1);
        }
        let _ = self.events.push_back(event);
    }

    /// Step `cycles` fast edges and measure the output
    pub fn run(&mut self, cycles: u64) -> ToggleMeter {
        let mut meter = ToggleMeter::new();
        for _ in 0..cycles {
            meter.sample(self.step().rf);
        }
        meter
    }

    /// Take all queued events, oldest first
    pub fn drain_events(&mut self) -> impl Iterator<Item = BeaconEvent> + use<'_, 'a, A> {
        core::iter::from_fn(move || self.events.pop_front())
    }

    /// Events discarded because the queue was full
    #[must_use]
    pub const fn dropped_events(&self) -> u32 {
        self.dropped_events
    }

    /// Set the message enable input
    pub fn set_enable(&mut self, enable: bool) {
        self.sequencer.set_enable(enable);
    }

    /// Frequency plan in use
    #[must_use]
    pub const fn plan(&self) -> &FrequencyPlan {
        &self.plan
    }

    /// Control-domain sequencer
    #[must_use]
    pub const fn sequencer(&self) -> &MessageSequencer<'a> {
        &self.sequencer
    }

    /// Synthesis accumulator
    #[must_use]
    pub const fn accumulator(&self) -> &A {
        &self.accumulator
    }

    /// Calibration counter
    #[must_use]
    pub const fn calibration(&self) -> &CalibrationCounter {
        &self.calibration
    }

    /// Slow-domain signals before synchronization
    #[must_use]
    pub const fn raw_signals(&self) -> ControlSignals {
        self.raw
    }

    /// Signals as seen by the synthesis domain
    #[must_use]
    pub const fn synced_signals(&self) -> ControlSignals {
        self.bridge.output()
    }

    /// Word used on the last step
    #[must_use]
    pub const fn word(&self) -> FrequencyWord {
        self.word
    }

    /// Fast edges since reset
    #[must_use]
    pub const fn fast_cycles(&self) -> u64 {
        self.fast_cycles
    }

    /// Slow ticks since reset
    #[must_use]
    pub const fn slow_ticks(&self) -> u64 {
        self.slow_ticks
    }

    /// Return every register to its power-up value
    pub fn reset(&mut self) {
        self.sequencer.reset();
        self.bridge.reset();
        self.accumulator.reset();
        self.calibration.reset();
        self.rate = 0;
        self.raw = ControlSignals::IDLE;
        self.word = self.plan.center();
        self.fast_cycles = 0;
        self.slow_ticks = 0;
        self.events.clear();
        self.dropped_events = 0;
        debug!("beacon reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitTiming;
    use crate::message_rom;

    fn small_plan() -> FrequencyPlan {
        BeaconConfig::compact()
            .with_fast_clock_hz(1_000_000)
            .with_slow_clock_hz(1_000)
            .with_carrier_hz(100_000)
            .with_timing(UnitTiming::Ticks(2))
            .with_pitch_bit(0)
            .validate()
            .unwrap()
    }

    #[test]
    fn slow_ticks_follow_clock_ratio() {
        let mut beacon = Beacon::new(&small_plan(), message_rom!("E")).unwrap();
        for n in 1..=5_500u64 {
            beacon.step();
            assert_eq!(beacon.slow_ticks(), n / 1_000, "cycle {n}");
        }
    }

    #[test]
    fn idle_before_first_tick_sends_center() {
        let plan = small_plan();
        let mut beacon = Beacon::new(&plan, message_rom!("E")).unwrap();
        for _ in 0..999 {
            beacon.step();
            assert_eq!(beacon.word(), plan.center());
        }
    }

    #[test]
    fn tone_reaches_selector_after_bridge_latency() {
        let plan = small_plan();
        let mut beacon = Beacon::new(&plan, message_rom!("E")).unwrap();
        for _ in 0..999 {
            beacon.step();
        }
        // cycle 999: first slow tick keys the tone, bridge samples it
        beacon.step();
        assert!(beacon.raw_signals().tone_active);
        assert_eq!(beacon.word(), plan.center());
        // cycle 1000: stable stage now holds it
        beacon.step();
        assert_ne!(beacon.word(), plan.center());
    }

    #[test]
    fn events_are_stamped_and_ordered() {
        let mut beacon = Beacon::new(&small_plan(), message_rom!("E")).unwrap();
        beacon.run(5_000);
        let events: heapless::Vec<BeaconEvent, 8> = beacon.drain_events().collect();
        assert_eq!(
            events.as_slice(),
            &[
                BeaconEvent {
                    kind: EventKind::Restarted,
                    cycle: 999
                },
                BeaconEvent {
                    kind: EventKind::ToneOn,
                    cycle: 999
                },
                BeaconEvent {
                    kind: EventKind::ToneOff,
                    cycle: 2_999
                },
            ]
        );
        assert_eq!(beacon.drain_events().count(), 0);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut beacon = Beacon::new(&small_plan(), message_rom!("E")).unwrap();
        // each 16-tick pass produces three events
        beacon.run(16_000 * 20);
        assert!(beacon.dropped_events() > 0);
        let first = beacon.drain_events().next().unwrap();
        assert!(first.cycle > 999);
    }

    #[test]
    fn disable_stops_after_pass() {
        let mut beacon = Beacon::new(&small_plan(), message_rom!("E")).unwrap();
        beacon.run(2_000);
        assert!(beacon.sequencer().is_running());
        beacon.set_enable(false);
        beacon.run(16_000);
        assert!(!beacon.sequencer().is_running());
        assert!(beacon
            .drain_events()
            .any(|e| e.kind == EventKind::Stopped));
    }

    #[test]
    fn mismatched_accumulator_width_rejected() {
        let plan = small_plan();
        let acc = PhaseAccumulator::new(crate::types::AccumulatorWidth::WIDE);
        assert_eq!(
            Beacon::with_accumulator(&plan, message_rom!("E"), acc).unwrap_err(),
            ConfigError::InvalidWidth(32)
        );
    }

    #[test]
    fn reset_restores_power_up_state() {
        let mut beacon = Beacon::new(&small_plan(), message_rom!("E")).unwrap();
        beacon.run(3_456);
        beacon.reset();
        assert_eq!(beacon.fast_cycles(), 0);
        assert_eq!(beacon.slow_ticks(), 0);
        assert_eq!(beacon.accumulator().phase(), 0);
        assert!(!beacon.sequencer().is_running());
        assert_eq!(beacon.drain_events().count(), 0);
    }
}
