//! Threaded Runtime
//!
//! Runs the two clock domains on separate OS threads, the way they run as
//! separate clock trees in hardware.
//!
//! [`ThreadedBeacon::run`] is free-running. Each thread paces itself from
//! its own wall clock at its configured rate, and the only thing they share
//! is the [`SignalMailbox`]. The control thread publishes the sequencer
//! outputs on every slow tick. The synthesis thread reads whatever value the
//! slot holds on every fast cycle and never waits for the control thread.
//! When it falls behind its own clock it catches up without pacing.
//!
//! [`ThreadedBeacon::run_lockstep`] is a deterministic co-simulation. The
//! control thread waits on a shared fast-cycle counter for each tick
//! deadline and the synthesis thread waits for every tick due at its cycle.
//! Both follow the same rate accumulator as [`Beacon`](crate::beacon::Beacon),
//! so a lockstep run is cycle-exact with a cooperative one.

use std::hint;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{FrequencyPlan, SelectorMode};
use crate::dds::{
    Accumulator, ClockDomainBridge, FrequencySelector, PhaseAccumulator, ToggleMeter,
};
use crate::message::{MessageRom, MessageSequencer};
use crate::types::{ConfigError, ControlSignals};

/// Spins before yielding the thread while waiting
const SPIN_LIMIT: u32 = 64;

/// Fast cycles run between pacing checks
const PACE_BATCH: u64 = 256;

/// Longest single sleep while pacing, bounds stop latency
const MAX_NAP: Duration = Duration::from_millis(1);

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Single-slot mailbox carrying control signals across threads
///
/// Bits 0..8 hold [`ControlSignals::to_bits`], the rest the tick sequence.
#[derive(Debug, Default)]
pub struct SignalMailbox {
    slot: AtomicU64,
}

impl SignalMailbox {
    /// Create a mailbox holding idle signals at tick 0
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: AtomicU64::new(0),
        }
    }

    /// Publish the signals registered on slow tick `tick`
    pub fn publish(&self, tick: u64, signals: ControlSignals) {
        let packed = (tick << 8) | u64::from(signals.to_bits());
        self.slot.store(packed, Ordering::Release);
    }

    /// Latest tick number and its signals
    #[must_use]
    pub fn load(&self) -> (u64, ControlSignals) {
        let packed = self.slot.load(Ordering::Acquire);
        (packed >> 8, ControlSignals::from_bits(packed as u8))
    }
}

/// Totals gathered by a threaded run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Fast cycles executed
    pub fast_cycles: u64,
    /// Slow ticks executed
    pub slow_ticks: u64,
    /// Cycles that fed CENTER
    pub center_cycles: u64,
    /// Cycles that fed HIGH
    pub high_cycles: u64,
    /// Cycles that fed LOW
    pub low_cycles: u64,
    /// Cycles that fed the calibration word
    pub calibration_cycles: u64,
    /// Rising edges of the output bit
    pub rising_edges: u64,
    /// Playback (re)starts
    pub restarts: u64,
    /// Accumulator phase after the last cycle
    pub final_phase: u32,
}

/// Synthesis-domain state shared by both run modes
struct SynthesisDomain<'p> {
    plan: &'p FrequencyPlan,
    bridge: ClockDomainBridge,
    selector: FrequencySelector,
    accumulator: PhaseAccumulator,
    meter: ToggleMeter,
    report: RunReport,
}

impl<'p> SynthesisDomain<'p> {
    fn new(plan: &'p FrequencyPlan) -> Self {
        Self {
            plan,
            bridge: ClockDomainBridge::new(),
            selector: FrequencySelector::new(plan),
            accumulator: PhaseAccumulator::new(plan.width()),
            meter: ToggleMeter::new(),
            report: RunReport::default(),
        }
    }

    /// One fast edge fed by the raw mailbox value
    fn clock(&mut self, raw: ControlSignals) {
        let word = self.selector.select(self.bridge.clock(raw));
        let report = &mut self.report;
        match self.selector.mode() {
            SelectorMode::Calibration => report.calibration_cycles += 1,
            SelectorMode::Normal if word == self.plan.high() => report.high_cycles += 1,
            SelectorMode::Normal if word == self.plan.low() => report.low_cycles += 1,
            SelectorMode::Normal => report.center_cycles += 1,
        }
        self.meter.sample(self.accumulator.clock(word));
    }

    fn finish(self, cycles: u64) -> RunReport {
        RunReport {
            fast_cycles: cycles,
            rising_edges: self.meter.rising_edges(),
            final_phase: self.accumulator.phase(),
            ..self.report
        }
    }
}

/// Paces one domain against its own wall clock
#[derive(Clone, Copy, Debug)]
struct Pacer {
    start: Instant,
    rate_hz: u32,
}

impl Pacer {
    fn new(rate_hz: u32) -> Self {
        Self {
            start: Instant::now(),
            rate_hz,
        }
    }

    /// Wall-clock offset of edge `n` from the start
    fn offset(&self, n: u64) -> Duration {
        let nanos = u128::from(n) * NANOS_PER_SEC / u128::from(self.rate_hz);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Sleep until edge `n` is due; false if `stop` was raised first
    fn wait_for(&self, n: u64, stop: &AtomicBool) -> bool {
        let deadline = self.start.checked_add(self.offset(n));
        loop {
            if stop.load(Ordering::Acquire) {
                return false;
            }
            let now = Instant::now();
            match deadline {
                Some(deadline) if now >= deadline => return true,
                Some(deadline) => thread::sleep((deadline - now).min(MAX_NAP)),
                None => thread::sleep(MAX_NAP),
            }
        }
    }
}

/// Raises the stop flag when the synthesis thread exits, even on panic
struct StopOnDrop<'s>(&'s AtomicBool);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Beacon running its control and synthesis domains on two threads
#[derive(Clone, Debug)]
pub struct ThreadedBeacon<'a> {
    plan: FrequencyPlan,
    sequencer: MessageSequencer<'a>,
}

impl<'a> ThreadedBeacon<'a> {
    /// Create a runner
    ///
    /// # Errors
    ///
    /// Any [`MessageSequencer::new`] error for `rom`.
    pub fn new(plan: &FrequencyPlan, rom: MessageRom<'a>) -> Result<Self, ConfigError> {
        let sequencer = MessageSequencer::new(rom, plan.unit_ticks(), plan.pitch_bit())?;
        Ok(Self {
            plan: *plan,
            sequencer,
        })
    }

    /// Set the message enable input for subsequent runs
    #[must_use]
    pub fn with_enable(mut self, enable: bool) -> Self {
        self.sequencer.set_enable(enable);
        self
    }

    /// Run `cycles` fast cycles from power-up with free-running domains
    ///
    /// Tick counts and word usage depend on thread scheduling. Only the
    /// set of words fed and the fast-cycle total are fixed.
    ///
    /// # Panics
    ///
    /// Panics if either domain thread panics.
    #[must_use]
    pub fn run(&self, cycles: u64) -> RunReport {
        let mailbox = SignalMailbox::new();
        let stop = AtomicBool::new(false);

        info!("free-running threaded run: {=u64} cycles", cycles);

        let ((slow_ticks, restarts), report) = thread::scope(|s| {
            let control = s.spawn(|| self.control_task(&mailbox, &stop));
            let synthesis = s.spawn(|| {
                let _stop = StopOnDrop(&stop);
                self.synthesis_task(&mailbox, &stop, cycles)
            });
            (
                control.join().unwrap_or_else(|e| panic::resume_unwind(e)),
                synthesis.join().unwrap_or_else(|e| panic::resume_unwind(e)),
            )
        });

        RunReport {
            slow_ticks,
            restarts,
            ..report
        }
    }

    /// Control thread: tick on its own clock until stopped
    fn control_task(&self, mailbox: &SignalMailbox, stop: &AtomicBool) -> (u64, u64) {
        let mut sequencer = self.sequencer.clone();
        let pacer = Pacer::new(self.plan.slow_clock_hz());
        let mut ticks = 0;
        let mut restarts = 0;

        while pacer.wait_for(ticks + 1, stop) {
            ticks += 1;
            let signals = sequencer.tick();
            if sequencer.restarted() {
                restarts += 1;
            }
            mailbox.publish(ticks, signals);
        }

        debug!("control thread stopped after {=u64} ticks", ticks);
        (ticks, restarts)
    }

    /// Synthesis thread: sample the mailbox once per fast cycle
    fn synthesis_task(&self, mailbox: &SignalMailbox, stop: &AtomicBool, cycles: u64) -> RunReport {
        let pacer = Pacer::new(self.plan.fast_clock_hz());
        let mut domain = SynthesisDomain::new(&self.plan);

        for cycle in 0..cycles {
            if cycle % PACE_BATCH == 0 {
                pacer.wait_for(cycle, stop);
            }
            let (_, raw) = mailbox.load();
            domain.clock(raw);
        }

        domain.finish(cycles)
    }

    /// Slow ticks due within the first `cycles` fast cycles
    fn ticks_due(&self, cycles: u64) -> u64 {
        let scaled = u128::from(cycles) * u128::from(self.plan.slow_clock_hz());
        (scaled / u128::from(self.plan.fast_clock_hz())) as u64
    }

    /// Run `cycles` fast cycles from power-up as a lockstep co-simulation
    ///
    /// The result is cycle-exact with a cooperative
    /// [`Beacon`](crate::beacon::Beacon) driven for the same cycles.
    ///
    /// # Panics
    ///
    /// Panics if either domain thread panics.
    #[must_use]
    pub fn run_lockstep(&self, cycles: u64) -> RunReport {
        let mailbox = SignalMailbox::new();
        let clock = AtomicU64::new(0);
        let total_ticks = self.ticks_due(cycles);

        info!("lockstep threaded run: {=u64} cycles, {=u64} ticks", cycles, total_ticks);

        let (restarts, report) = thread::scope(|s| {
            let control = s.spawn(|| self.lockstep_control(&mailbox, &clock, total_ticks));
            let synthesis = s.spawn(|| self.lockstep_synthesis(&mailbox, &clock, cycles));
            (
                control.join().unwrap_or_else(|e| panic::resume_unwind(e)),
                synthesis.join().unwrap_or_else(|e| panic::resume_unwind(e)),
            )
        });

        RunReport {
            slow_ticks: total_ticks,
            restarts,
            ..report
        }
    }

    /// Control thread: tick the sequencer at each deadline, return restarts
    fn lockstep_control(&self, mailbox: &SignalMailbox, clock: &AtomicU64, total_ticks: u64) -> u64 {
        let mut sequencer = self.sequencer.clone();
        let fast = u128::from(self.plan.fast_clock_hz());
        let slow = u128::from(self.plan.slow_clock_hz());
        let mut restarts = 0;

        for tick in 1..=total_ticks {
            // tick k is due on the cycle where cycles_done * slow first reaches k * fast
            let deadline = ((u128::from(tick) * fast).div_ceil(slow) - 1) as u64;
            wait_until(|| clock.load(Ordering::Acquire) >= deadline);

            let signals = sequencer.tick();
            if sequencer.restarted() {
                restarts += 1;
            }
            mailbox.publish(tick, signals);
        }

        restarts
    }

    /// Synthesis thread: wait for due ticks, then bridge, select and accumulate
    fn lockstep_synthesis(&self, mailbox: &SignalMailbox, clock: &AtomicU64, cycles: u64) -> RunReport {
        let mut domain = SynthesisDomain::new(&self.plan);

        for cycle in 0..cycles {
            clock.store(cycle, Ordering::Release);

            let due = self.ticks_due(cycle + 1);
            wait_until(|| mailbox.load().0 >= due);
            let (_, raw) = mailbox.load();
            domain.clock(raw);
        }
        clock.store(cycles, Ordering::Release);

        domain.finish(cycles)
    }
}

/// Busy-wait with backoff until `ready` holds
fn wait_until(ready: impl Fn() -> bool) {
    let mut spins = 0;
    while !ready() {
        if spins < SPIN_LIMIT {
            hint::spin_loop();
            spins += 1;
        } else {
            thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailbox_round_trip() {
        let mailbox = SignalMailbox::new();
        assert_eq!(mailbox.load(), (0, ControlSignals::IDLE));
        mailbox.publish(12_345, ControlSignals::new(true, false));
        assert_eq!(mailbox.load(), (12_345, ControlSignals::new(true, false)));
    }

    #[test]
    fn pacer_offsets() {
        let pacer = Pacer::new(1_000);
        assert_eq!(pacer.offset(0), Duration::ZERO);
        assert_eq!(pacer.offset(3), Duration::from_millis(3));
    }

    #[test]
    fn pacer_stops_on_flag() {
        let pacer = Pacer::new(1);
        let stop = AtomicBool::new(false);
        assert!(pacer.wait_for(0, &stop));
        stop.store(true, Ordering::Release);
        // edge 3600 is an hour away
        assert!(!pacer.wait_for(3_600, &stop));
    }

    #[test]
    fn stop_guard_raises_flag() {
        let stop = AtomicBool::new(false);
        drop(StopOnDrop(&stop));
        assert!(stop.load(Ordering::Acquire));
    }
}
