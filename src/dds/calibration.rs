//! Clock Calibration
//!
//! The synthesized frequency is only as accurate as the fast clock. Two
//! instruments recover the real rate against the slow reference:
//!
//! - [`CalibrationCounter`]: a free-running `W`-bit counter of fast edges.
//!   Its top bit goes high after exactly `2^(W-1)` cycles. Timing that
//!   pulse in slow ticks gives `f_fast = 2^(W-1) * f_slow / ticks`.
//! - [`ToggleMeter`]: counts rising edges of a bit stream over a window and
//!   converts them to Hz.

use fixed::types::U32F32;
// F32Ext provides round for no_std; in std it is built-in
#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use crate::types::AccumulatorWidth;

/// Free-running fast-edge counter with a half-range pulse
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationCounter {
    /// Counter register (low `W` bits used)
    count: u32,
    /// Total edges seen since reset
    cycles: u64,
    /// Counter width
    width: AccumulatorWidth,
}

impl CalibrationCounter {
    /// Create a counter at zero
    #[must_use]
    pub const fn new(width: AccumulatorWidth) -> Self {
        Self {
            count: 0,
            cycles: 0,
            width,
        }
    }

    /// One fast edge; returns the pulse (top counter bit)
    pub fn clock(&mut self) -> bool {
        self.count = self.count.wrapping_add(1) & self.width.mask();
        self.cycles += 1;
        self.pulse()
    }

    /// Top counter bit
    #[must_use]
    pub const fn pulse(&self) -> bool {
        self.count & self.width.msb_mask() != 0
    }

    /// Counter register
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Edges counted since reset, without wraparound
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Fast edges from reset to the first rising pulse
    #[must_use]
    pub const fn half_range(&self) -> u64 {
        1u64 << (self.width.bits() - 1)
    }

    /// Measurement of the cycles counted so far over `slow_ticks`
    #[must_use]
    pub fn measure(&self, slow_ticks: u64, slow_clock_hz: u32) -> Option<ClockMeasurement> {
        ClockMeasurement::new(self.cycles, slow_ticks, slow_clock_hz)
    }

    /// Measurement from the slow ticks an operator timed until the first pulse
    #[must_use]
    pub fn measure_half_range(
        &self,
        slow_ticks: u64,
        slow_clock_hz: u32,
    ) -> Option<ClockMeasurement> {
        ClockMeasurement::new(self.half_range(), slow_ticks, slow_clock_hz)
    }

    /// Clear the counter
    pub fn reset(&mut self) {
        self.count = 0;
        self.cycles = 0;
    }
}

/// Fast cycles counted against a slow-clock interval
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockMeasurement {
    /// Fast edges counted
    pub fast_cycles: u64,
    /// Length of the interval in slow ticks
    pub slow_ticks: u64,
    /// Slow reference rate
    pub slow_clock_hz: u32,
}

impl ClockMeasurement {
    /// Create a measurement, returns None for an empty interval or reference
    #[must_use]
    pub fn new(fast_cycles: u64, slow_ticks: u64, slow_clock_hz: u32) -> Option<Self> {
        if slow_ticks == 0 || slow_clock_hz == 0 {
            return None;
        }
        let m = Self {
            fast_cycles,
            slow_ticks,
            slow_clock_hz,
        };
        info!(
            "calibration: {=u64} fast cycles in {=u64} slow ticks",
            fast_cycles,
            slow_ticks
        );
        Some(m)
    }

    /// Estimated fast clock rate, saturating at `U32F32::MAX`
    #[must_use]
    pub fn hz(&self) -> U32F32 {
        let scaled = (u128::from(self.fast_cycles) * u128::from(self.slow_clock_hz)) << 32;
        let bits = scaled / u128::from(self.slow_ticks);
        u64::try_from(bits).map_or(U32F32::MAX, U32F32::from_bits)
    }

    /// Deviation from `nominal_hz` in parts per million, rounded
    #[must_use]
    pub fn ppm_error(&self, nominal_hz: u32) -> f32 {
        let measured = self.hz().to_num::<f64>();
        let nominal = f64::from(nominal_hz);
        let ppm = ((measured - nominal) / nominal * 1e6) as f32;
        ppm.round()
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ClockMeasurement {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "ClockMeasurement({} cycles / {} ticks @ {} Hz)",
            self.fast_cycles,
            self.slow_ticks,
            self.slow_clock_hz
        );
    }
}

/// Rising-edge counter for a sampled bit stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ToggleMeter {
    /// Previous sample
    last: bool,
    /// Rising edges seen
    rising: u64,
    /// Samples taken
    cycles: u64,
}

impl ToggleMeter {
    /// Create an empty meter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: false,
            rising: 0,
            cycles: 0,
        }
    }

    /// Take one sample; returns true on a rising edge
    pub fn sample(&mut self, bit: bool) -> bool {
        let rising = bit && !self.last;
        self.last = bit;
        self.cycles += 1;
        if rising {
            self.rising += 1;
        }
        rising
    }

    /// Rising edges seen
    #[must_use]
    pub const fn rising_edges(&self) -> u64 {
        self.rising
    }

    /// Samples taken
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Measured frequency for samples taken at `clock_hz`
    #[must_use]
    pub fn frequency_hz(&self, clock_hz: u32) -> U32F32 {
        if self.cycles == 0 {
            return U32F32::ZERO;
        }
        let scaled = (u128::from(self.rising) * u128::from(clock_hz)) << 32;
        let bits = scaled / u128::from(self.cycles);
        u64::try_from(bits).map_or(U32F32::MAX, U32F32::from_bits)
    }

    /// Start a new window
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_at_half_range() {
        let w = AccumulatorWidth::from_bits(8).unwrap();
        let mut counter = CalibrationCounter::new(w);
        assert_eq!(counter.half_range(), 128);
        for _ in 0..127 {
            assert!(!counter.clock());
        }
        assert!(counter.clock());
        assert_eq!(counter.cycles(), 128);
    }

    #[test]
    fn counter_wraps_but_cycles_do_not() {
        let w = AccumulatorWidth::from_bits(4).unwrap();
        let mut counter = CalibrationCounter::new(w);
        for _ in 0..20 {
            counter.clock();
        }
        assert_eq!(counter.count(), 4);
        assert_eq!(counter.cycles(), 20);
    }

    #[test]
    fn half_range_estimate() {
        // 2^19 fast cycles timed as 175 ticks of a 100 kHz reference
        let counter = CalibrationCounter::new(AccumulatorWidth::from_bits(20).unwrap());
        let m = counter.measure_half_range(175, 100_000).unwrap();
        let hz = m.hz().to_num::<u32>();
        assert_eq!(hz, 299_593_142);
    }

    #[test]
    fn ppm_error_sign() {
        let fast = ClockMeasurement::new(300_003_000, 100_000, 100_000).unwrap();
        assert_eq!(fast.ppm_error(300_000_000), 10.0);
        let slow = ClockMeasurement::new(299_997_000, 100_000, 100_000).unwrap();
        assert_eq!(slow.ppm_error(300_000_000), -10.0);
    }

    #[test]
    fn empty_interval_rejected() {
        assert!(ClockMeasurement::new(1, 0, 100_000).is_none());
        assert!(ClockMeasurement::new(1, 1, 0).is_none());
    }

    #[test]
    fn toggle_meter_counts_rising_edges() {
        let mut meter = ToggleMeter::new();
        for bit in [false, true, true, false, true, false, false, true] {
            meter.sample(bit);
        }
        assert_eq!(meter.rising_edges(), 3);
        assert_eq!(meter.cycles(), 8);
        assert_eq!(meter.frequency_hz(800).to_num::<u32>(), 300);
    }

    #[test]
    fn toggle_meter_empty_window() {
        assert_eq!(ToggleMeter::new().frequency_hz(1_000), U32F32::ZERO);
    }
}
