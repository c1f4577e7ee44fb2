//! Beacon configuration and derived frequency plan
//!
//! Compile-time defaults live here as constants. A [`BeaconConfig`] gathers
//! the build-time parameters and [`BeaconConfig::validate`] turns them into
//! a [`FrequencyPlan`]: the three frequency-control words, message timing and
//! pitch source. Every failure mode of the beacon is a configuration mistake
//! and is reported here; nothing downstream can fail.

use fixed::types::U32F32;

use crate::types::{AccumulatorWidth, ConfigError, FrequencyWord};

/// Nominal synthesis (fast) clock, 300 MHz
pub const FAST_CLOCK_HZ: u32 = 300_000_000;

/// Control (slow) clock driving message timing, 100 kHz
pub const SLOW_CLOCK_HZ: u32 = 100_000;

/// Default carrier, inside the FM broadcast band
pub const CARRIER_HZ: u32 = 91_000_000;

/// Default FSK deviation for the wide accumulator
pub const DEVIATION_HZ: u32 = 5_000;

/// Minimum fast/slow clock ratio for a safe domain crossing
pub const MIN_CLOCK_RATIO: u32 = 1_000;

/// Default sending speed
pub const DEFAULT_WPM: u8 = 12;

/// Control counter bit used as the audio pitch source
///
/// At 100 kHz, bit 6 toggles every 64 ticks: a 781 Hz tone.
pub const PITCH_BIT: u8 = 6;

/// Standard PARIS timing: one unit lasts 1200 ms at 1 WPM
pub const MS_PER_UNIT_AT_1WPM: u32 = 1200;

/// Text transmitted by the compiled-in message ROM
pub const BEACON_TEXT: &str = "VVV DE DDS BEACON";

/// Low bit pattern forced onto CENTER by [`CenterNormalization::LowNibble`]
const LOW_NIBBLE_PATTERN: u32 = 0b1001;

/// How far HIGH and LOW sit from CENTER
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deviation {
    /// Fixed offset in accumulator units
    Units(u32),
    /// Offset derived from a bandwidth in Hz
    Hertz(u32),
}

/// Optional adjustment of the CENTER word after rounding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CenterNormalization {
    /// Use the rounded word unchanged
    #[default]
    None,
    /// Force the low nibble to `1001` so that CENTER±1 differ from CENTER
    /// only in the bottom two bits (narrow bit-sliced variant)
    LowNibble,
}

/// Message pacing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitTiming {
    /// Derive the unit length from a sending speed
    Wpm(u8),
    /// Explicit unit length in control-clock ticks
    Ticks(u32),
}

/// Word selection mode, fixed for the life of the beacon
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectorMode {
    /// FSK transmission
    #[default]
    Normal,
    /// Constant word `1`: the accumulator becomes a plain counter
    Calibration,
}

/// Build-time beacon parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeaconConfig {
    /// Synthesis clock rate
    pub fast_clock_hz: u32,
    /// Control clock rate
    pub slow_clock_hz: u32,
    /// Carrier (CENTER) frequency
    pub carrier_hz: u32,
    /// Accumulator width in bits
    pub width_bits: u8,
    /// FSK deviation
    pub deviation: Deviation,
    /// CENTER post-processing
    pub normalization: CenterNormalization,
    /// Calibration mode instead of transmission
    pub calibration_mode: bool,
    /// Morse unit length
    pub timing: UnitTiming,
    /// Control counter bit used as pitch source
    pub pitch_bit: u8,
}

impl BeaconConfig {
    /// Full-precision 32-bit beacon with Hz deviation
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fast_clock_hz: FAST_CLOCK_HZ,
            slow_clock_hz: SLOW_CLOCK_HZ,
            carrier_hz: CARRIER_HZ,
            width_bits: AccumulatorWidth::WIDE.bits(),
            deviation: Deviation::Hertz(DEVIATION_HZ),
            normalization: CenterNormalization::None,
            calibration_mode: false,
            timing: UnitTiming::Wpm(DEFAULT_WPM),
            pitch_bit: PITCH_BIT,
        }
    }

    /// Narrow 13-bit beacon with ±1 unit deviation and low-nibble CENTER
    #[must_use]
    pub const fn compact() -> Self {
        Self {
            width_bits: AccumulatorWidth::NARROW.bits(),
            deviation: Deviation::Units(1),
            normalization: CenterNormalization::LowNibble,
            ..Self::new()
        }
    }

    /// Set the synthesis clock
    #[must_use]
    pub const fn with_fast_clock_hz(mut self, hz: u32) -> Self {
        self.fast_clock_hz = hz;
        self
    }

    /// Set the control clock
    #[must_use]
    pub const fn with_slow_clock_hz(mut self, hz: u32) -> Self {
        self.slow_clock_hz = hz;
        self
    }

    /// Set the carrier
    #[must_use]
    pub const fn with_carrier_hz(mut self, hz: u32) -> Self {
        self.carrier_hz = hz;
        self
    }

    /// Set the accumulator width
    #[must_use]
    pub const fn with_width_bits(mut self, bits: u8) -> Self {
        self.width_bits = bits;
        self
    }

    /// Set the deviation
    #[must_use]
    pub const fn with_deviation(mut self, deviation: Deviation) -> Self {
        self.deviation = deviation;
        self
    }

    /// Set the CENTER normalization
    #[must_use]
    pub const fn with_normalization(mut self, normalization: CenterNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Enable or disable calibration mode
    #[must_use]
    pub const fn with_calibration_mode(mut self, enabled: bool) -> Self {
        self.calibration_mode = enabled;
        self
    }

    /// Set the message pacing
    #[must_use]
    pub const fn with_timing(mut self, timing: UnitTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Set the pitch source bit
    #[must_use]
    pub const fn with_pitch_bit(mut self, bit: u8) -> Self {
        self.pitch_bit = bit;
        self
    }

    /// Validate the configuration and derive the frequency plan
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: zero clocks, bad width,
    /// insufficient clock ratio, words that round to zero or overflow,
    /// degenerate deviation, zero unit length or an invalid pitch bit.
    pub fn validate(&self) -> Result<FrequencyPlan, ConfigError> {
        if self.fast_clock_hz == 0 || self.slow_clock_hz == 0 {
            return Err(ConfigError::ZeroClock);
        }

        let width = AccumulatorWidth::from_bits(self.width_bits)
            .ok_or(ConfigError::InvalidWidth(self.width_bits))?;

        let ratio = self.fast_clock_hz / self.slow_clock_hz;
        if ratio < MIN_CLOCK_RATIO {
            warn!("clock ratio {=u32} too low", ratio);
            return Err(ConfigError::ClockRatioTooLow {
                ratio,
                minimum: MIN_CLOCK_RATIO,
            });
        }

        let rounded = frequency_word(self.carrier_hz, self.fast_clock_hz, width)?;
        let center = normalize(rounded, self.normalization, width)?;

        let delta = match self.deviation {
            Deviation::Units(units) => units,
            Deviation::Hertz(hz) => {
                let word = round_word(hz, self.fast_clock_hz, width);
                u32::try_from(word).map_err(|_| ConfigError::WordOverflow {
                    word,
                    bits: width.bits(),
                })?
            }
        };
        if delta == 0 {
            return Err(ConfigError::DegenerateDeviation);
        }

        let low = center
            .value()
            .checked_sub(delta)
            .filter(|&low| low > 0)
            .ok_or(ConfigError::LowWordUnderflow {
                center: center.value(),
                delta,
            })?;
        let high = u64::from(center.value()) + u64::from(delta);
        if high > u64::from(width.mask()) {
            return Err(ConfigError::WordOverflow {
                word: high,
                bits: width.bits(),
            });
        }

        let unit_ticks = match self.timing {
            UnitTiming::Ticks(ticks) => ticks,
            UnitTiming::Wpm(0) => 0,
            UnitTiming::Wpm(wpm) => {
                let ticks = u64::from(self.slow_clock_hz) * u64::from(MS_PER_UNIT_AT_1WPM)
                    / (1000 * u64::from(wpm));
                u32::try_from(ticks).unwrap_or(u32::MAX)
            }
        };
        if unit_ticks == 0 {
            return Err(ConfigError::ZeroUnitLength);
        }

        if self.pitch_bit >= 32 {
            return Err(ConfigError::InvalidPitchBit(self.pitch_bit));
        }

        let plan = FrequencyPlan {
            width,
            fast_clock_hz: self.fast_clock_hz,
            slow_clock_hz: self.slow_clock_hz,
            center,
            high: FrequencyWord::new(high as u32),
            low: FrequencyWord::new(low),
            mode: if self.calibration_mode {
                SelectorMode::Calibration
            } else {
                SelectorMode::Normal
            },
            unit_ticks,
            pitch_bit: self.pitch_bit,
        };

        info!(
            "plan: W={=u8} center={=u32} high={=u32} low={=u32} unit={=u32} ticks",
            width.bits(),
            plan.center.value(),
            plan.high.value(),
            plan.low.value(),
            unit_ticks,
        );

        Ok(plan)
    }
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated configuration: everything the two clock domains need
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrequencyPlan {
    width: AccumulatorWidth,
    fast_clock_hz: u32,
    slow_clock_hz: u32,
    center: FrequencyWord,
    high: FrequencyWord,
    low: FrequencyWord,
    mode: SelectorMode,
    unit_ticks: u32,
    pitch_bit: u8,
}

impl FrequencyPlan {
    /// Accumulator width
    #[must_use]
    pub const fn width(&self) -> AccumulatorWidth {
        self.width
    }

    /// Synthesis clock rate
    #[must_use]
    pub const fn fast_clock_hz(&self) -> u32 {
        self.fast_clock_hz
    }

    /// Control clock rate
    #[must_use]
    pub const fn slow_clock_hz(&self) -> u32 {
        self.slow_clock_hz
    }

    /// Carrier word
    #[must_use]
    pub const fn center(&self) -> FrequencyWord {
        self.center
    }

    /// Upper tone word
    #[must_use]
    pub const fn high(&self) -> FrequencyWord {
        self.high
    }

    /// Lower tone word
    #[must_use]
    pub const fn low(&self) -> FrequencyWord {
        self.low
    }

    /// Word selection mode
    #[must_use]
    pub const fn mode(&self) -> SelectorMode {
        self.mode
    }

    /// Morse unit length in control ticks
    #[must_use]
    pub const fn unit_ticks(&self) -> u32 {
        self.unit_ticks
    }

    /// Control counter bit used as pitch source
    #[must_use]
    pub const fn pitch_bit(&self) -> u8 {
        self.pitch_bit
    }

    /// Fast clock cycles per control tick (integer part)
    #[must_use]
    pub const fn clock_ratio(&self) -> u32 {
        self.fast_clock_hz / self.slow_clock_hz
    }

    /// Output frequency synthesized by `word`: `f_fast * word / 2^W`
    #[must_use]
    pub fn output_hz(&self, word: FrequencyWord) -> U32F32 {
        let scaled = (u128::from(word.value()) * u128::from(self.fast_clock_hz)) << 32;
        U32F32::from_bits((scaled >> self.width.bits()) as u64)
    }

    /// Frequency step of one accumulator unit
    #[must_use]
    pub fn resolution_hz(&self) -> U32F32 {
        self.output_hz(FrequencyWord::ONE)
    }

    /// Distance between CENTER and HIGH in Hz
    #[must_use]
    pub fn shift_hz(&self) -> U32F32 {
        self.output_hz(self.high) - self.output_hz(self.center)
    }

    /// Audio pitch heard on a receiver tuned to CENTER
    #[must_use]
    pub fn pitch_hz(&self) -> U32F32 {
        let slow = u64::from(self.slow_clock_hz) << 32;
        U32F32::from_bits(slow >> (u32::from(self.pitch_bit) + 1))
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for FrequencyPlan {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Plan({}, C={} H={} L={})",
            self.width,
            self.center,
            self.high,
            self.low
        );
    }
}

/// `round(2^W * hz / clock_hz)` without floating point
fn round_word(hz: u32, clock_hz: u32, width: AccumulatorWidth) -> u64 {
    let numerator = (u128::from(hz) << width.bits()) + u128::from(clock_hz / 2);
    (numerator / u128::from(clock_hz)) as u64
}

/// Derive a frequency-control word for `hz` at `clock_hz`
///
/// # Errors
///
/// [`ConfigError::WordUnderflow`] if the word rounds to zero,
/// [`ConfigError::WordOverflow`] if it needs more than `W` bits.
pub fn frequency_word(
    hz: u32,
    clock_hz: u32,
    width: AccumulatorWidth,
) -> Result<FrequencyWord, ConfigError> {
    if clock_hz == 0 {
        return Err(ConfigError::ZeroClock);
    }
    let word = round_word(hz, clock_hz, width);
    if word == 0 {
        return Err(ConfigError::WordUnderflow { hz });
    }
    if word > u64::from(width.mask()) {
        return Err(ConfigError::WordOverflow {
            word,
            bits: width.bits(),
        });
    }
    Ok(FrequencyWord::new(word as u32))
}

fn normalize(
    word: FrequencyWord,
    normalization: CenterNormalization,
    width: AccumulatorWidth,
) -> Result<FrequencyWord, ConfigError> {
    match normalization {
        CenterNormalization::None => Ok(word),
        CenterNormalization::LowNibble => {
            let raw = (word.value() & !0xF) | LOW_NIBBLE_PATTERN;
            FrequencyWord::checked(raw, width).ok_or(ConfigError::WordOverflow {
                word: u64::from(raw),
                bits: width.bits(),
            })
        }
    }
}
