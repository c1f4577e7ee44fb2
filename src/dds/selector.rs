//! Frequency Word Selection
//!
//! Picks the word fed to the accumulator on every fast clock cycle:
//!
//! ```text
//! word = tone_active ? (pitch_phase ? HIGH : LOW) : CENTER
//! ```
//!
//! While keyed, the carrier alternates between HIGH and LOW at the pitch
//! rate, which an FM receiver tuned to CENTER hears as a square-wave tone.
//! In calibration mode the word is always `1`.

use crate::config::{FrequencyPlan, SelectorMode};
use crate::types::{ControlSignals, FrequencyWord};

/// Per-cycle word selector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrequencySelector {
    center: FrequencyWord,
    high: FrequencyWord,
    low: FrequencyWord,
    mode: SelectorMode,
}

impl FrequencySelector {
    /// Create a selector from a validated plan
    #[must_use]
    pub const fn new(plan: &FrequencyPlan) -> Self {
        Self {
            center: plan.center(),
            high: plan.high(),
            low: plan.low(),
            mode: plan.mode(),
        }
    }

    /// Word for the synchronized control signals
    #[must_use]
    pub const fn select(&self, signals: ControlSignals) -> FrequencyWord {
        match self.mode {
            SelectorMode::Calibration => FrequencyWord::ONE,
            SelectorMode::Normal => {
                if !signals.tone_active {
                    self.center
                } else if signals.pitch_phase {
                    self.high
                } else {
                    self.low
                }
            }
        }
    }

    /// Selection mode
    #[must_use]
    pub const fn mode(&self) -> SelectorMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BeaconConfig;

    #[test]
    fn idle_selects_center() {
        let plan = BeaconConfig::new().validate().unwrap();
        let sel = FrequencySelector::new(&plan);
        assert_eq!(sel.select(ControlSignals::new(false, false)), plan.center());
        assert_eq!(sel.select(ControlSignals::new(false, true)), plan.center());
    }

    #[test]
    fn keyed_follows_pitch() {
        let plan = BeaconConfig::new().validate().unwrap();
        let sel = FrequencySelector::new(&plan);
        assert_eq!(sel.select(ControlSignals::new(true, true)), plan.high());
        assert_eq!(sel.select(ControlSignals::new(true, false)), plan.low());
    }

    #[test]
    fn calibration_selects_one() {
        let plan = BeaconConfig::new()
            .with_calibration_mode(true)
            .validate()
            .unwrap();
        let sel = FrequencySelector::new(&plan);
        for bits in 0..4 {
            assert_eq!(sel.select(ControlSignals::from_bits(bits)), FrequencyWord::ONE);
        }
    }
}
