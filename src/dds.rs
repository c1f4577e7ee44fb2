//! Direct Digital Synthesis
//!
//! The synthesis-domain half of the beacon:
//! - Two-stage synchronizers bringing control signals across domains
//! - Frequency-control word selection
//! - Phase accumulators (single-cycle and pipelined carry)
//! - Calibration counter and output toggle meter

pub mod accumulator;
pub mod bridge;
pub mod calibration;
pub mod pipelined;
pub mod selector;

pub use accumulator::{Accumulator, PhaseAccumulator};
pub use bridge::{ClockDomainBridge, Synchronizer};
pub use calibration::{CalibrationCounter, ClockMeasurement, ToggleMeter};
pub use pipelined::PipelinedAccumulator;
pub use selector::FrequencySelector;
