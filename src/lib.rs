//! DDS Morse FSK Beacon Library
//!
//! This library models a direct digital synthesis (DDS) beacon that keys a
//! Morse message as frequency-shift keying on an FM broadcast carrier. The
//! design has two clock domains: a slow control clock that plays the
//! message, and a fast synthesis clock that drives a phase accumulator
//! whose top bit is the RF output.
//!
//! # Architecture
//!
//! The library is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TOP LEVEL                               │
//! │  Beacon (cooperative)  │  ThreadedBeacon (std, two threads)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │             CONTROL DOMAIN (slow clock)                      │
//! │  Morse encoder  │  MessageRom  │  MessageSequencer           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 CLOCK DOMAIN CROSSING                        │
//! │          ClockDomainBridge (two-flop synchronizers)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │             SYNTHESIS DOMAIN (fast clock)                    │
//! │  FrequencySelector  │  PhaseAccumulator  │  Calibration      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Validate once**: every configuration error surfaces from
//!   [`BeaconConfig::validate`](config::BeaconConfig::validate); nothing
//!   after it can fail
//! - **Type-driven design**: widths and words are newtypes checked at
//!   construction
//! - **Integer frequency math**: words are derived without floating point
//! - **No unsafe code**
//!
//! # Example
//!
//! ```
//! use dds_beacon::prelude::*;
//!
//! let mut beacon = Beacon::from_config(&BeaconConfig::compact()).unwrap();
//! let meter = beacon.run(10_000);
//! assert!(meter.rising_edges() > 0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Must come first: the logging macros are textually scoped
#[macro_use]
mod fmt;

/// Shared types used across modules
pub mod types;

/// Beacon configuration and derived frequency plan
pub mod config;

/// Message encoding, storage and playback
pub mod message;

/// Synthesis-domain building blocks
pub mod dds;

/// Both domains wired together
pub mod beacon;

/// Threaded two-domain runtime
#[cfg(feature = "std")]
pub mod runtime;

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::beacon::{Beacon, BeaconEvent, BeaconOutput, Diagnostics, EventKind};
    pub use crate::config::*;
    pub use crate::dds::{
        Accumulator, CalibrationCounter, ClockDomainBridge, ClockMeasurement,
        FrequencySelector, PhaseAccumulator, PipelinedAccumulator, ToggleMeter,
    };
    pub use crate::message::{MessageRom, MessageSequencer, BEACON};
    pub use crate::types::*;

    #[cfg(feature = "std")]
    pub use crate::runtime::{RunReport, SignalMailbox, ThreadedBeacon};
}
