//! Message Playback
//!
//! The control-domain half of the beacon:
//! - Morse encoding of the beacon text into a unit bitstream
//! - The compiled-in message ROM
//! - The sequencer that walks the ROM at Morse unit rate

pub mod morse;
pub mod rom;
pub mod sequencer;

pub use rom::{MessageRom, BEACON};
pub use sequencer::{MessageSequencer, SequencerState};
