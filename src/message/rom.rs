//! Message ROM
//!
//! A read-only table of Morse timing units. Index `i` holds the key state
//! for the `i`th unit of the message.

use core::fmt;

use crate::config::BEACON_TEXT;
use crate::message::morse;

/// Compiled-in message table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageRom<'a> {
    /// Source text (for display only)
    text: &'a str,
    /// One entry per Morse unit, `true` = key down
    bits: &'a [bool],
}

impl<'a> MessageRom<'a> {
    /// Wrap an encoded bit table
    #[must_use]
    pub const fn new(text: &'a str, bits: &'a [bool]) -> Self {
        Self { text, bits }
    }

    /// Key state at `index`; out-of-range indices read as key up
    #[must_use]
    pub const fn bit(&self, index: usize) -> bool {
        if index < self.bits.len() {
            self.bits[index]
        } else {
            false
        }
    }

    /// Number of units in one pass of the message
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bits.len()
    }

    /// Check if the table is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of key-down units
    #[must_use]
    pub fn keyed_units(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Source text
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// The raw unit table
    #[must_use]
    pub const fn bits(&self) -> &'a [bool] {
        self.bits
    }
}

/// Renders key-down units as `=` and key-up units as `_`
impl fmt::Display for MessageRom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in self.bits {
            f.write_str(if bit { "=" } else { "_" })?;
        }
        Ok(())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for MessageRom<'_> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "MessageRom({=str}, {} units)", self.text, self.bits.len());
    }
}

/// Build a `'static` [`MessageRom`] from a string literal at compile time
///
/// ```
/// use dds_beacon::message_rom;
///
/// let rom = message_rom!("TEST");
/// assert_eq!(rom.text(), "TEST");
/// assert!(rom.bit(0));
/// ```
#[macro_export]
macro_rules! message_rom {
    ($text:expr) => {{
        const TEXT: &str = $text;
        const LEN: usize = $crate::message::morse::encoded_len(TEXT.as_bytes());
        static BITS: [bool; LEN] = $crate::message::morse::encode::<LEN>(TEXT.as_bytes());
        $crate::message::MessageRom::new(TEXT, &BITS)
    }};
}

const BEACON_LEN: usize = morse::encoded_len(BEACON_TEXT.as_bytes());
static BEACON_BITS: [bool; BEACON_LEN] = morse::encode::<BEACON_LEN>(BEACON_TEXT.as_bytes());

/// The beacon message, encoded from [`BEACON_TEXT`]
pub static BEACON: MessageRom<'static> = MessageRom::new(BEACON_TEXT, &BEACON_BITS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_rom_matches_text() {
        assert_eq!(BEACON.text(), BEACON_TEXT);
        assert_eq!(BEACON.len(), morse::encoded_len(BEACON_TEXT.as_bytes()));
        // "V" starts with a dit
        assert!(BEACON.bit(0));
        assert!(!BEACON.bit(1));
    }

    #[test]
    fn beacon_rom_ends_in_word_gap() {
        let tail = &BEACON.bits()[BEACON.len() - 7..];
        assert!(tail.iter().all(|&b| !b));
    }

    #[test]
    fn out_of_range_reads_key_up() {
        assert!(!BEACON.bit(BEACON.len()));
        assert!(!BEACON.bit(usize::MAX));
    }

    #[test]
    fn keyed_units_counted() {
        let rom = crate::message_rom!("E");
        assert_eq!(rom.keyed_units(), 1);
        assert_eq!(rom.len(), 8);
    }

    #[test]
    fn display_renders_units() {
        let rom = crate::message_rom!("A");
        let mut s: heapless::String<16> = heapless::String::new();
        core::fmt::write(&mut s, format_args!("{rom}")).unwrap();
        assert_eq!(s.as_str(), "=_===_______");
    }
}
