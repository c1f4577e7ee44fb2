//! Morse Encoding
//!
//! Converts text into a stream of Morse timing units, one bit per unit:
//! key down is `true`, key up is `false`.
//!
//! # Timing
//!
//! | Element        | Units | Key  |
//! |----------------|-------|------|
//! | Dit            | 1     | down |
//! | Dah            | 3     | down |
//! | Element gap    | 1     | up   |
//! | Character gap  | 3     | up   |
//! | Word gap       | 7     | up   |
//!
//! A word gap is appended after the last character so the message can loop
//! back onto itself with correct spacing. Characters without a Morse
//! pattern are skipped.
//!
//! The encoder is a `const fn`, so message ROMs are generated at compile
//! time (see [`message_rom!`](crate::message_rom)).

use heapless::Vec;

/// A Morse timing element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Element {
    /// Short mark
    Dit,
    /// Long mark
    Dah,
    /// Space between marks of one character
    ElementGap,
    /// Space between characters
    CharGap,
    /// Space between words
    WordGap,
}

impl Element {
    /// Duration in timing units
    #[must_use]
    pub const fn units(self) -> usize {
        match self {
            Self::Dit | Self::ElementGap => 1,
            Self::Dah | Self::CharGap => 3,
            Self::WordGap => 7,
        }
    }

    /// Check if this element keys the transmitter
    #[must_use]
    pub const fn is_tone(self) -> bool {
        matches!(self, Self::Dit | Self::Dah)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Element {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Dit => defmt::write!(f, "."),
            Self::Dah => defmt::write!(f, "-"),
            Self::ElementGap => defmt::write!(f, "_"),
            Self::CharGap => defmt::write!(f, "___"),
            Self::WordGap => defmt::write!(f, "_______"),
        }
    }
}

/// Morse pattern for an ASCII byte, `.` = dit, `-` = dah
#[must_use]
pub const fn pattern(c: u8) -> Option<&'static [u8]> {
    match c.to_ascii_uppercase() {
        b'A' => Some(b".-"),
        b'B' => Some(b"-..."),
        b'C' => Some(b"-.-."),
        b'D' => Some(b"-.."),
        b'E' => Some(b"."),
        b'F' => Some(b"..-."),
        b'G' => Some(b"--."),
        b'H' => Some(b"...."),
        b'I' => Some(b".."),
        b'J' => Some(b".---"),
        b'K' => Some(b"-.-"),
        b'L' => Some(b".-.."),
        b'M' => Some(b"--"),
        b'N' => Some(b"-."),
        b'O' => Some(b"---"),
        b'P' => Some(b".--."),
        b'Q' => Some(b"--.-"),
        b'R' => Some(b".-."),
        b'S' => Some(b"..."),
        b'T' => Some(b"-"),
        b'U' => Some(b"..-"),
        b'V' => Some(b"...-"),
        b'W' => Some(b".--"),
        b'X' => Some(b"-..-"),
        b'Y' => Some(b"-.--"),
        b'Z' => Some(b"--.."),
        b'0' => Some(b"-----"),
        b'1' => Some(b".----"),
        b'2' => Some(b"..---"),
        b'3' => Some(b"...--"),
        b'4' => Some(b"....-"),
        b'5' => Some(b"....."),
        b'6' => Some(b"-...."),
        b'7' => Some(b"--..."),
        b'8' => Some(b"---.."),
        b'9' => Some(b"----."),
        b'.' => Some(b".-.-.-"),
        b',' => Some(b"--..--"),
        b'?' => Some(b"..--.."),
        b'/' => Some(b"-..-."),
        b'=' => Some(b"-...-"),
        _ => None,
    }
}

/// Emit `element` at `pos`, writing key-down bits that fall inside `out`
const fn emit(out: &mut [bool], pos: usize, element: Element) -> usize {
    let units = element.units();
    if element.is_tone() {
        let mut i = 0;
        while i < units {
            if pos + i < out.len() {
                out[pos + i] = true;
            }
            i += 1;
        }
    }
    pos + units
}

/// Encode `text` into `out`, returning the total number of units
///
/// `out` must be zeroed; only key-down bits are written. Units past the
/// end of `out` are counted but not stored, so passing an empty slice
/// measures the encoded length.
pub const fn fill(text: &[u8], out: &mut [bool]) -> usize {
    let mut pos = 0;
    let mut started = false;
    let mut gap = Element::CharGap;

    let mut i = 0;
    while i < text.len() {
        let c = text[i];
        i += 1;

        if c == b' ' {
            if started {
                gap = Element::WordGap;
            }
            continue;
        }

        let Some(marks) = pattern(c) else {
            continue;
        };

        if started {
            pos = emit(out, pos, gap);
        }

        let mut m = 0;
        while m < marks.len() {
            if m > 0 {
                pos = emit(out, pos, Element::ElementGap);
            }
            let mark = if marks[m] == b'-' {
                Element::Dah
            } else {
                Element::Dit
            };
            pos = emit(out, pos, mark);
            m += 1;
        }

        started = true;
        gap = Element::CharGap;
    }

    if started {
        pos = emit(out, pos, Element::WordGap);
    }
    pos
}

/// Number of units `text` encodes to
#[must_use]
pub const fn encoded_len(text: &[u8]) -> usize {
    let mut empty: [bool; 0] = [];
    fill(text, &mut empty)
}

/// Encode `text` into a fixed array at compile time
///
/// # Panics
///
/// Panics (a compile error in const context) if `N` differs from
/// [`encoded_len`].
#[must_use]
pub const fn encode<const N: usize>(text: &[u8]) -> [bool; N] {
    let mut out = [false; N];
    let len = fill(text, &mut out);
    assert!(len == N, "array length must equal encoded_len(text)");
    out
}

/// Encode `text` at run time into a fixed-capacity buffer
///
/// Returns None if the encoding needs more than `N` units.
#[must_use]
pub fn encode_vec<const N: usize>(text: &str) -> Option<Vec<bool, N>> {
    let len = encoded_len(text.as_bytes());
    let mut bits = Vec::new();
    bits.resize(len, false).ok()?;
    fill(text.as_bytes(), &mut bits);
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_units() {
        assert_eq!(Element::Dit.units(), 1);
        assert_eq!(Element::Dah.units(), 3);
        assert_eq!(Element::ElementGap.units(), 1);
        assert_eq!(Element::CharGap.units(), 3);
        assert_eq!(Element::WordGap.units(), 7);
    }

    #[test]
    fn element_is_tone() {
        assert!(Element::Dit.is_tone());
        assert!(Element::Dah.is_tone());
        assert!(!Element::ElementGap.is_tone());
        assert!(!Element::CharGap.is_tone());
        assert!(!Element::WordGap.is_tone());
    }

    #[test]
    fn letter_e() {
        // dit + trailing word gap
        const BITS: [bool; 8] = encode(b"E");
        assert_eq!(BITS, [true, false, false, false, false, false, false, false]);
    }

    #[test]
    fn letter_a() {
        // . _ - - - then word gap
        let bits: [bool; 12] = encode(b"A");
        assert_eq!(&bits[..5], &[true, false, true, true, true]);
        assert!(bits[5..].iter().all(|&b| !b));
    }

    #[test]
    fn char_gap_between_letters() {
        // "ET": . ___ - _______
        let bits: [bool; 14] = encode(b"ET");
        assert_eq!(&bits[..7], &[true, false, false, false, true, true, true]);
    }

    #[test]
    fn word_gap_between_words() {
        // "E E": . _______ . _______
        assert_eq!(encoded_len(b"E E"), 1 + 7 + 1 + 7);
        // repeated spaces collapse into one gap
        assert_eq!(encoded_len(b"E   E"), encoded_len(b"E E"));
    }

    #[test]
    fn paris_is_fifty_units() {
        // Standard word: 43 units of characters plus the 7 unit word gap
        assert_eq!(encoded_len(b"PARIS"), 50);
    }

    #[test]
    fn unknown_and_leading_chars_skipped() {
        assert_eq!(encoded_len(b"@E#"), encoded_len(b"E"));
        assert_eq!(encoded_len(b"  E"), encoded_len(b"E"));
        assert_eq!(encoded_len(b""), 0);
        assert_eq!(encoded_len(b"@@"), 0);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(pattern(b'a'), pattern(b'A'));
        let lower: [bool; 12] = encode(b"a");
        let upper: [bool; 12] = encode(b"A");
        assert_eq!(lower, upper);
    }

    #[test]
    fn encode_vec_matches_const() {
        const BITS: [bool; 50] = encode(b"PARIS");
        let bits = encode_vec::<64>("PARIS").unwrap();
        assert_eq!(bits.as_slice(), &BITS[..]);
    }

    #[test]
    fn encode_vec_capacity() {
        assert!(encode_vec::<49>("PARIS").is_none());
        assert!(encode_vec::<50>("PARIS").is_some());
    }
}
