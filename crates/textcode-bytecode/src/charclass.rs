//! UTF-8 byte classification
//!
//! Every byte value falls into exactly one class of the UTF-8 grammar. The
//! transcoder drives its state machine off these classes, so the ordering of
//! the variants matters: `Lead2 < Lead3 < Lead4` and the arithmetic in
//! [`ByteClass::consume`] relies on it.

use serde::{Deserialize, Serialize};

/// Class of a single byte under the UTF-8 grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ByteClass {
    /// 0x00..=0x7F
    Ascii = 0,
    /// 0x80..=0xBF, only valid after a lead byte
    Continuation = 1,
    /// 0xC0..=0xDF, starts a two byte sequence
    Lead2 = 2,
    /// 0xE0..=0xEF, starts a three byte sequence
    Lead3 = 3,
    /// 0xF0..=0xF7, starts a four byte sequence
    Lead4 = 4,
    /// 0xF8..=0xFF, never valid
    Invalid = 5,
}

impl ByteClass {
    /// Is this a plain ASCII byte
    #[inline]
    pub const fn is_ascii(self) -> bool {
        matches!(self, Self::Ascii)
    }

    /// Is this a continuation byte
    #[inline]
    pub const fn is_continuation(self) -> bool {
        matches!(self, Self::Continuation)
    }

    /// Does this byte start a multi-byte sequence
    #[inline]
    pub const fn is_lead(self) -> bool {
        matches!(self, Self::Lead2 | Self::Lead3 | Self::Lead4)
    }

    /// Does this byte start a two byte sequence
    #[inline]
    pub const fn is_lead2(self) -> bool {
        matches!(self, Self::Lead2)
    }

    /// Does this byte start a sequence of three or more bytes
    #[inline]
    pub const fn is_lead3_or_wider(self) -> bool {
        matches!(self, Self::Lead3 | Self::Lead4)
    }

    /// Open-sequence state after two more continuation bytes were consumed.
    ///
    /// `Lead3` collapses to `Continuation` (sequence complete), `Lead4` keeps
    /// one byte owed and becomes `Lead2`.
    #[inline]
    pub const fn consume(self) -> Self {
        match self {
            Self::Lead2 => Self::Ascii,
            Self::Lead3 => Self::Continuation,
            Self::Lead4 => Self::Lead2,
            other => other,
        }
    }
}

/// Classify a byte
#[inline]
pub const fn classify(byte: u8) -> ByteClass {
    match byte {
        0x00..=0x7F => ByteClass::Ascii,
        0x80..=0xBF => ByteClass::Continuation,
        0xC0..=0xDF => ByteClass::Lead2,
        0xE0..=0xEF => ByteClass::Lead3,
        0xF0..=0xF7 => ByteClass::Lead4,
        _ => ByteClass::Invalid,
    }
}

/// Is `byte` a lead that any continuation byte may follow.
///
/// Excludes the overlong and surrogate leads (`C0`, `C1`, `E0`, `ED`, `F0`)
/// and everything from `F4` up, whose valid followers are restricted.
#[inline]
pub const fn is_unrestricted_lead(byte: u8) -> bool {
    matches!(byte, 0xC2..=0xDF | 0xE1..=0xEC | 0xEE..=0xEF | 0xF1..=0xF3)
}

/// Do the bytes form valid UTF-8 text
#[inline]
pub fn is_valid_text(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}

/// Is the little-endian encoding of `value` valid UTF-8 text
#[inline]
pub fn is_valid_u32(value: u32) -> bool {
    is_valid_text(&value.to_le_bytes())
}

/// Smallest value `>= value` whose little-endian encoding is valid text.
///
/// `None` from `0xF800_0000` up, where the top byte can never be text.
pub fn next_valid_u32(value: u32) -> Option<u32> {
    (value..=u32::MAX).find(|&v| is_valid_u32(v))
}

/// Largest value `<= value` whose little-endian encoding is valid text
pub fn prev_valid_u32(value: u32) -> u32 {
    (0..=value).rev().find(|&v| is_valid_u32(v)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(classify(0x00), ByteClass::Ascii);
        assert_eq!(classify(0x7F), ByteClass::Ascii);
        assert_eq!(classify(0x80), ByteClass::Continuation);
        assert_eq!(classify(0xBF), ByteClass::Continuation);
        assert_eq!(classify(0xC0), ByteClass::Lead2);
        assert_eq!(classify(0xDF), ByteClass::Lead2);
        assert_eq!(classify(0xE0), ByteClass::Lead3);
        assert_eq!(classify(0xEF), ByteClass::Lead3);
        assert_eq!(classify(0xF0), ByteClass::Lead4);
        assert_eq!(classify(0xF7), ByteClass::Lead4);
        assert_eq!(classify(0xF8), ByteClass::Invalid);
        assert_eq!(classify(0xFF), ByteClass::Invalid);
    }

    #[test]
    fn test_predicates() {
        assert!(classify(b'S').is_ascii());
        assert!(classify(0x90).is_continuation());
        assert!(classify(0xC3).is_lead() && classify(0xC3).is_lead2());
        assert!(classify(0xE1).is_lead3_or_wider() && !classify(0xE1).is_lead2());
        assert!(classify(0xF1).is_lead3_or_wider());
        assert!(!classify(0xFA).is_lead());
    }

    #[test]
    fn test_consume() {
        assert_eq!(ByteClass::Lead2.consume(), ByteClass::Ascii);
        assert_eq!(ByteClass::Lead3.consume(), ByteClass::Continuation);
        assert_eq!(ByteClass::Lead4.consume(), ByteClass::Lead2);
        assert_eq!(ByteClass::Ascii.consume(), ByteClass::Ascii);
    }

    #[test]
    fn test_valid_u32() {
        assert!(is_valid_u32(0));
        assert!(is_valid_u32(0x7F));
        assert!(!is_valid_u32(0x80));
        assert_eq!(next_valid_u32(0x80), Some(0x100));
        assert_eq!(next_valid_u32(0xC0), Some(0x100));
        // C3 followed by a continuation high byte is a valid two byte sequence
        assert!(is_valid_u32(0x83C3));
        assert_eq!(next_valid_u32(5), Some(5));
        assert_eq!(prev_valid_u32(0xC8), 0x7F);
        assert_eq!(prev_valid_u32(0x1A0), 0x17F);
    }

    #[test]
    fn test_next_valid_u32_top_of_range() {
        assert_eq!(next_valid_u32(0x7F7F_7F7F), Some(0x7F7F_7F7F));
        assert_eq!(next_valid_u32(0xF800_0000), None);
        assert_eq!(next_valid_u32(u32::MAX), None);
        assert!(is_valid_u32(prev_valid_u32(u32::MAX)));
    }

    #[test]
    fn test_unrestricted_leads() {
        assert!(is_unrestricted_lead(0xC3));
        assert!(is_unrestricted_lead(0xE1));
        assert!(is_unrestricted_lead(0xF1));
        assert!(!is_unrestricted_lead(0xC0));
        assert!(!is_unrestricted_lead(0xE0));
        assert!(!is_unrestricted_lead(0xED));
        assert!(!is_unrestricted_lead(0xF4));
        assert!(!is_unrestricted_lead(0x41));
    }
}
