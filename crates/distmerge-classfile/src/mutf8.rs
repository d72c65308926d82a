//! Modified UTF-8, the string encoding used inside class files.
//!
//! Differs from standard UTF-8 in two ways: U+0000 is written as the two-byte
//! form `C0 80`, and supplementary characters are written as a surrogate pair
//! of three-byte sequences.

use crate::error::{ClassError, ClassResult};

/// Decode modified UTF-8 into a Rust string.
///
/// Fails on lone surrogates, which have no `String` representation. Callers
/// that must preserve arbitrary string constants keep the raw bytes instead.
pub fn decode(bytes: &[u8]) -> ClassResult<String> {
    if bytes.iter().all(|b| *b != 0 && *b < 0x80) {
        return String::from_utf8(bytes.to_vec()).map_err(|_| ClassError::InvalidUtf8);
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            if b == 0 {
                return Err(ClassError::InvalidUtf8);
            }
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1).ok_or(ClassError::InvalidUtf8)?;
            if b2 & 0xC0 != 0x80 {
                return Err(ClassError::InvalidUtf8);
            }
            units.push((((b & 0x1F) as u16) << 6) | (b2 & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1).ok_or(ClassError::InvalidUtf8)?;
            let b3 = *bytes.get(i + 2).ok_or(ClassError::InvalidUtf8)?;
            if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                return Err(ClassError::InvalidUtf8);
            }
            units.push(
                (((b & 0x0F) as u16) << 12) | (((b2 & 0x3F) as u16) << 6) | (b3 & 0x3F) as u16,
            );
            i += 3;
        } else {
            return Err(ClassError::InvalidUtf8);
        }
    }

    String::from_utf16(&units).map_err(|_| ClassError::InvalidUtf8)
}

/// Encode a Rust string as modified UTF-8.
pub fn encode(s: &str) -> Vec<u8> {
    if s.bytes().all(|b| b != 0 && b < 0x80) {
        return s.as_bytes().to_vec();
    }

    let mut out = Vec::with_capacity(s.len() + 8);
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
