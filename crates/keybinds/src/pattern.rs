//! Byte signatures used to locate native functions.
//!
//! A signature is written as hex byte pairs with optional whitespace, and
//! `??` standing for one byte of any value:
//!
//! ```text
//! 41 57 48 81 EC ???????? 0F29 BC 24
//! ```
//!
//! Scanning the host image is the scanner's job; this module only parses and
//! describes the signature.

use std::{fmt, str::FromStr};

use crate::PatternError;

/// A parsed byte signature. `None` entries match any byte.
#[derive(Clone, PartialEq, Eq)]
pub struct Pattern {
    /// One entry per byte.
    bytes: Vec<Option<u8>>,
}

impl Pattern {
    /// Parse a signature string.
    pub fn parse(s: &str) -> Result<Self, PatternError> {
        let digits: Vec<(usize, char)> = s
            .char_indices()
            .filter(|(_, c)| !c.is_whitespace())
            .collect();
        if digits.is_empty() {
            return Err(PatternError::Empty);
        }
        if digits.len() % 2 != 0 {
            return Err(PatternError::OddLength);
        }

        let mut bytes = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks_exact(2) {
            let (hi_at, hi) = pair[0];
            let (lo_at, lo) = pair[1];
            let byte = match (hi, lo) {
                ('?', '?') => None,
                ('?', _) => return Err(PatternError::PartialWildcard(hi_at)),
                (_, '?') => return Err(PatternError::PartialWildcard(lo_at)),
                _ => {
                    let h = hi.to_digit(16).ok_or(PatternError::InvalidChar(hi, hi_at))?;
                    let l = lo.to_digit(16).ok_or(PatternError::InvalidChar(lo, lo_at))?;
                    Some(((h << 4) | l) as u8)
                }
            };
            bytes.push(byte);
        }
        Ok(Self { bytes })
    }

    /// Number of bytes the signature spans.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for a parsed pattern; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The signature bytes, `None` for wildcards.
    pub fn bytes(&self) -> &[Option<u8>] {
        &self.bytes
    }

    /// True if `window` starts with bytes matching this signature.
    pub fn matches(&self, window: &[u8]) -> bool {
        window.len() >= self.bytes.len()
            && self
                .bytes
                .iter()
                .zip(window)
                .all(|(want, got)| want.is_none_or(|w| w == *got))
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match b {
                Some(b) => write!(f, "{b:02X}")?,
                None => f.write_str("??")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_spaces() {
        let a = Pattern::parse("48 81 EC ????????").unwrap();
        let b = Pattern::parse("4881ec??????  ??").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 7);
        assert_eq!(a.bytes()[..3], [Some(0x48), Some(0x81), Some(0xEC)]);
        assert_eq!(a.bytes()[3], None);
        assert_eq!(a.to_string(), "48 81 EC ?? ?? ?? ??");
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(Pattern::parse("  "), Err(PatternError::Empty));
        assert_eq!(Pattern::parse("41 5"), Err(PatternError::OddLength));
        assert_eq!(Pattern::parse("4G"), Err(PatternError::InvalidChar('G', 1)));
        assert_eq!(Pattern::parse("41 ?5"), Err(PatternError::PartialWildcard(3)));
        assert_eq!(Pattern::parse("41 5?"), Err(PatternError::PartialWildcard(4)));
    }

    #[test]
    fn wildcards_match_anything() {
        let p = Pattern::parse("48 ?? D1").unwrap();
        assert!(p.matches(&[0x48, 0x00, 0xD1]));
        assert!(p.matches(&[0x48, 0xFF, 0xD1, 0x99]));
        assert!(!p.matches(&[0x48, 0xFF, 0xD2]));
        assert!(!p.matches(&[0x48, 0xFF]));
    }
}
