//! CPF identifier validation.
//!
//! A CPF is an 11-digit Brazilian national identification number with two
//! trailing check digits. This module provides the [`Cpf`] newtype which can
//! only be constructed through [`Cpf::parse`], so a `Cpf` value held anywhere
//! in the pipeline is known-valid.
//!
//! # Validation rules
//!
//! 1. After stripping separators, exactly 11 digits must remain.
//! 2. Degenerate sequences of one repeated digit (e.g. `11111111111`) are
//!    rejected even though some of them satisfy the checksum arithmetic.
//! 3. Both check digits must match the two-pass mod-11 formula: for
//!    `t` in `{9, 10}`, `sum = Σ digit[c] * (t + 1 - c)` over `c in 0..t`,
//!    and `digit[t]` must equal `((10 * sum) % 11) % 10`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors produced by [`Cpf::parse`].
///
/// Validation failures are never retried; they are reported to the caller
/// immediately without any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCpf {
    /// Input did not contain exactly 11 digits after stripping separators.
    #[error("CPF must contain exactly 11 digits, got {digit_count}")]
    WrongLength {
        /// Number of digits found in the input.
        digit_count: usize,
    },

    /// All 11 digits are identical (e.g. `00000000000`).
    #[error("CPF consisting of a single repeated digit is not valid")]
    RepeatedDigits,

    /// One of the two check digits does not match the mod-11 formula.
    #[error("CPF check digit {position} is invalid")]
    Checksum {
        /// Which check digit failed (10 or 11, 1-indexed position).
        position: usize,
    },
}

/// A validated CPF identifier.
///
/// Immutable once constructed; the inner string is always exactly 11 ASCII
/// digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cpf(String);

impl Cpf {
    /// Parses and validates a raw CPF string.
    ///
    /// Non-digit characters (dots, dashes, spaces) are stripped before
    /// validation, so both `111.444.777-35` and `11144477735` are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCpf`] when the input fails the structural or
    /// checksum rules described in the module docs.
    pub fn parse(raw: &str) -> Result<Self, InvalidCpf> {
        let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();

        if digits.len() != 11 {
            return Err(InvalidCpf::WrongLength {
                digit_count: digits.len(),
            });
        }

        if digits.iter().all(|&d| d == digits[0]) {
            return Err(InvalidCpf::RepeatedDigits);
        }

        for t in [9usize, 10] {
            let sum: u32 = (0..t).map(|c| digits[c] * (t as u32 + 1 - c as u32)).sum();
            let check = ((10 * sum) % 11) % 10;
            if digits[t] != check {
                return Err(InvalidCpf::Checksum { position: t + 1 });
            }
        }

        Ok(Self(
            digits
                .iter()
                .map(|d| char::from(b'0' + u8::try_from(*d).unwrap_or(0)))
                .collect(),
        ))
    }

    /// Returns the 11 raw digits without separators.
    #[must_use]
    pub fn as_digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cpf {
    /// Renders the canonical `###.###.###-##` formatting.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}-{}",
            &self.0[0..3],
            &self.0[3..6],
            &self.0[6..9],
            &self.0[9..11]
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ==================== Acceptance Tests ====================

    #[test]
    fn test_parse_known_valid_cpf() {
        // 111.444.777-35: t=9 sum = 1*10+1*9+1*8+4*7+4*6+4*5+7*4+7*3+7*2 = 162,
        // (1620 % 11) % 10 = 3; t=10 pass yields check digit 5.
        let cpf = Cpf::parse("11144477735").unwrap();
        assert_eq!(cpf.as_digits(), "11144477735");
    }

    #[test]
    fn test_parse_accepts_formatted_input() {
        let cpf = Cpf::parse("111.444.777-35").unwrap();
        assert_eq!(cpf.as_digits(), "11144477735");
    }

    #[test]
    fn test_display_canonical_format() {
        let cpf = Cpf::parse("11144477735").unwrap();
        assert_eq!(cpf.to_string(), "111.444.777-35");
    }

    // ==================== Rejection Tests ====================

    #[test]
    fn test_parse_rejects_ten_digits() {
        let err = Cpf::parse("1114447773").unwrap_err();
        assert_eq!(err, InvalidCpf::WrongLength { digit_count: 10 });
    }

    #[test]
    fn test_parse_rejects_twelve_digits() {
        let err = Cpf::parse("111444777350").unwrap_err();
        assert_eq!(err, InvalidCpf::WrongLength { digit_count: 12 });
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        let err = Cpf::parse("").unwrap_err();
        assert_eq!(err, InvalidCpf::WrongLength { digit_count: 0 });
    }

    #[test]
    fn test_parse_rejects_repeated_digits_regardless_of_checksum() {
        for d in 0..=9u8 {
            let raw: String = std::iter::repeat_n(char::from(b'0' + d), 11).collect();
            let err = Cpf::parse(&raw).unwrap_err();
            assert_eq!(err, InvalidCpf::RepeatedDigits, "digit {d}");
        }
    }

    #[test]
    fn test_parse_rejects_bad_first_check_digit() {
        // Known-valid CPF with the first check digit bumped by one.
        let err = Cpf::parse("11144477745").unwrap_err();
        assert_eq!(err, InvalidCpf::Checksum { position: 10 });
    }

    #[test]
    fn test_parse_rejects_bad_second_check_digit() {
        let err = Cpf::parse("11144477736").unwrap_err();
        assert_eq!(err, InvalidCpf::Checksum { position: 11 });
    }

    #[test]
    fn test_parse_rejects_letters_mixed_with_digits() {
        // Letters are stripped, leaving too few digits.
        let err = Cpf::parse("111444777ab").unwrap_err();
        assert_eq!(err, InvalidCpf::WrongLength { digit_count: 9 });
    }

    #[test]
    fn test_serializes_as_bare_string() {
        let cpf = Cpf::parse("11144477735").unwrap();
        let json = serde_json::to_string(&cpf).unwrap();
        assert_eq!(json, "\"11144477735\"");
    }
}
