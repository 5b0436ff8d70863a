//! Chilean national identifier (RUT) with its modulo-11 check digit.

use std::fmt;
use std::str::FromStr;

/// A RUT whose check digit has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rut {
    body: String,
    check_digit: char,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RutError {
    #[error("RUT is too short")]
    TooShort,
    #[error("RUT body must be numeric")]
    NonNumericBody,
    #[error("RUT check digit does not match (expected {expected})")]
    CheckDigitMismatch { expected: char },
}

impl Rut {
    /// Computes the check digit for a numeric body.
    ///
    /// Returns `None` if `body` is empty or contains anything but ASCII digits.
    #[must_use]
    pub fn check_digit(body: &str) -> Option<char> {
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let sum: u32 = body
            .bytes()
            .rev()
            .map(|b| u32::from(b - b'0'))
            .zip((2..=7).cycle())
            .map(|(digit, weight)| digit * weight)
            .sum();

        Some(match 11 - (sum % 11) {
            11 => '0',
            10 => 'K',
            n => char::from_digit(n, 10)?,
        })
    }

    /// Digits without separators or check digit.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub const fn verifier(&self) -> char {
        self.check_digit
    }

    /// `12345678-5`, the form the backend expects in paths and filters.
    #[must_use]
    pub fn compact(&self) -> String {
        format!("{}-{}", self.body, self.check_digit)
    }
}

impl FromStr for Rut {
    type Err = RutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, 'k' | 'K'))
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if cleaned.len() < 2 {
            return Err(RutError::TooShort);
        }

        let (body, dv) = cleaned.split_at(cleaned.len() - 1);
        let expected = Self::check_digit(body).ok_or(RutError::NonNumericBody)?;
        let given = dv.chars().next().ok_or(RutError::TooShort)?;

        if given != expected {
            return Err(RutError::CheckDigitMismatch { expected });
        }

        Ok(Self { body: body.to_string(), check_digit: expected })
    }
}

impl fmt::Display for Rut {
    /// Dotted form, e.g. `12.345.678-5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.body.len();
        for (i, c) in self.body.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "-{}", self.check_digit)
    }
}

/// Returns true when `input` is a RUT with a matching check digit. Dots,
/// dashes and spaces are ignored.
#[must_use]
pub fn validate_rut(input: &str) -> bool {
    input.parse::<Rut>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ruts() {
        assert!(validate_rut("12345678-5"));
        assert!(validate_rut("12.345.678-5"));
        assert!(validate_rut(" 12345678 5 "));
        assert!(validate_rut("11111111-1"));
        assert!(validate_rut("10000013-K"));
        assert!(validate_rut("10000013-k"));
        assert!(validate_rut("1-9"));
    }

    #[test]
    fn test_invalid_ruts() {
        assert!(!validate_rut("12345678-0"));
        assert!(!validate_rut(""));
        assert!(!validate_rut("5"));
        assert!(!validate_rut("-"));
        assert!(!validate_rut("1K34-5"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("7".parse::<Rut>(), Err(RutError::TooShort));
        assert_eq!("1K2-3".parse::<Rut>(), Err(RutError::NonNumericBody));
        assert_eq!("12345678-0".parse::<Rut>(), Err(RutError::CheckDigitMismatch { expected: '5' }));
    }

    #[test]
    fn test_check_digit_edge_cases() {
        assert_eq!(Rut::check_digit("11"), Some('6'));
        assert_eq!(Rut::check_digit("10000013"), Some('K'));
        // sum % 11 == 0
        assert_eq!(Rut::check_digit("0"), Some('0'));
        assert_eq!(Rut::check_digit(""), None);
        assert_eq!(Rut::check_digit("12a"), None);
    }

    #[test]
    fn test_formatting() {
        let rut: Rut = "12345678-5".parse().unwrap();
        assert_eq!(rut.to_string(), "12.345.678-5");
        assert_eq!(rut.compact(), "12345678-5");
        assert_eq!(rut.body(), "12345678");
        assert_eq!(rut.verifier(), '5');

        let rut: Rut = "9.876.543-3".parse().unwrap();
        assert_eq!(rut.to_string(), "9.876.543-3");

        let rut: Rut = "1-9".parse().unwrap();
        assert_eq!(rut.to_string(), "1-9");
    }
}
