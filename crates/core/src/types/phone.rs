//! Contact phone number type.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Accepted input shapes: optional `8` / `+7` trunk prefix, optional
/// three-digit area code (parentheses allowed), then seven digits that may be
/// separated by dashes or spaces.
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((8|\+7)[\- ]?)?(\(?\d{3}\)?[\- ]?)?[\d\- ]{7}$")
        .unwrap_or_else(|e| unreachable!("phone pattern is a valid regex: {e}"))
});

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input does not look like a phone number.
    #[error("invalid phone number")]
    Malformed,
}

/// A normalized phone number.
///
/// Parsing accepts the formats customers actually type (`+7 912 3456789`,
/// `8(912)3456789`, `3456789`) and keeps only the last ten digits, so two
/// spellings of the same number compare equal.
///
/// ## Examples
///
/// ```
/// use furnish_core::Phone;
///
/// assert_eq!(Phone::parse("+79123456789").map(|p| p.to_string()).ok(), Some("9123456789".to_owned()));
/// assert_eq!(Phone::parse("8 912 3456789").map(|p| p.to_string()).ok(), Some("9123456789".to_owned()));
/// assert!(Phone::parse("call me maybe").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Number of trailing digits kept after normalization.
    pub const DIGITS: usize = 10;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] for blank input and
    /// [`PhoneError::Malformed`] when the input does not match the accepted
    /// formats.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }
        if !PHONE_PATTERN.is_match(trimmed) {
            return Err(PhoneError::Malformed);
        }

        let digits: Vec<char> = trimmed.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(PhoneError::Malformed);
        }
        let start = digits.len().saturating_sub(Self::DIGITS);
        Ok(Self(digits.iter().skip(start).collect()))
    }

    /// Rebuild a phone number from digits that were normalized by
    /// [`Phone::parse`] earlier, for example when reading it back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Malformed`] if `digits` is not a non-empty run of
    /// at most [`Phone::DIGITS`] ASCII digits.
    pub fn from_normalized(digits: &str) -> Result<Self, PhoneError> {
        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }
        if digits.len() > Self::DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneError::Malformed);
        }
        Ok(Self(digits.to_owned()))
    }

    /// Returns the normalized digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}
