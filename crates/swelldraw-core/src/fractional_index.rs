//! Fractional order keys.
//!
//! Keys are base-62 digit strings compared lexicographically. A key can always
//! be generated strictly between two others, so elements can be reordered or
//! inserted by replicas without renumbering their neighbours.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ZERO: u8 = DIGITS[0];

/// Fractional index errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("Invalid fractional index: {0:?}")]
    Invalid(String),
    #[error("Fractional index bounds out of order: {lower} >= {upper}")]
    OutOfOrder { lower: String, upper: String },
}

/// A sortable order key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FractionalIndex(String);

impl FractionalIndex {
    /// Validate an existing key.
    pub fn parse(key: &str) -> Result<Self, IndexError> {
        let well_formed = !key.is_empty()
            && key.bytes().all(|b| DIGITS.contains(&b))
            && !key.ends_with(ZERO as char);
        if well_formed {
            Ok(Self(key.to_string()))
        } else {
            Err(IndexError::Invalid(key.to_string()))
        }
    }

    /// The key generated for an empty sequence.
    pub fn first() -> Self {
        Self(midpoint(b"", None))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FractionalIndex {
    type Error = IndexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FractionalIndex> for String {
    fn from(value: FractionalIndex) -> Self {
        value.0
    }
}

impl fmt::Display for FractionalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a key strictly between `lower` and `upper`; a missing bound is
/// unbounded on that side.
pub fn generate_key_between(
    lower: Option<&FractionalIndex>,
    upper: Option<&FractionalIndex>,
) -> Result<FractionalIndex, IndexError> {
    if let (Some(lower), Some(upper)) = (lower, upper) {
        if lower >= upper {
            return Err(IndexError::OutOfOrder {
                lower: lower.0.clone(),
                upper: upper.0.clone(),
            });
        }
    }

    let lower = lower.map(|key| key.0.as_bytes()).unwrap_or(b"");
    let upper = upper.map(|key| key.0.as_bytes());
    Ok(FractionalIndex(midpoint(lower, upper)))
}

fn digit_value(digit: u8) -> usize {
    DIGITS.iter().position(|&d| d == digit).unwrap_or(0)
}

/// Midpoint of two digit strings. `lower` may be empty, `upper` absent.
/// Callers guarantee `lower < upper` and no trailing zeros.
fn midpoint(lower: &[u8], upper: Option<&[u8]>) -> String {
    if let Some(upper) = upper {
        // Strip the common prefix, padding `lower` with zeros.
        let mut n = 0;
        while n < upper.len() && lower.get(n).copied().unwrap_or(ZERO) == upper[n] {
            n += 1;
        }
        if n > 0 {
            let rest_lower = lower.get(n..).unwrap_or(b"");
            let mut key = String::from_utf8_lossy(&upper[..n]).into_owned();
            key.push_str(&midpoint(rest_lower, Some(&upper[n..])));
            return key;
        }
    }

    let digit_lower = lower.first().map(|&d| digit_value(d)).unwrap_or(0);
    let digit_upper = upper
        .and_then(|u| u.first())
        .map(|&d| digit_value(d))
        .unwrap_or(DIGITS.len());

    if digit_upper - digit_lower > 1 {
        let mid = (digit_lower + digit_upper).div_ceil(2);
        return (DIGITS[mid] as char).to_string();
    }

    match upper {
        Some(upper) if upper.len() > 1 => (upper[0] as char).to_string(),
        _ => {
            let mut key = (DIGITS[digit_lower] as char).to_string();
            key.push_str(&midpoint(lower.get(1..).unwrap_or(b""), None));
            key
        }
    }
}
