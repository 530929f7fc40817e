//! Recall-quality rating.
//!
//! Ratings run from 1 (complete failure) to 5 (perfect recall). Out-of-range
//! numbers are clamped into that range; anything that is not a number is
//! rejected.
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 5;

/// Ratings at or above this value count as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QualityError {
    #[error("quality rating is not a number: {0:?}")]
    NotANumber(String),

    #[error("quality rating must be a finite number")]
    NonFinite,
}

/// A validated quality rating in `1..=5`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub fn from_int(raw: i64) -> Self {
        Self(raw.clamp(i64::from(MIN_QUALITY), i64::from(MAX_QUALITY)) as u8)
    }

    /// Rounds to the nearest whole rating before clamping.
    pub fn from_f64(raw: f64) -> Result<Self, QualityError> {
        if !raw.is_finite() {
            return Err(QualityError::NonFinite);
        }
        let clamped = raw
            .round()
            .clamp(f64::from(MIN_QUALITY), f64::from(MAX_QUALITY));
        Ok(Self(clamped as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= PASSING_QUALITY
    }

    /// Every rating, lowest first.
    pub fn all() -> impl Iterator<Item = Quality> {
        (MIN_QUALITY..=MAX_QUALITY).map(Quality)
    }
}

impl FromStr for Quality {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(whole) = trimmed.parse::<i64>() {
            return Ok(Self::from_int(whole));
        }
        match trimmed.parse::<f64>() {
            Ok(raw) => Self::from_f64(raw),
            Err(_) => Err(QualityError::NotANumber(s.to_string())),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
