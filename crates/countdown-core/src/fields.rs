//! The user-facing `HH:MM:SS` representation of a duration, and validation
//! of raw field input before it reaches the engine.

use crate::time;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reasons a duration entered by the user cannot be started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("the {0} field is empty; fill in hours, minutes and seconds")]
    EmptyField(&'static str),

    #[error("invalid {field}: {value:?} is not a whole number")]
    InvalidNumber { field: &'static str, value: String },

    #[error("the countdown must be at least one second long")]
    ZeroDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DurationFields {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl DurationFields {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Parse the three raw input fields. Surrounding whitespace is ignored.
    pub fn parse(hours: &str, minutes: &str, seconds: &str) -> Result<Self, InputError> {
        Ok(Self {
            hours: parse_unit("hours", hours)?,
            minutes: parse_unit("minutes", minutes)?,
            seconds: parse_unit("seconds", seconds)?,
        })
    }

    pub fn from_millis(ms: u64) -> Self {
        Self {
            hours: time::milliseconds_to_hours(ms),
            minutes: time::milliseconds_to_minutes(ms),
            seconds: time::milliseconds_to_seconds(ms),
        }
    }

    pub fn to_millis(&self) -> u64 {
        time::to_milliseconds(self.hours, self.minutes, self.seconds)
    }

    pub fn is_zero(&self) -> bool {
        self.to_millis() == 0
    }

    /// Total milliseconds, or `ZeroDuration` if there is nothing to count down.
    pub fn ensure_startable(&self) -> Result<u64, InputError> {
        match self.to_millis() {
            0 => Err(InputError::ZeroDuration),
            ms => Ok(ms),
        }
    }
}

impl fmt::Display for DurationFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            pad_time_unit(self.hours),
            pad_time_unit(self.minutes),
            pad_time_unit(self.seconds)
        )
    }
}

/// Zero-pad a time unit to at least two digits.
pub fn pad_time_unit(value: u32) -> String {
    format!("{:02}", value)
}

fn parse_unit(field: &'static str, raw: &str) -> Result<u32, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyField(field));
    }
    trimmed.parse().map_err(|_| InputError::InvalidNumber {
        field,
        value: trimmed.to_string(),
    })
}
