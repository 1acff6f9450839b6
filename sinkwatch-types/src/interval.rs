//! Monitoring intervals.
//!
//! An interval is a magnitude plus a unit, written compactly as `"15m"`,
//! `"30s"`, `"2h"` or `"1d"`. It bounds how long a monitor's sinks may stay
//! silent before the monitor turns unhealthy.

use core::fmt;
use core::str::FromStr;

/// Time unit of an [`Interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeUnit {
    #[cfg_attr(feature = "serde", serde(rename = "s"))]
    Seconds,
    #[cfg_attr(feature = "serde", serde(rename = "m"))]
    Minutes,
    #[cfg_attr(feature = "serde", serde(rename = "h"))]
    Hours,
    #[cfg_attr(feature = "serde", serde(rename = "d"))]
    Days,
}

impl TimeUnit {
    /// Number of seconds in one unit.
    pub const fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 3_600,
            TimeUnit::Days => 86_400,
        }
    }

    /// Single-letter code used in the compact interval form.
    pub const fn code(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "s" => Some(TimeUnit::Seconds),
            "m" => Some(TimeUnit::Minutes),
            "h" => Some(TimeUnit::Hours),
            "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }
}

/// Maximum allowed silence for a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub magnitude: u32,
    pub unit: TimeUnit,
}

impl Interval {
    /// Create an interval.
    pub const fn new(magnitude: u32, unit: TimeUnit) -> Self {
        Self { magnitude, unit }
    }

    /// Shorthand for an interval in seconds.
    pub const fn seconds(magnitude: u32) -> Self {
        Self::new(magnitude, TimeUnit::Seconds)
    }

    /// Shorthand for an interval in minutes.
    pub const fn minutes(magnitude: u32) -> Self {
        Self::new(magnitude, TimeUnit::Minutes)
    }

    /// Total length of the interval in seconds.
    pub const fn as_seconds(&self) -> i64 {
        self.magnitude as i64 * self.unit.seconds()
    }

    /// The interval as a chrono duration.
    pub fn as_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.as_seconds())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.code())
    }
}

/// Error returned when an interval string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIntervalError {
    input: String,
}

impl fmt::Display for ParseIntervalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid interval {:?}: expected a whole number followed by s, m, h or d",
            self.input
        )
    }
}

impl std::error::Error for ParseIntervalError {}

impl FromStr for Interval {
    type Err = ParseIntervalError;

    /// Parse strings like `"15m"`, `"30s"` or `"1 d"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIntervalError {
            input: s.to_string(),
        };
        let trimmed = s.trim();
        let split = trimmed
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .ok_or_else(err)?;
        let (number, code) = trimmed.split_at(split);
        let unit = TimeUnit::from_code(code).ok_or_else(err)?;
        let magnitude = number.trim().parse::<u32>().map_err(|_| err())?;
        Ok(Self::new(magnitude, unit))
    }
}
