//! Health status and alert severity.

use core::fmt;

/// Health of a monitor.
///
/// Recomputed on every evaluation from the time since the last observed
/// write and the monitor's interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "GREEN"))]
    Healthy,
    #[cfg_attr(feature = "serde", serde(rename = "RED"))]
    Unhealthy,
}

impl Status {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Healthy => "OK",
            Status::Unhealthy => "DOWN",
        }
    }

    /// Stored status code.
    pub fn code(&self) -> &'static str {
        match self {
            Status::Healthy => "GREEN",
            Status::Unhealthy => "RED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Severity assigned to alerts raised by a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum AlertLevel {
    Critical,
    High,
    #[default]
    Medium,
    Low,
    Info,
}

impl AlertLevel {
    /// Stored level code.
    pub fn code(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "CRITICAL",
            AlertLevel::High => "HIGH",
            AlertLevel::Medium => "MEDIUM",
            AlertLevel::Low => "LOW",
            AlertLevel::Info => "INFO",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
