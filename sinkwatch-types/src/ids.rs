//! Identifier newtypes.

use core::fmt;

/// Name of a watched data sink.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SinkId(pub String);

impl SinkId {
    /// Create a sink id.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The sink name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SinkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SinkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Store-assigned identifier of a persisted monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MonitorId(pub u64);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned identifier of a persisted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AlertId(pub u64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_ids_order_by_name() {
        let mut ids = vec![SinkId::from("proxy"), SinkId::from("firewall")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "firewall");
    }

    #[test]
    fn display_formats() {
        assert_eq!(SinkId::new("dns").to_string(), "dns");
        assert_eq!(MonitorId(7).to_string(), "7");
        assert_eq!(AlertId(42).to_string(), "42");
    }

    #[test]
    fn ids_serialize_transparently() {
        #[cfg(feature = "serde")]
        {
            assert_eq!(serde_json::to_string(&SinkId::from("dns")).unwrap(), "\"dns\"");
            assert_eq!(serde_json::to_string(&MonitorId(3)).unwrap(), "3");
        }
    }
}
