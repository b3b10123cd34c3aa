//! Shared types used across BidLens.
//!
//! Newtypes keep host-supplied identifiers from being mixed up with one
//! another as they flow from the capture store into reports.

use crate::error::BidlensError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque request identifier assigned by the host platform.
///
/// Unique per observed network request; the primary key of the capture store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Create a new `RequestId`.
    ///
    /// # Errors
    /// Returns error if the identifier is empty or only whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, BidlensError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(BidlensError::Validation(
                "invalid request ID: must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Browser tab identifier as reported by the host.
///
/// Requests not tied to a tab carry the host's sentinel value `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(i64);

impl TabId {
    /// Sentinel used by the host for requests outside any tab.
    pub const NONE: Self = Self(-1);

    /// Wrap a raw host tab id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw tab id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Convert a host event time (fractional milliseconds since the Unix
    /// epoch) into a timestamp. Out-of-range values clamp to the epoch.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_epoch_millis(millis: f64) -> Self {
        let micros = (millis * 1000.0).round();
        let dt = if micros.is_finite() {
            DateTime::from_timestamp_micros(micros as i64).unwrap_or_default()
        } else {
            DateTime::<Utc>::default()
        };
        Self(dt)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn epoch_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_valid() {
        let id = RequestId::new("18342").expect("valid request ID");
        assert_eq!(id.as_str(), "18342");
        assert_eq!(id.to_string(), "18342");
    }

    #[test]
    fn test_request_id_empty() {
        assert!(RequestId::new("").is_err());
        assert!(RequestId::new("   ").is_err());
    }

    #[test]
    fn test_request_id_serializes_as_string() {
        let id = RequestId::from("abc");
        let json = serde_json::to_string(&id).expect("serialize request ID");
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_tab_id_roundtrip() {
        let tab: TabId = serde_json::from_str("7").expect("deserialize tab ID");
        assert_eq!(tab, TabId::new(7));
        assert_eq!(TabId::NONE.get(), -1);
    }

    #[test]
    fn test_timestamp_from_epoch_millis() {
        let ts = Timestamp::from_epoch_millis(1_700_000_000_123.4);
        assert_eq!(ts.epoch_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_timestamp_non_finite_clamps() {
        let ts = Timestamp::from_epoch_millis(f64::NAN);
        assert_eq!(ts.epoch_millis(), 0);
    }

    #[test]
    fn test_timestamp_ordering() {
        let earlier = Timestamp::from_epoch_millis(1000.0);
        let later = Timestamp::from_epoch_millis(2000.0);
        assert!(later > earlier);
    }
}
