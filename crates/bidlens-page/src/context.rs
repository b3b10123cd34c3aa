//! Host capabilities the collector runs against: page scripting and time.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Read accessors of the page's header-bidding library (Prebid.js).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuctionAccessor {
    /// Configured ad units (`pbjs._adUnits`, the library's internal copy;
    /// recorded fixtures may also use the public `adUnits` name)
    #[serde(rename = "_adUnits", alias = "adUnits")]
    AdUnits,
    /// Ad-server targeting per ad unit (`pbjs.getAdserverTargeting()`)
    #[serde(rename = "getAdserverTargeting")]
    AdserverTargeting,
    /// Winning bids (`pbjs.getAllWinningBids()`)
    #[serde(rename = "getAllWinningBids")]
    AllWinningBids,
    /// Bid responses per ad unit (`pbjs.getBidResponses()`)
    #[serde(rename = "getBidResponses")]
    BidResponses,
    /// Library configuration (`pbjs.getConfig()`)
    #[serde(rename = "getConfig")]
    Config,
    /// User identifiers as eIDs (`pbjs.getUserIdsAsEids()`)
    #[serde(rename = "getUserIdsAsEids")]
    UserIdsAsEids,
    /// Consent state (`pbjs.getUserConsent()`)
    #[serde(rename = "getUserConsent")]
    UserConsent,
}

impl AuctionAccessor {
    /// Every accessor, in extraction order.
    pub const ALL: [Self; 7] = [
        Self::AdUnits,
        Self::AdserverTargeting,
        Self::AllWinningBids,
        Self::BidResponses,
        Self::Config,
        Self::UserIdsAsEids,
        Self::UserConsent,
    ];

    /// Name of the accessor on the library's global object.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AdUnits => "_adUnits",
            Self::AdserverTargeting => "getAdserverTargeting",
            Self::AllWinningBids => "getAllWinningBids",
            Self::BidResponses => "getBidResponses",
            Self::Config => "getConfig",
            Self::UserIdsAsEids => "getUserIdsAsEids",
            Self::UserConsent => "getUserConsent",
        }
    }
}

impl fmt::Display for AuctionAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Web storage area of the inspected page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// `window.localStorage`
    Local,
    /// `window.sessionStorage`
    Session,
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("localStorage"),
            Self::Session => f.write_str("sessionStorage"),
        }
    }
}

/// Scripting access to the inspected page.
///
/// Each call corresponds to one script injection returning a single value.
/// Implementations must be thread-safe; the collector may be driven from any
/// task.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Whether the auction library's global object exists yet.
    async fn auction_library_present(&self) -> Result<bool>;

    /// Read one accessor. `Ok(None)` means the accessor is not defined on
    /// this library build.
    async fn read_auction(&self, accessor: AuctionAccessor) -> Result<Option<Value>>;

    /// Enumerate the keys of a storage area.
    async fn storage_keys(&self, area: StorageArea) -> Result<Vec<String>>;

    /// Read a single storage item.
    async fn storage_item(&self, area: StorageArea, key: &str) -> Result<Option<String>>;

    /// URLs of every performance resource-timing entry on the page.
    async fn resource_urls(&self) -> Result<Vec<String>>;
}

/// Monotonic time source for polling.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Suspend the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by the tokio timer.
///
/// Honours `tokio::time::pause`, so tests can drive it deterministically.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    /// Create a clock whose origin is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_names_match_serde() {
        for accessor in AuctionAccessor::ALL {
            let json = serde_json::to_value(accessor).expect("serialize accessor");
            assert_eq!(json, accessor.name());
        }
    }

    #[test]
    fn test_ad_units_reads_internal_copy() {
        assert_eq!(AuctionAccessor::AdUnits.name(), "_adUnits");
        let legacy: AuctionAccessor =
            serde_json::from_str(r#""adUnits""#).expect("public name still accepted");
        assert_eq!(legacy, AuctionAccessor::AdUnits);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock::new();
        clock.sleep(Duration::from_millis(250)).await;
        assert_eq!(clock.now(), Duration::from_millis(250));
    }
}
