//! Page-context collection: wait for the auction library, then snapshot it
//! together with web storage.

use crate::auction::{extract_auction, AuctionState, LIBRARY_NOT_FOUND};
use crate::context::{Clock, PageContext};
use crate::storage::{snapshot_storage, StorageSnapshot};
use bidlens_core::CollectorConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Timing of the wait-for-library loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorOptions {
    /// Longest time to wait for the library to appear
    pub wait: Duration,
    /// Delay between presence checks
    pub poll_interval: Duration,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl From<&CollectorConfig> for CollectorOptions {
    fn from(config: &CollectorConfig) -> Self {
        Self {
            wait: Duration::from_millis(config.wait_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

/// Bookkeeping about one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMeta {
    /// Number of presence checks made
    pub attempts: u32,
    /// Milliseconds between the trigger and the library decision
    pub waited_ms: u64,
}

/// Result of one collection trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContextSnapshot {
    /// Identifies the trigger in logs
    pub trigger_id: Uuid,
    /// Auction library state
    pub auction: AuctionState,
    /// Web storage, collected whether or not the library was found
    pub storage: StorageSnapshot,
    /// Polling bookkeeping
    pub meta: CollectionMeta,
}

/// Collect the page context.
///
/// Polls for the auction library every `poll_interval` until it appears or
/// `wait` has elapsed on `clock`, so the future resolves within
/// `wait + poll_interval` of being first polled. Never fails: absence and
/// read failures are reported through [`AuctionState::Unavailable`].
pub async fn collect<P, C>(page: &P, clock: &C, options: CollectorOptions) -> PageContextSnapshot
where
    P: PageContext + ?Sized,
    C: Clock + ?Sized,
{
    let trigger_id = Uuid::new_v4();
    let poll_interval = options.poll_interval.max(Duration::from_millis(1));
    let started = clock.now();
    let mut attempts = 0_u32;

    let found = loop {
        attempts += 1;
        match page.auction_library_present().await {
            Ok(true) => break true,
            Ok(false) => {}
            Err(e) => debug!(%trigger_id, error = %e, "presence check failed"),
        }

        let elapsed = clock.now().saturating_sub(started);
        if elapsed >= options.wait {
            break false;
        }
        clock.sleep(poll_interval.min(options.wait - elapsed)).await;
    };

    let waited_ms = u64::try_from(clock.now().saturating_sub(started).as_millis()).unwrap_or(u64::MAX);

    let auction = if found {
        extract_auction(page).await
    } else {
        AuctionState::Unavailable {
            reason: LIBRARY_NOT_FOUND.to_string(),
        }
    };
    let storage = snapshot_storage(page).await;

    info!(
        %trigger_id,
        available = auction.is_available(),
        attempts,
        waited_ms,
        local_keys = storage.local.len(),
        session_keys = storage.session.len(),
        "page context collected"
    );

    PageContextSnapshot {
        trigger_id,
        auction,
        storage,
        meta: CollectionMeta {
            attempts,
            waited_ms,
        },
    }
}
