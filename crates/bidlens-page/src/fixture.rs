//! A [`PageContext`] backed by a recorded JSON fixture.
//!
//! ```json
//! {
//!   "auction": { "getBidResponses": { "div-1": { "bids": [] } } },
//!   "appearsAfterPolls": 3,
//!   "accessorFailures": { "getConfig": "pbjs.getConfig is not a function" },
//!   "localStorage": { "_pubcid": "xyz" },
//!   "sessionStorage": {},
//!   "deniedStorage": ["session"],
//!   "resources": ["https://c.amazon-adsystem.com/aax2/apstag.js"]
//! }
//! ```
//!
//! Omitting `auction` simulates a page without the library.

use crate::context::{AuctionAccessor, PageContext, StorageArea};
use crate::error::{PageError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

/// Recorded page state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageFixture {
    /// Accessor payloads; `None` means the library never loads
    pub auction: Option<BTreeMap<AuctionAccessor, Value>>,
    /// Presence checks that report "absent" before the library appears
    pub appears_after_polls: u32,
    /// Accessors that throw, with their error message
    pub accessor_failures: BTreeMap<AuctionAccessor, String>,
    /// `localStorage` contents
    pub local_storage: BTreeMap<String, String>,
    /// `sessionStorage` contents
    pub session_storage: BTreeMap<String, String>,
    /// Areas whose enumeration is denied
    pub denied_storage: Vec<StorageArea>,
    /// Keys whose individual read fails
    pub unreadable_keys: Vec<String>,
    /// Resource-timing URLs
    pub resources: Vec<String>,
}

/// Page driven by a [`PageFixture`].
#[derive(Debug, Default)]
pub struct FixturePage {
    fixture: PageFixture,
    polls: AtomicU32,
}

impl FixturePage {
    /// Wrap a fixture.
    #[must_use]
    pub fn new(fixture: PageFixture) -> Self {
        Self {
            fixture,
            polls: AtomicU32::new(0),
        }
    }

    /// Parse a fixture from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Load a fixture file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Number of presence checks answered so far.
    #[must_use]
    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    fn area(&self, area: StorageArea) -> &BTreeMap<String, String> {
        match area {
            StorageArea::Local => &self.fixture.local_storage,
            StorageArea::Session => &self.fixture.session_storage,
        }
    }
}

#[async_trait]
impl PageContext for FixturePage {
    async fn auction_library_present(&self) -> Result<bool> {
        let seen = self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.fixture.auction.is_some() && seen >= self.fixture.appears_after_polls)
    }

    async fn read_auction(&self, accessor: AuctionAccessor) -> Result<Option<Value>> {
        if let Some(message) = self.fixture.accessor_failures.get(&accessor) {
            return Err(PageError::AccessorFailed {
                accessor: accessor.name().to_string(),
                message: message.clone(),
            });
        }
        Ok(self
            .fixture
            .auction
            .as_ref()
            .and_then(|auction| auction.get(&accessor))
            .cloned())
    }

    async fn storage_keys(&self, area: StorageArea) -> Result<Vec<String>> {
        if self.fixture.denied_storage.contains(&area) {
            return Err(PageError::StorageDenied(area.to_string()));
        }
        Ok(self.area(area).keys().cloned().collect())
    }

    async fn storage_item(&self, area: StorageArea, key: &str) -> Result<Option<String>> {
        if self.fixture.unreadable_keys.iter().any(|k| k == key) {
            return Err(PageError::StorageDenied(format!("{area}.{key}")));
        }
        Ok(self.area(area).get(key).cloned())
    }

    async fn resource_urls(&self) -> Result<Vec<String>> {
        Ok(self.fixture.resources.clone())
    }
}
