//! Web storage snapshot.

use crate::context::{PageContext, StorageArea};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Key/value contents of both storage areas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSnapshot {
    /// `localStorage` contents
    #[serde(rename = "localStorage")]
    pub local: BTreeMap<String, String>,
    /// `sessionStorage` contents
    #[serde(rename = "sessionStorage")]
    pub session: BTreeMap<String, String>,
}

impl StorageSnapshot {
    /// Contents of one area.
    #[must_use]
    pub fn area(&self, area: StorageArea) -> &BTreeMap<String, String> {
        match area {
            StorageArea::Local => &self.local,
            StorageArea::Session => &self.session,
        }
    }

    /// Whether both areas are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.session.is_empty()
    }
}

/// Read both storage areas.
///
/// A denied area yields an empty mapping; a key that cannot be read is
/// skipped without affecting the others.
pub async fn snapshot_storage<P: PageContext + ?Sized>(page: &P) -> StorageSnapshot {
    StorageSnapshot {
        local: read_area(page, StorageArea::Local).await,
        session: read_area(page, StorageArea::Session).await,
    }
}

async fn read_area<P: PageContext + ?Sized>(page: &P, area: StorageArea) -> BTreeMap<String, String> {
    let keys = match page.storage_keys(area).await {
        Ok(keys) => keys,
        Err(e) => {
            warn!("Could not enumerate {}: {}", area, e);
            return BTreeMap::new();
        }
    };

    let mut items = BTreeMap::new();
    for key in keys {
        match page.storage_item(area, &key).await {
            Ok(Some(value)) => {
                items.insert(key, value);
            }
            Ok(None) => {}
            Err(e) => debug!(%area, key = %key, error = %e, "skipping unreadable storage key"),
        }
    }
    items
}
