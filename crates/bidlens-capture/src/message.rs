//! Request/response interface between the foreground trigger and the store.
//!
//! Payloads keep the host extension's wire shape:
//! `{"action": "getNetworkAdData", "tabId": 3}` and
//! `{"action": "clearNetworkAdData"}`.

use crate::request::CapturedRequest;
use crate::store::CaptureStore;
use bidlens_core::TabId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Message sent to the capture store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CaptureMessage {
    /// Return every captured request for a tab.
    GetNetworkAdData {
        /// Tab to query
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    /// Drop captured requests for a tab, or all of them.
    ClearNetworkAdData {
        /// Tab to clear; `None` clears every tab
        #[serde(rename = "tabId", default)]
        tab_id: Option<TabId>,
    },
}

/// Reply to a [`CaptureMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureReply {
    /// Captured requests for the queried tab
    NetworkAdData(Vec<CapturedRequest>),
    /// Acknowledgement of a clear
    Cleared {
        /// Always `"cleared"`
        status: String,
        /// Number of records removed
        removed: usize,
    },
}

impl CaptureReply {
    fn cleared(removed: usize) -> Self {
        Self::Cleared {
            status: "cleared".to_string(),
            removed,
        }
    }
}

/// Answer a message against `store`.
pub fn handle_message<S: CaptureStore + ?Sized>(store: &S, message: CaptureMessage) -> CaptureReply {
    match message {
        CaptureMessage::GetNetworkAdData { tab_id } => {
            let requests = store.query(tab_id);
            debug!(%tab_id, count = requests.len(), "serving captured requests");
            CaptureReply::NetworkAdData(requests)
        }
        CaptureMessage::ClearNetworkAdData { tab_id } => {
            CaptureReply::cleared(store.clear(tab_id))
        }
    }
}
