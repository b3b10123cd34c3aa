//! Capture store keyed by host request id.

use crate::allowlist::UrlPatternSet;
use crate::error::Result;
use crate::event::{Completed, ErrorOccurred, RequestStarted, ResponseStarted};
use crate::request::CapturedRequest;
use bidlens_core::{CaptureConfig, RequestId, TabId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Store of in-flight and completed requests fed by host lifecycle callbacks.
///
/// Callbacks may arrive in any interleaving, for ids that were never
/// inserted, or not at all. Implementations must never fail outward and must
/// keep each operation atomic with respect to the others.
pub trait CaptureStore: Send + Sync {
    /// Insert the record for a newly sent request.
    fn on_request_start(&self, event: RequestStarted);

    /// Record status and response headers. Unknown ids are ignored.
    fn on_response_started(&self, event: ResponseStarted);

    /// Mark a request completed. Unknown ids are ignored.
    fn on_completed(&self, event: Completed);

    /// Mark a request failed. Unknown ids are ignored.
    fn on_error_occurred(&self, event: ErrorOccurred);

    /// Snapshot of every record initiated by `tab`, in unspecified order.
    fn query(&self, tab: TabId) -> Vec<CapturedRequest>;

    /// Remove one tab's records, or all records when `tab` is `None`.
    /// Returns the number of records removed.
    fn clear(&self, tab: Option<TabId>) -> usize;

    /// Total number of records.
    fn len(&self) -> usize;

    /// Whether the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`CaptureStore`] living for the lifetime of the background
/// context.
///
/// A single lock guards the map, so readers always see whole records.
#[derive(Clone, Default)]
pub struct InMemoryCaptureStore {
    requests: Arc<RwLock<HashMap<RequestId, CapturedRequest>>>,
    allowlist: Option<Arc<UrlPatternSet>>,
}

impl InMemoryCaptureStore {
    /// Create a store that accepts every URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that drops request starts not matching `allowlist`.
    #[must_use]
    pub fn with_allowlist(allowlist: UrlPatternSet) -> Self {
        Self {
            requests: Arc::default(),
            allowlist: Some(Arc::new(allowlist)),
        }
    }

    /// Create a store from capture settings.
    ///
    /// # Errors
    /// Returns error if an allowlist pattern is malformed.
    pub fn from_config(config: &CaptureConfig) -> Result<Self> {
        if config.enforce_allowlist {
            Ok(Self::with_allowlist(UrlPatternSet::compile(
                &config.url_patterns,
            )?))
        } else {
            Ok(Self::new())
        }
    }

    /// Apply `f` to an existing, not yet completed record.
    ///
    /// Returns false when the id is unknown or the record is frozen.
    fn update<F>(&self, id: &RequestId, phase: &str, f: F) -> bool
    where
        F: FnOnce(&mut CapturedRequest),
    {
        let mut requests = self
            .requests
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match requests.get_mut(id) {
            Some(request) if request.completed => {
                debug!(request_id = %id, phase, "ignoring event for completed request");
                false
            }
            Some(request) => {
                f(request);
                true
            }
            None => {
                debug!(request_id = %id, phase, "ignoring event for unknown request");
                false
            }
        }
    }
}

impl CaptureStore for InMemoryCaptureStore {
    fn on_request_start(&self, event: RequestStarted) {
        if let Some(allowlist) = &self.allowlist {
            if !allowlist.allows(&event.url) {
                return;
            }
        }

        let record = CapturedRequest::from_start(event);
        let mut requests = self
            .requests
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match requests.get(&record.id) {
            Some(existing) if existing.completed => {
                debug!(request_id = %record.id, "ignoring restart of completed request");
            }
            Some(_) => {
                debug!(request_id = %record.id, url = %record.url, "request restarted (redirect)");
                requests.insert(record.id.clone(), record);
            }
            None => {
                debug!(request_id = %record.id, url = %record.url, "captured request");
                requests.insert(record.id.clone(), record);
            }
        }
    }

    fn on_response_started(&self, event: ResponseStarted) {
        self.update(&event.request_id, "response_started", |request| {
            request.status_code = Some(event.status_code);
            request.status_line = Some(event.status_line);
            request.response_headers = event.response_headers;
        });
    }

    fn on_completed(&self, event: Completed) {
        self.update(&event.request_id, "completed", |request| {
            request.completed = true;
            if request.status_code.is_none() && event.status_code.is_some() {
                request.status_code = event.status_code;
                request.status_line = event.status_line;
            }
        });
    }

    fn on_error_occurred(&self, event: ErrorOccurred) {
        self.update(&event.request_id, "error_occurred", |request| {
            request.completed = true;
            request.error = Some(event.error);
        });
    }

    fn query(&self, tab: TabId) -> Vec<CapturedRequest> {
        let requests = self
            .requests
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        requests
            .values()
            .filter(|request| request.tab_id == tab)
            .cloned()
            .collect()
    }

    fn clear(&self, tab: Option<TabId>) -> usize {
        let mut requests = self
            .requests
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let before = requests.len();
        match tab {
            Some(tab) => requests.retain(|_, request| request.tab_id != tab),
            None => requests.clear(),
        }
        let removed = before - requests.len();
        debug!(?tab, removed, "cleared captured requests");
        removed
    }

    fn len(&self) -> usize {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
