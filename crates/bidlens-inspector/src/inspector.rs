//! The inspection pipeline.
//!
//! One trigger collects the page context and the tab's captured requests at
//! the same time, enriches the captures, then locates every user identifier
//! seen in the auction or in request bodies.

use crate::cookies::CookieJar;
use crate::guard::TriggerGuard;
use crate::report::{InspectionReport, ReportSummary, RunOutcome};
use bidlens_capture::{handle_message, CaptureMessage, CaptureReply, CaptureStore, CapturedRequest};
use bidlens_core::{BidlensConfig, TabId, Timestamp};
use bidlens_enrich::{enrich, match_identifiers, merge_identifiers, MatchOptions};
use bidlens_page::{collect, Clock, CollectorOptions, PageContext};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pipeline settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectorOptions {
    /// Wait-for-library timing
    pub collector: CollectorOptions,
    /// Identity matcher settings
    pub matcher: MatchOptions,
    /// Ignore a trigger while another is running
    pub serialize_triggers: bool,
}

impl From<&BidlensConfig> for InspectorOptions {
    fn from(config: &BidlensConfig) -> Self {
        Self {
            collector: CollectorOptions::from(&config.collector),
            matcher: MatchOptions::from(&config.identity),
            serialize_triggers: config.collector.serialize_triggers,
        }
    }
}

/// Runs inspections against injected host capabilities.
///
/// Cheap to clone; clones share the store and the trigger guard.
#[derive(Clone)]
pub struct Inspector {
    store: Arc<dyn CaptureStore>,
    page: Arc<dyn PageContext>,
    cookies: Arc<dyn CookieJar>,
    clock: Arc<dyn Clock>,
    options: InspectorOptions,
    guard: TriggerGuard,
}

impl Inspector {
    /// Create an inspector.
    pub fn new(
        store: Arc<dyn CaptureStore>,
        page: Arc<dyn PageContext>,
        cookies: Arc<dyn CookieJar>,
        clock: Arc<dyn Clock>,
        options: InspectorOptions,
    ) -> Self {
        Self {
            store,
            page,
            cookies,
            clock,
            guard: TriggerGuard::new(options.serialize_triggers),
            options,
        }
    }

    /// Create an inspector with settings taken from `config`.
    pub fn from_config(
        store: Arc<dyn CaptureStore>,
        page: Arc<dyn PageContext>,
        cookies: Arc<dyn CookieJar>,
        clock: Arc<dyn Clock>,
        config: &BidlensConfig,
    ) -> Self {
        Self::new(store, page, cookies, clock, InspectorOptions::from(config))
    }

    /// Settings in effect.
    #[must_use]
    pub fn options(&self) -> &InspectorOptions {
        &self.options
    }

    /// Capture store the inspector reads from.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CaptureStore> {
        &self.store
    }

    /// Run one inspection of `tab`.
    ///
    /// Never fails: every degraded input shows up as an empty or unavailable
    /// section of the report. Returns [`RunOutcome::Skipped`] only when
    /// triggers are serialized and another run is in progress.
    pub async fn run(&self, tab: TabId) -> RunOutcome {
        let Some(_permit) = self.guard.try_acquire() else {
            debug!(%tab, "inspection already running, trigger ignored");
            return RunOutcome::Skipped;
        };

        let (page_context, captures, cookies) = tokio::join!(
            collect(
                self.page.as_ref(),
                self.clock.as_ref(),
                self.options.collector
            ),
            async { self.captures_for(tab) },
            async {
                match self.cookies.cookies_for(tab).await {
                    Ok(cookies) => cookies,
                    Err(e) => {
                        warn!(%tab, "Could not read cookies: {}", e);
                        Vec::new()
                    }
                }
            },
        );

        let enrichment = enrich(&captures);

        let auction_ids = page_context
            .auction
            .snapshot()
            .map(|s| s.user_ids.as_slice())
            .unwrap_or_default();
        let identifiers =
            merge_identifiers([auction_ids, enrichment.body_identifiers.as_slice()]);
        let identities = match_identifiers(
            &identifiers,
            &cookies,
            &page_context.storage,
            &self.options.matcher,
        );

        let summary = ReportSummary {
            prebid_detected: page_context.auction.is_available(),
            tam_detected: !enrichment.tam.is_empty(),
            network_request_count: captures.len(),
            ids_detected: !cookies.is_empty()
                || !page_context.storage.is_empty()
                || !identities.is_empty(),
        };

        info!(
            trigger_id = %page_context.trigger_id,
            %tab,
            identities = identities.len(),
            diagnostics = enrichment.diagnostics.len(),
            "{}",
            summary.status_text()
        );

        RunOutcome::Completed(Box::new(InspectionReport {
            trigger_id: page_context.trigger_id,
            tab_id: tab,
            generated_at: Timestamp::now(),
            auction: page_context.auction,
            storage: page_context.storage,
            collection: page_context.meta,
            captures,
            enrichment,
            cookies,
            identities,
            summary,
        }))
    }

    /// Drop the tab's captured requests, then inspect it again.
    pub async fn clear_and_rerun(&self, tab: TabId) -> RunOutcome {
        let reply = handle_message(
            self.store.as_ref(),
            CaptureMessage::ClearNetworkAdData { tab_id: Some(tab) },
        );
        if let CaptureReply::Cleared { removed, .. } = reply {
            info!(%tab, removed, "captured requests cleared");
        }
        self.run(tab).await
    }

    fn captures_for(&self, tab: TabId) -> Vec<CapturedRequest> {
        match handle_message(
            self.store.as_ref(),
            CaptureMessage::GetNetworkAdData { tab_id: tab },
        ) {
            CaptureReply::NetworkAdData(requests) => requests,
            CaptureReply::Cleared { .. } => Vec::new(),
        }
    }
}

impl std::fmt::Debug for Inspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inspector")
            .field("captured", &self.store.len())
            .field("options", &self.options)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
