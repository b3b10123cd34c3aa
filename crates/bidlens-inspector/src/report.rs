//! Inspection report and its one-line summary.

use bidlens_capture::CapturedRequest;
use bidlens_core::{TabId, Timestamp};
use bidlens_enrich::{Cookie, EnrichmentReport, IdentityMatch};
use bidlens_page::{AuctionState, CollectionMeta, StorageSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything one inspection trigger produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionReport {
    /// Identifies the trigger in logs
    pub trigger_id: Uuid,
    /// Inspected tab
    pub tab_id: TabId,
    /// When the report was assembled
    pub generated_at: Timestamp,
    /// Auction library state
    pub auction: AuctionState,
    /// Web storage contents
    pub storage: StorageSnapshot,
    /// Polling bookkeeping of the page collection
    pub collection: CollectionMeta,
    /// Raw captured requests for the tab
    pub captures: Vec<CapturedRequest>,
    /// Structured views over the captures
    pub enrichment: EnrichmentReport,
    /// Cookies visible to the page
    pub cookies: Vec<Cookie>,
    /// Where each user identifier is persisted
    pub identities: Vec<IdentityMatch>,
    /// Detection flags
    pub summary: ReportSummary,
}

/// Detection flags shown above the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// Auction library state was read
    pub prebid_detected: bool,
    /// Any Amazon TAM traffic was seen
    pub tam_detected: bool,
    /// Captured requests for the tab
    pub network_request_count: usize,
    /// Cookies, storage entries or user identifiers were found
    pub ids_detected: bool,
}

impl ReportSummary {
    /// Status line, e.g. `Data collected. TAM: Yes. Network Requests: 3.`
    #[must_use]
    pub fn status_text(&self) -> String {
        let mut text = String::from("Data collected.");
        if self.prebid_detected {
            text.push_str(" Prebid.js: Yes.");
        }
        if self.tam_detected {
            text.push_str(" TAM: Yes.");
        }
        if self.network_request_count > 0 {
            text.push_str(&format!(" Network Requests: {}.", self.network_request_count));
        } else {
            text.push_str(" Network Requests: None.");
        }
        if self.ids_detected {
            text.push_str(" IDs: Yes.");
        }
        text
    }

    /// Nothing at all was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.prebid_detected
            && !self.tam_detected
            && self.network_request_count == 0
            && !self.ids_detected
    }
}

/// Outcome of a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The pipeline ran to completion
    Completed(Box<InspectionReport>),
    /// Another run held the trigger guard
    Skipped,
}

impl RunOutcome {
    /// The report, if the run completed.
    #[must_use]
    pub fn report(&self) -> Option<&InspectionReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped => None,
        }
    }

    /// Take the report, if the run completed.
    #[must_use]
    pub fn into_report(self) -> Option<InspectionReport> {
        match self {
            Self::Completed(report) => Some(*report),
            Self::Skipped => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_everything() {
        let summary = ReportSummary {
            prebid_detected: true,
            tam_detected: true,
            network_request_count: 7,
            ids_detected: true,
        };
        assert_eq!(
            summary.status_text(),
            "Data collected. Prebid.js: Yes. TAM: Yes. Network Requests: 7. IDs: Yes."
        );
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_status_text_nothing() {
        let summary = ReportSummary::default();
        assert_eq!(summary.status_text(), "Data collected. Network Requests: None.");
        assert!(summary.is_empty());
    }

    #[test]
    fn test_status_text_partial() {
        let summary = ReportSummary {
            tam_detected: true,
            network_request_count: 1,
            ..ReportSummary::default()
        };
        assert_eq!(
            summary.status_text(),
            "Data collected. TAM: Yes. Network Requests: 1."
        );
    }
}
