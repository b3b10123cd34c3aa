//! The enrichment pass and its report.

use crate::creative::CreativeDetail;
use crate::rules::{default_rules, Category, Finding, RequestView, Rule};
use crate::tam::{TamAdEvent, TamBid};
use crate::targeting::TargetingRecord;
use crate::vendors::vendor_for_url;
use bidlens_capture::CapturedRequest;
use bidlens_core::{RequestId, TabId, Timestamp};
use bidlens_page::UserIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// TAM records grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TamReport {
    /// One record per requested slot
    pub bid_requests: Vec<TamBid>,
    /// Slots that carried an embedded response
    pub bids_received: Vec<TamBid>,
    /// Ad-delivery events
    pub ad_events: Vec<TamAdEvent>,
}

impl TamReport {
    /// Whether any TAM traffic was seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bid_requests.is_empty() && self.bids_received.is_empty() && self.ad_events.is_empty()
    }
}

/// One-line view of a capture for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    /// Capture id
    pub id: RequestId,
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Initiating tab
    pub tab_id: TabId,
    /// Time the request was sent
    pub timestamp: Timestamp,
    /// Error, status code or `Pending`
    pub status: String,
    /// Ad-tech vendor owning the host
    pub vendor: Option<String>,
    /// Categories whose rules matched
    pub categories: Vec<Category>,
}

/// An extraction step that failed on one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentDiagnostic {
    /// Capture the step ran on
    pub request_id: RequestId,
    /// Capture URL
    pub url: String,
    /// Rule that failed
    pub rule: String,
    /// What went wrong
    pub message: String,
}

/// Everything derived from a capture snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentReport {
    /// Every capture, oldest first
    pub requests: Vec<RequestSummary>,
    /// Amazon TAM records
    pub tam: TamReport,
    /// Targeting, keyed `URL: <url>` or `Body: <url>`
    pub targeting: BTreeMap<String, TargetingRecord>,
    /// Served creatives
    pub creatives: Vec<CreativeDetail>,
    /// eIDs sent in request bodies, deduplicated by source and id
    pub body_identifiers: Vec<UserIdentifier>,
    /// Failed extraction steps
    pub diagnostics: Vec<EnrichmentDiagnostic>,
}

/// Run the built-in rules over a capture snapshot.
///
/// Pure and idempotent: captures are ordered by `(timestamp, id)` first, so
/// the report does not depend on store enumeration order.
#[must_use]
pub fn enrich(captures: &[CapturedRequest]) -> EnrichmentReport {
    enrich_with(captures, &default_rules())
}

/// Run a custom rule list over a capture snapshot.
#[must_use]
pub fn enrich_with(captures: &[CapturedRequest], rules: &[Rule]) -> EnrichmentReport {
    let mut ordered: Vec<&CapturedRequest> = captures.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut report = EnrichmentReport::default();
    let mut seen_ids = BTreeSet::new();

    for request in ordered {
        let view = RequestView::new(request);
        let mut categories = Vec::new();

        for rule in rules {
            if categories.contains(&rule.category) || !(rule.matcher)(&view) {
                continue;
            }
            categories.push(rule.category);

            match (rule.extractor)(&view) {
                Ok(findings) => {
                    for finding in findings {
                        report.absorb(finding, &mut seen_ids);
                    }
                }
                Err(e) => {
                    warn!(request_id = %request.id, rule = rule.name, "extraction failed: {}", e);
                    report.diagnostics.push(EnrichmentDiagnostic {
                        request_id: request.id.clone(),
                        url: request.url.clone(),
                        rule: rule.name.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report.requests.push(RequestSummary {
            id: request.id.clone(),
            url: request.url.clone(),
            method: request.method.clone(),
            tab_id: request.tab_id,
            timestamp: request.timestamp,
            status: request.status_text(),
            vendor: vendor_for_url(&request.url).map(str::to_string),
            categories,
        });
    }

    debug!(
        requests = report.requests.len(),
        tam_requests = report.tam.bid_requests.len(),
        targeting = report.targeting.len(),
        creatives = report.creatives.len(),
        diagnostics = report.diagnostics.len(),
        "enrichment complete"
    );
    report
}

impl EnrichmentReport {
    fn absorb(&mut self, finding: Finding, seen_ids: &mut BTreeSet<(String, String)>) {
        match finding {
            Finding::TamBidRequest(bid) => self.tam.bid_requests.push(bid),
            Finding::TamBidReceived(bid) => self.tam.bids_received.push(bid),
            Finding::TamAdEvent(event) => self.tam.ad_events.push(event),
            Finding::Targeting(record) => {
                self.targeting.insert(record.key(), record);
            }
            Finding::Creative(detail) => self.creatives.push(detail),
            Finding::Identifiers(ids) => {
                for id in ids {
                    if seen_ids.insert((id.source.clone(), id.id.clone())) {
                        self.body_identifiers.push(id);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidlens_capture::{RequestBody, RequestStarted};

    fn capture(id: &str, url: &str, millis: f64) -> CapturedRequest {
        CapturedRequest::from_start(
            RequestStarted::new(id, url, "POST", TabId::new(1)).at(millis),
        )
    }

    #[test]
    fn test_first_rule_wins_per_category() {
        let request = capture(
            "1",
            "https://aax.amazon-adsystem.com/x/ns/abc?crid=5&sz=300x250",
            1.0,
        );
        let report = enrich(&[request]);

        assert_eq!(report.creatives.len(), 1);
        assert_eq!(report.tam.ad_events.len(), 1);
        assert_eq!(
            report.requests[0].categories,
            vec![Category::TamAdServing, Category::UrlTargeting, Category::Creative]
        );
    }

    #[test]
    fn test_later_rule_in_same_category_is_skipped() {
        fn always(_: &RequestView<'_>) -> bool {
            true
        }
        fn one_creative(view: &RequestView<'_>) -> crate::error::Result<Vec<Finding>> {
            crate::creative::extract_amazon_creative(view)
        }

        let rule = Rule {
            name: "catch_all",
            category: Category::Creative,
            matcher: always,
            extractor: one_creative,
        };
        let second = Rule {
            name: "catch_all_again",
            ..rule
        };

        let report = enrich_with(&[capture("1", "https://x.test/?crid=1", 1.0)], &[rule, second]);
        assert_eq!(report.creatives.len(), 1);
    }

    #[test]
    fn test_bad_tam_body_becomes_diagnostic() {
        let mut request = capture("1", "https://c.amazon-adsystem.com/e/dtb/bid", 1.0);
        request.request_body = Some(RequestBody::Raw {
            text: "{truncated".to_string(),
        });
        let good = capture("2", "https://ib.adnxs.com/ut/v3/prebid", 2.0);

        let report = enrich(&[request, good]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].rule, "tam_bid_request");
        assert_eq!(report.requests.len(), 2);
    }

    #[test]
    fn test_requests_sorted_and_labelled() {
        let later = capture("b", "https://ib.adnxs.com/ut/v3/prebid", 20.0);
        let earlier = capture("a", "https://hbopenbid.pubmatic.com/translator", 10.0);

        let report = enrich(&[later, earlier]);
        assert_eq!(report.requests[0].id.as_str(), "a");
        assert_eq!(report.requests[0].vendor.as_deref(), Some("PubMatic"));
        assert_eq!(report.requests[1].status, "Pending");
    }

    #[test]
    fn test_body_identifiers_deduplicated() {
        let body = r#"{"user": {"eids": [{"source": "pubcid.org", "uids": [{"id": "xyz"}]}]}}"#;
        let mut first = capture("1", "https://ib.adnxs.com/openrtb2", 1.0);
        first.request_body = Some(RequestBody::Raw {
            text: body.to_string(),
        });
        let mut second = first.clone();
        second.id = RequestId::from("2");

        let report = enrich(&[first, second]);
        assert_eq!(report.body_identifiers.len(), 1);
    }
}
