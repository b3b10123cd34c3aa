//! Integration tests for the inspection pipeline
//!
//! Runs against a real in-memory store, fixture pages and paused tokio time.

use bidlens_capture::{
    CaptureStore, Completed, HostRequestBody, InMemoryCaptureStore, RequestStarted,
};
use bidlens_core::{BidlensConfig, TabId};
use bidlens_enrich::{Cookie, MatchLocation};
use bidlens_inspector::{
    CookieJar, Inspector, InspectorOptions, RunOutcome, StaticCookieJar, UnavailableCookieJar,
};
use bidlens_page::{FixturePage, PageContext, TokioClock};
use serde_json::json;
use std::sync::Arc;

const TAB: TabId = TabId::new(7);
const OTHER_TAB: TabId = TabId::new(8);

const PAGE_FIXTURE: &str = r#"{
    "auction": {
        "getBidResponses": {"div-1": {"bids": [
            {"bidder": "appnexus", "cpm": 1.2, "statusMessage": "Bid available"}
        ]}},
        "getUserIdsAsEids": [{"source": "id5-sync.com", "uids": [{"id": "ID5*abc"}]}]
    },
    "localStorage": {"_pubcid": "xyz"}
}"#;

fn populated_store() -> Arc<InMemoryCaptureStore> {
    let tam_body = r#"{"slots":[{"slotID":"div-1","mediaType":{"display":{"response":{"cpm":1.5,"currency":"USD","width":300,"height":250,"creativeId":"abc"}}}}]}"#;
    let openrtb = json!({"user": {"eids": [
        {"source": "id5-sync.com", "uids": [{"id": "ID5*abc"}]},
        {"source": "pubcid", "uids": [{"id": "xyz"}]}
    ]}});

    let store = Arc::new(InMemoryCaptureStore::new());
    for event in [
        RequestStarted::new("1", "https://c.amazon-adsystem.com/e/dtb/bid?src=3288", "POST", TAB)
            .at(1_700_000_000_000.0)
            .with_body(HostRequestBody::raw_bytes(tam_body.as_bytes().to_vec())),
        RequestStarted::new("2", "https://ib.adnxs.com/openrtb2/prebid", "POST", TAB)
            .at(1_700_000_000_010.0)
            .with_body(HostRequestBody::raw_bytes(openrtb.to_string().into_bytes())),
        RequestStarted::new("3", "https://hbopenbid.pubmatic.com/translator", "POST", OTHER_TAB)
            .at(1_700_000_000_020.0),
    ] {
        let id = event.request_id.clone();
        store.on_request_start(event);
        store.on_completed(Completed::new(id).with_status(200, "HTTP/1.1 200 OK"));
    }
    store
}

fn inspector_with(
    store: Arc<InMemoryCaptureStore>,
    page: FixturePage,
    cookies: Arc<dyn CookieJar>,
    options: InspectorOptions,
) -> Inspector {
    let page: Arc<dyn PageContext> = Arc::new(page);
    Inspector::new(store, page, cookies, Arc::new(TokioClock::new()), options)
}

fn id5_cookie() -> Arc<dyn CookieJar> {
    Arc::new(StaticCookieJar::new(vec![Cookie::new(
        "id5",
        "ID5*abc",
        ".example.com",
    )]))
}

#[tokio::test(start_paused = true)]
async fn test_full_run() {
    let inspector = inspector_with(
        populated_store(),
        FixturePage::from_json(PAGE_FIXTURE).expect("valid fixture"),
        id5_cookie(),
        InspectorOptions::default(),
    );

    let report = inspector
        .run(TAB)
        .await
        .into_report()
        .expect("run completes");

    assert_eq!(report.tab_id, TAB);
    assert!(report.auction.is_available());
    assert_eq!(report.collection.attempts, 1);
    assert_eq!(report.captures.len(), 2);
    assert_eq!(report.enrichment.tam.bids_received.len(), 1);

    let locations: Vec<(&str, &MatchLocation)> = report
        .identities
        .iter()
        .map(|m| (m.source.as_str(), &m.location))
        .collect();
    assert_eq!(
        locations,
        vec![
            (
                "id5-sync.com",
                &MatchLocation::Cookie {
                    name: "id5".to_string(),
                    domain: ".example.com".to_string()
                }
            ),
            (
                "pubcid",
                &MatchLocation::LocalStorage {
                    key: "_pubcid".to_string()
                }
            ),
        ]
    );

    assert_eq!(
        report.summary.status_text(),
        "Data collected. Prebid.js: Yes. TAM: Yes. Network Requests: 2. IDs: Yes."
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_cookie_lookup_degrades_to_empty() {
    let inspector = inspector_with(
        populated_store(),
        FixturePage::from_json(PAGE_FIXTURE).expect("valid fixture"),
        Arc::new(UnavailableCookieJar),
        InspectorOptions::default(),
    );

    let report = inspector
        .run(TAB)
        .await
        .into_report()
        .expect("run completes");

    assert!(report.cookies.is_empty());
    let id5 = report
        .identities
        .iter()
        .find(|m| m.source == "id5-sync.com")
        .expect("id5 identity");
    assert_eq!(id5.location, MatchLocation::NotFound);
    assert_eq!(id5.matched_value, None);
}

#[tokio::test(start_paused = true)]
async fn test_empty_page_reports_nothing() {
    let inspector = inspector_with(
        Arc::new(InMemoryCaptureStore::new()),
        FixturePage::default(),
        Arc::new(StaticCookieJar::empty()),
        InspectorOptions::default(),
    );

    let report = inspector
        .run(TAB)
        .await
        .into_report()
        .expect("run completes");

    assert!(!report.auction.is_available());
    assert_eq!(report.collection.waited_ms, 2000);
    assert!(report.summary.is_empty());
    assert_eq!(
        report.summary.status_text(),
        "Data collected. Network Requests: None."
    );
}

#[tokio::test(start_paused = true)]
async fn test_serialized_triggers_skip_overlap() {
    let options = InspectorOptions {
        serialize_triggers: true,
        ..InspectorOptions::default()
    };
    let inspector = inspector_with(
        populated_store(),
        FixturePage::default(),
        Arc::new(StaticCookieJar::empty()),
        options,
    );

    let (first, second) = tokio::join!(inspector.run(TAB), inspector.run(TAB));
    assert!(matches!(first, RunOutcome::Completed(_)));
    assert_eq!(second, RunOutcome::Skipped);

    assert!(inspector.run(TAB).await.report().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_triggers_run_independently_by_default() {
    let inspector = inspector_with(
        populated_store(),
        FixturePage::default(),
        Arc::new(StaticCookieJar::empty()),
        InspectorOptions::default(),
    );

    let (first, second) = tokio::join!(inspector.run(TAB), inspector.run(TAB));
    let first = first.into_report().expect("first completes");
    let second = second.into_report().expect("second completes");
    assert_ne!(first.trigger_id, second.trigger_id);
}

#[tokio::test(start_paused = true)]
async fn test_clear_and_rerun_only_touches_tab() {
    let store = populated_store();
    let inspector = inspector_with(
        Arc::clone(&store),
        FixturePage::from_json(PAGE_FIXTURE).expect("valid fixture"),
        Arc::new(StaticCookieJar::empty()),
        InspectorOptions::default(),
    );

    let report = inspector
        .clear_and_rerun(TAB)
        .await
        .into_report()
        .expect("run completes");

    assert!(report.captures.is_empty());
    assert_eq!(report.summary.network_request_count, 0);
    assert_eq!(store.query(OTHER_TAB).len(), 1);
}

#[test]
fn test_options_from_config() {
    let mut config = BidlensConfig::default();
    config.collector.wait_ms = 500;
    config.collector.serialize_triggers = true;
    config.identity.value_preview_chars = 20;

    let options = InspectorOptions::from(&config);
    assert_eq!(options.collector.wait.as_millis(), 500);
    assert!(options.serialize_triggers);
    assert_eq!(options.matcher.value_preview_chars, 20);
}
