//! Integration tests for the enrichment pass
//!
//! Feeds captures through a real store so the input looks exactly like what
//! the inspector hands over.

use bidlens_capture::{
    CaptureStore, Completed, HostRequestBody, InMemoryCaptureStore, RequestStarted,
};
use bidlens_core::TabId;
use bidlens_enrich::{enrich, match_identifiers, MatchLocation, MatchOptions, TargetingSource};
use bidlens_page::{StorageSnapshot, UserIdentifier};
use serde_json::json;

const TAB: TabId = TabId::new(3);

fn store_with(events: Vec<RequestStarted>) -> InMemoryCaptureStore {
    let store = InMemoryCaptureStore::new();
    for event in events {
        let id = event.request_id.clone();
        store.on_request_start(event);
        store.on_completed(Completed::new(id).with_status(200, "HTTP/1.1 200 OK"));
    }
    store
}

fn tam_bid_request() -> RequestStarted {
    let body = r#"{"slots":[{"slotID":"div-1","mediaType":{"display":{"response":{"cpm":1.5,"currency":"USD","width":300,"height":250,"creativeId":"abc"}}}}]}"#;
    RequestStarted::new(
        "100",
        "https://c.amazon-adsystem.com/e/dtb/bid?src=3288",
        "POST",
        TAB,
    )
    .at(1_700_000_000_000.0)
    .with_body(HostRequestBody::raw_bytes(body.as_bytes().to_vec()))
}

#[test]
fn test_tam_display_bid() {
    let store = store_with(vec![tam_bid_request()]);
    let report = enrich(&store.query(TAB));

    assert_eq!(report.tam.bid_requests.len(), 1);
    assert_eq!(report.tam.bid_requests[0].ad_unit_code.as_deref(), Some("div-1"));

    assert_eq!(report.tam.bids_received.len(), 1);
    let received = &report.tam.bids_received[0];
    assert_eq!(received.cpm, Some(1.5));
    assert_eq!(received.size.as_deref(), Some("300x250"));
    assert_eq!(received.creative_id.as_deref(), Some("abc"));
    assert!(received.status_message.contains("Display"));
}

#[test]
fn test_cust_params_targeting() {
    let store = store_with(vec![RequestStarted::new(
        "200",
        "https://securepubads.g.doubleclick.net/gampad/ads?iu_szs=300x250&cust_params=seg%3Dsports%26city%3DNYC",
        "GET",
        TAB,
    )]);
    let report = enrich(&store.query(TAB));

    let record = report
        .targeting
        .values()
        .find(|r| r.source == TargetingSource::Url)
        .expect("URL targeting");
    assert_eq!(record.params.get("cust_seg"), Some(&json!("sports")));
    assert_eq!(record.params.get("cust_city"), Some(&json!("NYC")));
    assert_eq!(record.params.get("iu_szs"), Some(&json!("300x250")));
    assert!(report
        .targeting
        .contains_key("URL: https://securepubads.g.doubleclick.net/gampad/ads?iu_szs=300x250&cust_params=seg%3Dsports%26city%3DNYC"));
}

#[test]
fn test_enrichment_is_idempotent() {
    let openrtb = r#"{"user":{"ext":{"consent":"CP"},"eids":[{"source":"pubcid.org","uids":[{"id":"xyz"}]}]},"regs":{"ext":{"gdpr":1}}}"#;
    let events = vec![
        tam_bid_request(),
        RequestStarted::new(
            "101",
            "https://ib.adnxs.com/openrtb2/prebid",
            "POST",
            TAB,
        )
        .at(1_700_000_000_010.0)
        .with_body(HostRequestBody::raw_bytes(openrtb.as_bytes().to_vec())),
        RequestStarted::new(
            "102",
            "https://aax.amazon-adsystem.com/x/ns/abc?slotID=div-1&sz=300x250&crid=abc",
            "GET",
            TAB,
        )
        .at(1_700_000_000_020.0),
        RequestStarted::new(
            "103",
            "https://hbopenbid.pubmatic.com/translator",
            "POST",
            TAB,
        )
        .at(1_700_000_000_030.0)
        .with_body(HostRequestBody::raw_bytes(b"not json at all".to_vec())),
    ];
    let store = store_with(events);

    let snapshot = store.query(TAB);
    let mut reversed = snapshot.clone();
    reversed.reverse();

    let first = serde_json::to_string(&enrich(&snapshot)).expect("serialize report");
    let second = serde_json::to_string(&enrich(&snapshot)).expect("serialize report");
    let third = serde_json::to_string(&enrich(&reversed)).expect("serialize report");
    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn test_non_json_body_does_not_abort_others() {
    let store = store_with(vec![
        RequestStarted::new("1", "https://hbopenbid.pubmatic.com/translator", "POST", TAB)
            .at(1.0)
            .with_body(HostRequestBody::raw_bytes(b"a=b&c=d".to_vec())),
        tam_bid_request(),
    ]);
    let report = enrich(&store.query(TAB));

    assert!(report.diagnostics.is_empty());
    assert_eq!(report.tam.bid_requests.len(), 1);
    assert_eq!(report.requests.len(), 2);
}

#[test]
fn test_body_identifiers_feed_identity_matcher() {
    let openrtb = json!({"user": {"eids": [{"source": "pubcid", "uids": [{"id": "xyz"}]}]}});
    let store = store_with(vec![RequestStarted::new(
        "1",
        "https://ib.adnxs.com/openrtb2/prebid",
        "POST",
        TAB,
    )
    .with_body(HostRequestBody::raw_bytes(openrtb.to_string().into_bytes()))]);
    let report = enrich(&store.query(TAB));
    assert_eq!(report.body_identifiers, vec![UserIdentifier::new("pubcid", "xyz")]);

    let cookies = vec![bidlens_enrich::Cookie::new("_pubcid", "xyz", ".example.com")];
    let matches = match_identifiers(
        &report.body_identifiers,
        &cookies,
        &StorageSnapshot::default(),
        &MatchOptions::default(),
    );
    assert!(matches!(matches[0].location, MatchLocation::Cookie { ref name, .. } if name == "_pubcid"));

    let unmatched = match_identifiers(
        &report.body_identifiers,
        &[bidlens_enrich::Cookie::new("session", "1", ".example.com")],
        &StorageSnapshot::default(),
        &MatchOptions::default(),
    );
    assert_eq!(unmatched[0].location, MatchLocation::NotFound);
}

#[test]
fn test_bad_cust_params_does_not_drop_request_targeting() {
    let url = "https://securepubads.g.doubleclick.net/gampad/ads?cust_params=seg%3D%2525FF&hb_bidder=appnexus&gdpr=1";
    let store = store_with(vec![RequestStarted::new("300", url, "GET", TAB)]);
    let report = enrich(&store.query(TAB));

    assert!(report.diagnostics.is_empty());
    let record = report
        .targeting
        .get(&format!("URL: {url}"))
        .expect("URL targeting");
    assert_eq!(record.params.get("hb_bidder"), Some(&json!("appnexus")));
    assert_eq!(record.params.get("gdpr"), Some(&json!("1")));
}
