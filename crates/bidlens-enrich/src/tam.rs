//! Amazon Transparent Ad Marketplace (TAM) traffic.
//!
//! TAM bids are mostly decided server-to-server, so the browser only sees
//! the bid request (`/e/dtb/bid`) and, after the auction, ad-delivery calls
//! to `aax.amazon-adsystem.com/.../x/ns/...`.

use crate::error::Result;
use crate::rules::{Finding, RequestView};
use crate::targeting::tam_request_targeting;
use bidlens_core::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const BID_ENDPOINT: &str = "amazon-adsystem.com/e/dtb/bid";
const DELIVERY_HOST: &str = "aax.amazon-adsystem.com/";
const DELIVERY_PATH: &str = "/x/ns/";

/// Status of a slot that was only requested.
pub const STATUS_REQUESTED: &str = "Requested";

/// A TAM slot, either requested or carrying an embedded response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TamBid {
    /// Capture the slot came from
    pub request_id: RequestId,
    /// Bid request URL
    pub url: String,
    /// Slot id
    pub ad_unit_code: Option<String>,
    /// Always `amazon`
    pub bidder: String,
    /// Price, when a response was embedded
    pub cpm: Option<f64>,
    /// Currency, when a response was embedded
    pub currency: Option<String>,
    /// `WxH`, when a response was embedded
    pub size: Option<String>,
    /// Creative id, when a response was embedded
    pub creative_id: Option<String>,
    /// `Requested` or `Bid Received (Video|Display)`
    pub status_message: String,
    /// Targeting found in the request body
    pub targeting: BTreeMap<String, Value>,
}

/// An Amazon ad-delivery event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TamAdEvent {
    /// Capture the event came from
    pub request_id: RequestId,
    /// Delivery URL
    pub url: String,
    /// Always `Ad Served`
    pub event_type: String,
    /// `slotID` parameter
    pub ad_unit_code: Option<String>,
    /// `sz` parameter
    pub size: Option<String>,
    /// `crid` parameter
    pub creative_id: Option<String>,
    /// Every query parameter
    pub raw_query_params: BTreeMap<String, String>,
}

pub(crate) fn is_bid_request(view: &RequestView<'_>) -> bool {
    view.url().contains(BID_ENDPOINT)
        && view.request.is_post()
        && view.request.request_body.is_some()
}

pub(crate) fn is_ad_delivery(view: &RequestView<'_>) -> bool {
    view.url().contains(DELIVERY_HOST) && view.url().contains(DELIVERY_PATH)
}

pub(crate) fn extract_bid_request(view: &RequestView<'_>) -> Result<Vec<Finding>> {
    let Some(body) = view.json_body()? else {
        return Ok(Vec::new());
    };
    let Some(slots) = body.get("slots").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let targeting = tam_request_targeting(body);
    let mut findings = Vec::with_capacity(slots.len());

    for slot in slots {
        let requested = TamBid {
            request_id: view.request.id.clone(),
            url: view.request.url.clone(),
            ad_unit_code: slot.get("slotID").and_then(text),
            bidder: "amazon".to_string(),
            cpm: None,
            currency: None,
            size: None,
            creative_id: None,
            status_message: STATUS_REQUESTED.to_string(),
            targeting: targeting.clone(),
        };

        let received = embedded_response(slot).map(|(kind, response)| TamBid {
            cpm: response.get("cpm").and_then(number),
            currency: response.get("currency").and_then(text),
            size: size_of(response),
            creative_id: response.get("creativeId").and_then(text),
            status_message: format!("Bid Received ({kind})"),
            ..requested.clone()
        });

        findings.push(Finding::TamBidRequest(requested));
        if let Some(received) = received {
            findings.push(Finding::TamBidReceived(received));
        }
    }

    Ok(findings)
}

pub(crate) fn extract_ad_event(view: &RequestView<'_>) -> Result<Vec<Finding>> {
    let params = view.query();
    Ok(vec![Finding::TamAdEvent(TamAdEvent {
        request_id: view.request.id.clone(),
        url: view.request.url.clone(),
        event_type: "Ad Served".to_string(),
        ad_unit_code: params.first_of(&["slotID"]).map(str::to_string),
        size: params.first_of(&["sz"]).map(str::to_string),
        creative_id: params.first_of(&["crid"]).map(str::to_string),
        raw_query_params: params.to_map(),
    })])
}

/// Video takes precedence over display.
fn embedded_response(slot: &Value) -> Option<(&'static str, &Value)> {
    let media = slot.get("mediaType")?;
    [("Video", "video"), ("Display", "display")]
        .into_iter()
        .find_map(|(label, key)| {
            media
                .get(key)
                .and_then(|m| m.get("response"))
                .filter(|r| !r.is_null())
                .map(|r| (label, r))
        })
}

fn size_of(response: &Value) -> Option<String> {
    let width = response.get("width").and_then(text)?;
    let height = response.get("height").and_then(text)?;
    Some(format!("{width}x{height}"))
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(match n.as_f64() {
            // integral floats print without a fraction
            Some(f) if n.is_f64() && f.fract().abs() < f64::EPSILON && f.abs() < 1e15 => {
                format!("{f:.0}")
            }
            _ => n.to_string(),
        }),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidlens_capture::{CapturedRequest, RequestBody, RequestStarted};
    use bidlens_core::TabId;
    use serde_json::json;

    fn bid_request(body: &Value) -> CapturedRequest {
        let mut request = CapturedRequest::from_start(RequestStarted::new(
            "7",
            "https://c.amazon-adsystem.com/e/dtb/bid?src=3288&pid=x",
            "POST",
            TabId::new(1),
        ));
        request.request_body = Some(RequestBody::Raw {
            text: body.to_string(),
        });
        request
    }

    #[test]
    fn test_video_response_wins_over_display() {
        let request = bid_request(&json!({"slots": [{
            "slotID": "video-1",
            "mediaType": {
                "video": {"response": {"cpm": 4.0, "currency": "USD", "width": 640, "height": 480, "creativeId": "v"}},
                "display": {"response": {"cpm": 1.0, "currency": "USD", "width": 300, "height": 250, "creativeId": "d"}}
            }
        }]}));

        let findings = extract_bid_request(&RequestView::new(&request)).expect("extract");
        assert_eq!(findings.len(), 2);
        match &findings[1] {
            Finding::TamBidReceived(bid) => {
                assert_eq!(bid.status_message, "Bid Received (Video)");
                assert_eq!(bid.size.as_deref(), Some("640x480"));
                assert_eq!(bid.creative_id.as_deref(), Some("v"));
            }
            other => panic!("expected received bid, got {other:?}"),
        }
    }

    #[test]
    fn test_float_dimensions_render_as_integers() {
        assert_eq!(
            size_of(&json!({"width": 300.0, "height": 250.0})).as_deref(),
            Some("300x250")
        );
        assert_eq!(
            size_of(&json!({"width": 320.5, "height": "50"})).as_deref(),
            Some("320.5x50")
        );
    }

    #[test]
    fn test_slots_without_response_are_requests_only() {
        let request = bid_request(&json!({"slots": [{"slotID": "a"}, {"slotID": "b"}], "gdpr": 1}));
        let findings = extract_bid_request(&RequestView::new(&request)).expect("extract");

        assert_eq!(findings.len(), 2);
        for finding in findings {
            match finding {
                Finding::TamBidRequest(bid) => {
                    assert_eq!(bid.status_message, STATUS_REQUESTED);
                    assert_eq!(bid.targeting.get("gdpr"), Some(&json!(1)));
                }
                other => panic!("expected request, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_slots_is_empty() {
        let request = bid_request(&json!({"pubid": "x"}));
        assert!(extract_bid_request(&RequestView::new(&request))
            .expect("extract")
            .is_empty());
    }

    #[test]
    fn test_get_is_not_a_bid_request() {
        let mut request = bid_request(&json!({"slots": []}));
        request.method = "GET".to_string();
        assert!(!is_bid_request(&RequestView::new(&request)));
    }

    #[test]
    fn test_ad_event() {
        let request = CapturedRequest::from_start(RequestStarted::new(
            "9",
            "https://aax.amazon-adsystem.com/x/ns/abc?slotID=div-2&sz=728x90&crid=777",
            "GET",
            TabId::new(1),
        ));
        let view = RequestView::new(&request);
        assert!(is_ad_delivery(&view));

        let findings = extract_ad_event(&view).expect("extract");
        match &findings[0] {
            Finding::TamAdEvent(event) => {
                assert_eq!(event.event_type, "Ad Served");
                assert_eq!(event.ad_unit_code.as_deref(), Some("div-2"));
                assert_eq!(event.size.as_deref(), Some("728x90"));
                assert_eq!(event.creative_id.as_deref(), Some("777"));
                assert_eq!(event.raw_query_params.len(), 3);
            }
            other => panic!("expected ad event, got {other:?}"),
        }
    }
}
