//! Declarative classification rules.
//!
//! A rule pairs a matcher with an extractor. Rules are grouped by
//! [`Category`]; within a category the first matching rule wins, while a
//! request may match rules from several categories.

use crate::creative::{self, CreativeDetail};
use crate::error::{ExtractError, Result};
use crate::query::QueryParams;
use crate::tam::{self, TamAdEvent, TamBid};
use crate::targeting::{self, TargetingRecord};
use bidlens_capture::{CapturedRequest, RequestBody};
use bidlens_page::UserIdentifier;
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a rule extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Amazon TAM bid requests
    TamBidRequest,
    /// Amazon ad-delivery events
    TamAdServing,
    /// Targeting carried in query parameters
    UrlTargeting,
    /// Targeting carried in JSON request bodies
    BodyTargeting,
    /// Creative ids and sizes of served ads
    Creative,
}

/// One extracted fact.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// A TAM slot was requested
    TamBidRequest(TamBid),
    /// A TAM slot carried an embedded bid response
    TamBidReceived(TamBid),
    /// An Amazon ad-delivery event
    TamAdEvent(TamAdEvent),
    /// Targeting parameters
    Targeting(TargetingRecord),
    /// A served creative
    Creative(CreativeDetail),
    /// User identifiers sent in a bid request
    Identifiers(Vec<UserIdentifier>),
}

/// A classification rule.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable rule name, used in diagnostics
    pub name: &'static str,
    /// Category the rule belongs to
    pub category: Category,
    /// Whether the rule applies to a request
    pub matcher: fn(&RequestView<'_>) -> bool,
    /// Facts the rule extracts from a matching request
    pub extractor: fn(&RequestView<'_>) -> Result<Vec<Finding>>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// The built-in rule set, in precedence order.
#[must_use]
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "tam_bid_request",
            category: Category::TamBidRequest,
            matcher: tam::is_bid_request,
            extractor: tam::extract_bid_request,
        },
        Rule {
            name: "tam_ad_serving",
            category: Category::TamAdServing,
            matcher: tam::is_ad_delivery,
            extractor: tam::extract_ad_event,
        },
        Rule {
            name: "url_targeting",
            category: Category::UrlTargeting,
            matcher: targeting::is_ad_serving_or_bid_request,
            extractor: targeting::extract_url_targeting,
        },
        Rule {
            name: "openrtb_body",
            category: Category::BodyTargeting,
            matcher: targeting::has_json_object_body,
            extractor: targeting::extract_body_targeting,
        },
        Rule {
            name: "gam_creative",
            category: Category::Creative,
            matcher: creative::is_gam_adview,
            extractor: creative::extract_gam_creative,
        },
        Rule {
            name: "amazon_creative",
            category: Category::Creative,
            matcher: tam::is_ad_delivery,
            extractor: creative::extract_amazon_creative,
        },
    ]
}

/// A captured request with lazily parsed query and body.
pub struct RequestView<'a> {
    /// The underlying capture
    pub request: &'a CapturedRequest,
    query: OnceCell<QueryParams>,
    body: OnceCell<Result<Option<Value>>>,
}

impl<'a> RequestView<'a> {
    /// Wrap a capture.
    #[must_use]
    pub fn new(request: &'a CapturedRequest) -> Self {
        Self {
            request,
            query: OnceCell::new(),
            body: OnceCell::new(),
        }
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.request.url
    }

    /// Parsed query parameters.
    pub fn query(&self) -> &QueryParams {
        self.query
            .get_or_init(|| QueryParams::from_url(&self.request.url))
    }

    /// Request body as JSON.
    ///
    /// Raw text is parsed; form fields become an object whose single-valued
    /// fields are strings. `Ok(None)` means there is no body.
    pub fn json_body(&self) -> Result<Option<&Value>> {
        self.body
            .get_or_init(|| parse_body(self.request.request_body.as_ref()))
            .as_ref()
            .map(Option::as_ref)
            .map_err(ExtractError::clone)
    }

    /// Whether the body parses to a JSON object.
    #[must_use]
    pub fn has_json_object_body(&self) -> bool {
        matches!(self.json_body(), Ok(Some(Value::Object(_))))
    }
}

fn parse_body(body: Option<&RequestBody>) -> Result<Option<Value>> {
    match body {
        None => Ok(None),
        Some(RequestBody::Raw { text }) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| ExtractError::InvalidJson(e.to_string())),
        Some(RequestBody::FormData { fields }) => {
            let object: Map<String, Value> = fields
                .iter()
                .map(|(name, values)| {
                    let value = match values.as_slice() {
                        [single] => Value::String(single.clone()),
                        many => Value::from(many.to_vec()),
                    };
                    (name.clone(), value)
                })
                .collect();
            Ok(Some(Value::Object(object)))
        }
        Some(RequestBody::DecodeError { message }) => {
            Err(ExtractError::BodyUnavailable(message.clone()))
        }
    }
}

/// JavaScript-style truthiness of a JSON value.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
