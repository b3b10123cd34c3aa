//! Targeting parameters sent to ad servers and bidders.

use crate::error::{ExtractError, Result};
use crate::rules::{truthy, Finding, RequestView};
use bidlens_core::RequestId;
use bidlens_page::UserIdentifier;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Curated ad-serving and bid endpoints whose query strings carry targeting.
static AD_SERVING_OR_BID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"doubleclick\.net/gampad/ads|aax\.amazon-adsystem\.com/|bid\.appnexus\.com|ads\.pubmatic\.com|openx\.net|rubiconproject\.com|criteo\.com/bid|lijit\.com",
    )
    .expect("ad-serving regex is hardcoded and valid")
});

/// Query parameters collected by exact name.
const KNOWN_URL_PARAMS: &[&str] = &[
    "iu_szs",
    "prev_iu_szs",
    "correlator",
    "gdpr",
    "gdpr_consent",
    "u_sd",
    "npa",
    "adx",
    "top_ssp",
];

/// Query parameters collected by prefix (header bidding, Amazon).
const KNOWN_URL_PREFIXES: &[&str] = &["hb_", "amzn_"];

/// Where targeting was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetingSource {
    /// Query string
    #[serde(rename = "URL")]
    Url,
    /// JSON request body
    Body,
}

impl fmt::Display for TargetingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url => f.write_str("URL"),
            Self::Body => f.write_str("Body"),
        }
    }
}

/// Targeting parameters extracted from one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetingRecord {
    /// Capture the parameters came from
    pub request_id: RequestId,
    /// Request URL
    pub url: String,
    /// Query string or body
    #[serde(rename = "type")]
    pub source: TargetingSource,
    /// Parameter name to value
    pub params: BTreeMap<String, Value>,
}

impl TargetingRecord {
    /// Report key: `URL: <url>` or `Body: <url>`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}: {}", self.source, self.url)
    }
}

pub(crate) fn is_ad_serving_or_bid_request(view: &RequestView<'_>) -> bool {
    AD_SERVING_OR_BID.is_match(view.url())
}

pub(crate) fn has_json_object_body(view: &RequestView<'_>) -> bool {
    view.has_json_object_body()
}

pub(crate) fn extract_url_targeting(view: &RequestView<'_>) -> Result<Vec<Finding>> {
    let mut params = BTreeMap::new();

    for (key, value) in view.query().iter() {
        if key == "cust_params" {
            match decode_cust_params(value) {
                Ok(pairs) => {
                    for (name, decoded) in pairs {
                        params.insert(format!("cust_{name}"), Value::String(decoded));
                    }
                }
                Err(e) => warn!(request_id = %view.request.id, "Skipping cust_params: {}", e),
            }
        } else if KNOWN_URL_PARAMS.contains(&key)
            || KNOWN_URL_PREFIXES.iter().any(|p| key.starts_with(p))
        {
            params.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    Ok(record(view, TargetingSource::Url, params)
        .into_iter()
        .collect())
}

pub(crate) fn extract_body_targeting(view: &RequestView<'_>) -> Result<Vec<Finding>> {
    let Some(Value::Object(body)) = view.json_body()? else {
        return Ok(Vec::new());
    };
    let mut params = BTreeMap::new();
    let mut findings = Vec::new();

    if let Some(Value::Object(ext)) = path(body, &["user", "ext"]) {
        for (key, value) in ext {
            params.insert(format!("user_ext_{key}"), value.clone());
        }
    }

    if let Some(geo) = path(body, &["device", "geo"]).filter(|g| truthy(g)) {
        for (field, name) in [("lat", "geo_lat"), ("lon", "geo_lon"), ("country", "geo_country")] {
            if let Some(value) = geo.get(field).filter(|v| !v.is_null()) {
                params.insert(name.to_string(), value.clone());
            }
        }
    }

    if let Some(cat) = path(body, &["site", "cat"]).filter(|c| truthy(c)) {
        params.insert("site_categories".to_string(), cat.clone());
    }
    if let Some(cat) = path(body, &["app", "cat"]).filter(|c| truthy(c)) {
        params.insert("app_categories".to_string(), cat.clone());
    }
    if let Some(gdpr) = path(body, &["regs", "ext", "gdpr"]).filter(|g| truthy(g)) {
        params.insert("gdpr_reg".to_string(), gdpr.clone());
    }

    if let Some(ids) = path(body, &["user", "eids"]).and_then(UserIdentifier::from_eids) {
        if !ids.is_empty() {
            let joined = ids
                .iter()
                .map(|id| format!("{}:{}", id.source, id.id))
                .collect::<Vec<_>>()
                .join(", ");
            params.insert("eids".to_string(), Value::String(joined));
            findings.push(Finding::Identifiers(ids));
        }
    }

    params.extend(tam_object_targeting(body));

    findings.extend(record(view, TargetingSource::Body, params));
    Ok(findings)
}

/// Targeting carried by a TAM request body: filtered `pubdata` keys plus
/// top-level consent fields.
#[must_use]
pub fn tam_request_targeting(body: &Value) -> BTreeMap<String, Value> {
    body.as_object()
        .map(tam_object_targeting)
        .unwrap_or_default()
}

fn tam_object_targeting(body: &Map<String, Value>) -> BTreeMap<String, Value> {
    let mut targeting = BTreeMap::new();

    let pubdata = match body.get("pubdata") {
        Some(Value::String(text)) => serde_json::from_str::<Value>(text).ok(),
        Some(value) => Some(value.clone()),
        None => None,
    };
    if let Some(Value::Object(pubdata)) = pubdata {
        for (key, value) in pubdata {
            if key.starts_with("hb_")
                || key.contains("segment")
                || key.contains("user_id")
                || key.contains("consent")
            {
                targeting.insert(key, value);
            }
        }
    }

    for field in ["gdpr", "consentString"] {
        if let Some(value) = body.get(field).filter(|v| truthy(v)) {
            targeting.insert(field.to_string(), value.clone());
        }
    }

    targeting
}

/// Decode a `cust_params` value: a `&`-joined list of `key=value` pairs that
/// is itself percent-encoded, with `+` standing for a space.
///
/// Pairs with an empty key or value are dropped.
pub fn decode_cust_params(value: &str) -> Result<Vec<(String, String)>> {
    let decode = |text: &str| {
        urlencoding::decode(text)
            .map(std::borrow::Cow::into_owned)
            .map_err(|e| ExtractError::Decode {
                field: "cust_params".to_string(),
                reason: e.to_string(),
            })
    };

    let list = decode(value)?.replace('+', " ");
    let mut pairs = Vec::new();
    for pair in list.split('&') {
        let Some((key, val)) = pair.split_once('=') else {
            continue;
        };
        if key.is_empty() || val.is_empty() {
            continue;
        }
        pairs.push((key.to_string(), decode(val)?));
    }
    Ok(pairs)
}

fn path<'v>(object: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v Value> {
    let (first, rest) = keys.split_first()?;
    rest.iter()
        .try_fold(object.get(*first)?, |value, key| value.get(key))
}

fn record(
    view: &RequestView<'_>,
    source: TargetingSource,
    params: BTreeMap<String, Value>,
) -> Option<Finding> {
    if params.is_empty() {
        return None;
    }
    Some(Finding::Targeting(TargetingRecord {
        request_id: view.request.id.clone(),
        url: view.request.url.clone(),
        source,
        params,
    }))
}
