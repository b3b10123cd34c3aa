//! Auction library state: typed views over the header-bidding library's
//! accessors plus derived bid statistics.

use crate::context::{AuctionAccessor, PageContext};
use crate::error::{PageError, Result};
use crate::lenient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Status message the library assigns to bids that missed the auction timeout.
pub const TIMED_OUT_STATUS: &str = "Bid timed out";

/// Reason reported when the library never appeared.
pub const LIBRARY_NOT_FOUND: &str = "Prebid.js global object (pbjs) not found on page.";

/// Result of reading the auction library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuctionState {
    /// The library is absent or could not be read
    Unavailable {
        /// Human-readable explanation
        reason: String,
    },
    /// The library was read successfully
    Available(AuctionSnapshot),
}

impl AuctionState {
    /// The snapshot, when available.
    #[must_use]
    pub fn snapshot(&self) -> Option<&AuctionSnapshot> {
        match self {
            Self::Available(snapshot) => Some(snapshot),
            Self::Unavailable { .. } => None,
        }
    }

    /// Whether the library was found and read.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// Everything read from the auction library at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSnapshot {
    /// Configured ad units
    pub ad_units: Vec<AdUnit>,
    /// Ad-server targeting, ad unit code to key/value pairs
    pub targeting: BTreeMap<String, BTreeMap<String, Value>>,
    /// Bids that won their ad unit
    pub winning_bids: Vec<Bid>,
    /// Bid responses grouped by ad unit code
    pub bid_responses: BTreeMap<String, BidResponseGroup>,
    /// Library configuration
    pub config: Map<String, Value>,
    /// User identifiers exposed as eIDs
    pub user_ids: Vec<UserIdentifier>,
    /// Consent state (GDPR, USP, GPP)
    pub consent: Map<String, Value>,
    /// Statistics derived from `bid_responses`
    pub stats: AuctionStats,
}

/// An ad unit as configured on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdUnit {
    /// Ad unit code (usually the slot's element id)
    #[serde(deserialize_with = "lenient::text")]
    pub code: String,
    /// Media type configuration (banner sizes, video player settings)
    pub media_types: Value,
    /// Bidders configured for the unit
    #[serde(deserialize_with = "lenient::items")]
    pub bids: Vec<AdUnitBidder>,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A bidder configured on an ad unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdUnitBidder {
    /// Bidder code
    #[serde(deserialize_with = "lenient::text")]
    pub bidder: String,
    /// Bidder-specific parameters
    pub params: Value,
}

/// A single bid response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Bid {
    /// Bidder code
    #[serde(deserialize_with = "lenient::text")]
    pub bidder: String,
    /// Ad unit the bid is for
    #[serde(deserialize_with = "lenient::opt_text")]
    pub ad_unit_code: Option<String>,
    /// Price in `currency` per thousand impressions
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub cpm: Option<f64>,
    /// ISO currency code
    #[serde(deserialize_with = "lenient::opt_text")]
    pub currency: Option<String>,
    /// Creative width
    #[serde(deserialize_with = "lenient::opt_integer")]
    pub width: Option<u32>,
    /// Creative height
    #[serde(deserialize_with = "lenient::opt_integer")]
    pub height: Option<u32>,
    /// Size as `WxH`
    #[serde(deserialize_with = "lenient::opt_text")]
    pub size: Option<String>,
    /// Library-assigned ad id
    #[serde(deserialize_with = "lenient::opt_text")]
    pub ad_id: Option<String>,
    /// Bidder's creative id
    pub creative_id: Option<Value>,
    /// Library status, e.g. `Bid available` or `Bid timed out`
    #[serde(deserialize_with = "lenient::opt_text")]
    pub status_message: Option<String>,
    /// Response latency in milliseconds
    #[serde(deserialize_with = "lenient::opt_integer")]
    pub time_to_respond: Option<u64>,
    /// Media type of the bid
    #[serde(deserialize_with = "lenient::opt_text")]
    pub media_type: Option<String>,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Bid responses for one ad unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BidResponseGroup {
    /// Bids received for the unit
    #[serde(deserialize_with = "lenient::items")]
    pub bids: Vec<Bid>,
}

/// A user identifier (eID): a recognition token from an identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentifier {
    /// Identity provider, e.g. `pubcid.org`
    pub source: String,
    /// Identifier value
    pub id: String,
    /// Extension type label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_type: Option<String>,
    /// Extension data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_data: Option<Value>,
}

impl UserIdentifier {
    /// Create an identifier without extension data.
    #[must_use]
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
            ext_type: None,
            ext_data: None,
        }
    }

    /// Read an eID list.
    ///
    /// Accepts both the flat `{source, id, ext}` shape and the OpenRTB
    /// `{source, uids: [{id, atype, ext}]}` shape; entries without a source or
    /// id are skipped. Returns `None` when `value` is not an array.
    #[must_use]
    pub fn from_eids(value: &Value) -> Option<Vec<Self>> {
        let entries = value.as_array()?;
        let mut ids = Vec::new();

        for entry in entries {
            let Some(source) = entry.get("source").and_then(Value::as_str) else {
                continue;
            };
            let entry_ext = entry.get("ext");

            if let Some(id) = entry.get("id").and_then(scalar_text) {
                ids.push(Self::with_ext(source, id, entry_ext));
            }

            for uid in entry.get("uids").and_then(Value::as_array).into_iter().flatten() {
                if let Some(id) = uid.get("id").and_then(scalar_text) {
                    ids.push(Self::with_ext(source, id, uid.get("ext").or(entry_ext)));
                }
            }
        }

        Some(ids)
    }

    fn with_ext(source: &str, id: String, ext: Option<&Value>) -> Self {
        Self {
            source: source.to_string(),
            id,
            ext_type: ext
                .and_then(|e| e.get("type"))
                .and_then(Value::as_str)
                .map(str::to_string),
            ext_data: ext.and_then(|e| e.get("data")).cloned(),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Statistics over every bid in every bid-response group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionStats {
    /// Number of bids
    pub total_bids: usize,
    /// Number of distinct bidders
    pub unique_bidders: usize,
    /// Status message to number of bids carrying it
    pub bid_status_counts: BTreeMap<String, usize>,
    /// Bidders with at least one timed-out bid, in first-seen order
    pub timed_out_bidders: Vec<String>,
}

impl AuctionStats {
    /// Compute statistics over all groups.
    #[must_use]
    pub fn from_responses(responses: &BTreeMap<String, BidResponseGroup>) -> Self {
        let mut stats = Self::default();
        let mut bidders = BTreeSet::new();

        for bid in responses.values().flat_map(|group| &group.bids) {
            stats.total_bids += 1;
            bidders.insert(bid.bidder.as_str());

            let status = bid.status_message.as_deref().unwrap_or("unknown");
            *stats.bid_status_counts.entry(status.to_string()).or_insert(0) += 1;

            if status == TIMED_OUT_STATUS && !stats.timed_out_bidders.contains(&bid.bidder) {
                stats.timed_out_bidders.push(bid.bidder.clone());
            }
        }

        stats.unique_bidders = bidders.len();
        stats
    }
}

/// Read every accessor and assemble the snapshot.
///
/// Any accessor failure, or a payload that does not have the expected shape,
/// degrades to [`AuctionState::Unavailable`] with the cause.
pub async fn extract_auction<P: PageContext + ?Sized>(page: &P) -> AuctionState {
    match read_snapshot(page).await {
        Ok(snapshot) => {
            debug!(
                ad_units = snapshot.ad_units.len(),
                total_bids = snapshot.stats.total_bids,
                "read auction library state"
            );
            AuctionState::Available(snapshot)
        }
        Err(e) => {
            warn!("Failed to read auction library: {}", e);
            AuctionState::Unavailable {
                reason: format!("Error reading Prebid.js data: {e}. Is pbjs_debug=true?"),
            }
        }
    }
}

async fn read_snapshot<P: PageContext + ?Sized>(page: &P) -> Result<AuctionSnapshot> {
    let ad_units = read_list(page, AuctionAccessor::AdUnits).await?;
    let targeting = read_typed(page, AuctionAccessor::AdserverTargeting).await?;
    let winning_bids = read_list(page, AuctionAccessor::AllWinningBids).await?;
    let bid_responses: BTreeMap<String, BidResponseGroup> =
        read_typed(page, AuctionAccessor::BidResponses).await?;
    let config = read_typed(page, AuctionAccessor::Config).await?;
    let consent = read_typed(page, AuctionAccessor::UserConsent).await?;

    let user_ids = match page.read_auction(AuctionAccessor::UserIdsAsEids).await? {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => UserIdentifier::from_eids(&value).ok_or_else(|| {
            PageError::AccessorFailed {
                accessor: AuctionAccessor::UserIdsAsEids.name().to_string(),
                message: "expected an array of eIDs".to_string(),
            }
        })?,
    };

    let stats = AuctionStats::from_responses(&bid_responses);

    Ok(AuctionSnapshot {
        ad_units,
        targeting,
        winning_bids,
        bid_responses,
        config,
        user_ids,
        consent,
        stats,
    })
}

/// Read an accessor, treating an undefined accessor as the empty default.
async fn read_typed<T, P>(page: &P, accessor: AuctionAccessor) -> Result<T>
where
    T: DeserializeOwned + Default,
    P: PageContext + ?Sized,
{
    match page.read_auction(accessor).await? {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| PageError::AccessorFailed {
            accessor: accessor.name().to_string(),
            message: e.to_string(),
        }),
    }
}

/// Read an array accessor, dropping entries that are not objects of the
/// expected shape.
async fn read_list<T, P>(page: &P, accessor: AuctionAccessor) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: PageContext + ?Sized,
{
    match page.read_auction(accessor).await? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => Ok(lenient::from_values(values)),
        Some(_) => Err(PageError::AccessorFailed {
            accessor: accessor.name().to_string(),
            message: "expected an array".to_string(),
        }),
    }
}
