//! BidLens Enrich - Correlation and enrichment of captured ad traffic.
//!
//! Turns a snapshot of captured requests into structured views: Amazon TAM
//! bid requests and ad-delivery events, targeting parameters found in query
//! strings and OpenRTB bodies, served creatives, and vendor labels. The
//! [`identity`] module locates user identifiers in cookies and web storage.
//!
//! Classification is an ordered list of declarative [`Rule`]s. Extraction
//! failures never abort a pass; they surface as
//! [`EnrichmentDiagnostic`]s.
//!
//! # Example
//!
//! ```rust
//! use bidlens_capture::{CapturedRequest, RequestStarted};
//! use bidlens_core::TabId;
//! use bidlens_enrich::enrich;
//!
//! let request = CapturedRequest::from_start(RequestStarted::new(
//!     "1",
//!     "https://securepubads.g.doubleclick.net/gampad/ads?cust_params=seg%3Dsports",
//!     "GET",
//!     TabId::new(1),
//! ));
//!
//! let report = enrich(&[request]);
//! assert_eq!(report.targeting.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod creative;
pub mod error;
pub mod identity;
pub mod query;
pub mod report;
pub mod rules;
pub mod tam;
pub mod targeting;
pub mod vendors;

pub use creative::{CreativeDetail, CreativePlatform};
pub use error::{ExtractError, Result};
pub use identity::{
    match_identifiers, merge_identifiers, Cookie, IdentityMatch, MatchLocation, MatchOptions,
};
pub use query::QueryParams;
pub use report::{
    enrich, enrich_with, EnrichmentDiagnostic, EnrichmentReport, RequestSummary, TamReport,
};
pub use rules::{default_rules, Category, Finding, RequestView, Rule};
pub use tam::{TamAdEvent, TamBid};
pub use targeting::{decode_cust_params, tam_request_targeting, TargetingRecord, TargetingSource};
pub use vendors::vendor_for_url;
