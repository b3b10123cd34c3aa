//! BidLens Page - Page-context collection for the inspected tab.
//!
//! On each trigger the collector waits a bounded time for the page's
//! header-bidding library (Prebid.js) to appear, reads its auction state,
//! and snapshots web storage. The page and the time source are injected as
//! traits so collection can be driven from a browser host, a recorded
//! fixture, or a test.
//!
//! # Features
//!
//! - Bounded polling with an injected [`Clock`]; resolves exactly once
//! - Typed auction snapshot with derived bid statistics
//! - Storage snapshot that degrades per area and per key
//! - Case-insensitive resource-URL phrase counter
//! - [`FixturePage`] for offline replays
//!
//! # Example
//!
//! ```rust,ignore
//! use bidlens_page::{collect, CollectorOptions, FixturePage, TokioClock};
//!
//! let page = FixturePage::from_path(Path::new("page.json"))?;
//! let snapshot = collect(&page, &TokioClock::new(), CollectorOptions::default()).await;
//! println!("prebid available: {}", snapshot.auction.is_available());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod auction;
pub mod collector;
pub mod context;
pub mod error;
pub mod fixture;
mod lenient;
pub mod resources;
pub mod storage;

pub use auction::{
    AdUnit, AdUnitBidder, AuctionSnapshot, AuctionState, AuctionStats, Bid, BidResponseGroup,
    UserIdentifier,
};
pub use collector::{collect, CollectionMeta, CollectorOptions, PageContextSnapshot};
pub use context::{AuctionAccessor, Clock, PageContext, StorageArea, TokioClock};
pub use error::{PageError, Result};
pub use fixture::{FixturePage, PageFixture};
pub use resources::{count_matching_resources, ResourceCount};
pub use storage::{snapshot_storage, StorageSnapshot};
