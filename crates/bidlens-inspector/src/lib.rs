//! BidLens Inspector - The end-to-end inspection pipeline.
//!
//! Wires the capture store, the page-context collector, the enricher and
//! the identity matcher into a single trigger that produces an
//! [`InspectionReport`]. Host capabilities (store, page, cookies, clock) are
//! injected as trait objects.
//!
//! # Example
//!
//! ```rust,ignore
//! use bidlens_inspector::{Inspector, InspectorOptions, StaticCookieJar};
//!
//! let inspector = Inspector::new(store, page, Arc::new(StaticCookieJar::empty()),
//!     Arc::new(TokioClock::new()), InspectorOptions::default());
//! if let Some(report) = inspector.run(TabId::new(7)).await.report() {
//!     println!("{}", report.summary.status_text());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cookies;
pub mod error;
pub mod guard;
pub mod inspector;
pub mod report;

pub use cookies::{CookieJar, StaticCookieJar, UnavailableCookieJar};
pub use error::{InspectorError, Result};
pub use guard::{TriggerGuard, TriggerPermit};
pub use inspector::{Inspector, InspectorOptions};
pub use report::{InspectionReport, ReportSummary, RunOutcome};
