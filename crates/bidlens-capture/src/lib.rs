//! BidLens Capture - Event capture store for ad-auction network traffic.
//!
//! The host browser reports four lifecycle callbacks per request
//! (request started, response started, completed, error). This crate folds
//! them into one [`CapturedRequest`] per host request id and serves
//! per-tab snapshots to the inspection pipeline.
//!
//! # Architecture
//!
//! - **Events** ([`event`]): host lifecycle payloads, deserialized from the host's JSON
//! - **Requests** ([`request`]): the captured record and its decoded body
//! - **Store** ([`store`]): the [`CaptureStore`] trait and its in-memory implementation
//! - **Allowlist** ([`allowlist`]): browser match patterns selecting observed URLs
//! - **Messages** ([`message`]): the "get data" / "clear data" request interface
//!
//! # Example
//!
//! ```rust
//! use bidlens_capture::{CaptureStore, InMemoryCaptureStore, RequestStarted};
//! use bidlens_core::TabId;
//!
//! let store = InMemoryCaptureStore::new();
//! store.on_request_start(RequestStarted::new(
//!     "1",
//!     "https://ib.adnxs.com/ut/v3/prebid",
//!     "POST",
//!     TabId::new(3),
//! ));
//!
//! assert_eq!(store.query(TabId::new(3)).len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod allowlist;
pub mod error;
pub mod event;
pub mod message;
pub mod request;
pub mod store;

// Re-export commonly used types
pub use allowlist::{UrlPattern, UrlPatternSet};
pub use error::{CaptureError, Result};
pub use event::{
    Completed, ErrorOccurred, HostRequestBody, LifecycleEvent, RequestStarted, ResponseStarted,
    UploadData,
};
pub use message::{handle_message, CaptureMessage, CaptureReply};
pub use request::{CapturedRequest, HttpHeader, RequestBody};
pub use store::{CaptureStore, InMemoryCaptureStore};
