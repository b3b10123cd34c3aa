//! BidLens Core - Foundation crate for the BidLens ad-auction inspector.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other BidLens crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes (`RequestId`, `TabId`, `Timestamp`)
//!
//! # Example
//!
//! ```rust
//! use bidlens_core::{BidlensConfig, TabId};
//!
//! let config = BidlensConfig::default();
//! assert_eq!(config.collector.wait_ms, 2000);
//!
//! let tab = TabId::new(42);
//! assert_eq!(tab.get(), 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{BidlensConfig, CaptureConfig, CollectorConfig, IdentityConfig};
pub use error::{BidlensError, ConfigError, ConfigResult, Result};
pub use types::{RequestId, TabId, Timestamp};
