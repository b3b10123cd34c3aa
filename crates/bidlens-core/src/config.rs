//! Configuration management for BidLens.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Browser match patterns for ad-tech endpoints observed by default.
pub const DEFAULT_URL_PATTERNS: &[&str] = &[
    "*://*.bid.appnexus.com/*",
    "*://*.ads.pubmatic.com/*",
    "*://*.prebid.adnxs.com/*",
    "*://*.openx.net/v3/prebid/*",
    "*://*.ad.doubleclick.net/gampad/*",
    "*://*.googleads.g.doubleclick.net/pagead/*",
    "*://*.casalemedia.com/bid/*",
    "*://*.rubiconproject.com/a/api/info.json*",
    "*://*.ads.yahoo.com/*",
    "*://*.sharethrough.com/hb/*",
    "*://*.im.eu.bidr.io/bid/prebid/*",
    "*://*.amazon-adsystem.com/e/dtb/bid*",
    "*://*.amazon-adsystem.com/e/cm*",
    "*://*.aax.amazon-adsystem.com/*",
    "*://*.bidder.criteo.com/*",
    "*://*.gumgum.com/ad/*",
    "*://*.lijit.com/*",
    "*://*.bid.ag.ds.adroll.com/*",
    "*://*.adn.insight.ads.vimeo.com/*",
    "*://*.adsrvr.org/*",
    "*://*.demdex.net/*",
    "*://*.facebook.com/ads/rdr*",
    "*://*.px.adnxs.com/*",
    "*://*.sync.go.sonobi.com/*",
    "*://*.contextweb.com/*",
    "*://*.adform.net/*",
    "*://*.adblade.com/*",
    "*://*.adroll.com/*",
    "*://*.adtechus.com/*",
    "*://*.adthrive.com/*",
    "*://*.adzerk.net/*",
    "*://*.criteo.com/*",
    "*://*.districtm.io/*",
    "*://*.gumgum.com/*",
    "*://*.indexexchange.com/*",
    "*://*.openx.com/*",
    "*://*.pubmatic.com/*",
    "*://*.rubiconproject.com/*",
    "*://*.sovrn.com/*",
    "*://*.triplelift.com/*",
    "*://*.yieldmo.com/*",
    "*://*.adnxs.com/*",
];

/// Main BidLens configuration.
///
/// This is loaded from `~/.config/bidlens/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BidlensConfig {
    /// Page-context collection settings
    pub collector: CollectorConfig,
    /// Network capture settings
    pub capture: CaptureConfig,
    /// Identity matching settings
    pub identity: IdentityConfig,
}

impl BidlensConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults
    /// when the file does not exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `BIDLENS_WAIT_MS`: Override the page-context wait window
    /// - `BIDLENS_POLL_INTERVAL_MS`: Override the polling interval
    /// - `BIDLENS_SERIALIZE_TRIGGERS`: Ignore triggers while one is running (true/false)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `BIDLENS_*` environment overrides in place.
    ///
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("BIDLENS_WAIT_MS") {
            if let Ok(ms) = val.parse() {
                self.collector.wait_ms = ms;
                tracing::debug!("Override collector.wait_ms from env: {}", ms);
            }
        }

        if let Ok(val) = std::env::var("BIDLENS_POLL_INTERVAL_MS") {
            if let Ok(ms) = val.parse() {
                self.collector.poll_interval_ms = ms;
                tracing::debug!("Override collector.poll_interval_ms from env: {}", ms);
            }
        }

        if let Ok(val) = std::env::var("BIDLENS_SERIALIZE_TRIGGERS") {
            if let Ok(serialize) = val.parse() {
                self.collector.serialize_triggers = serialize;
                tracing::debug!("Override collector.serialize_triggers from env: {}", serialize);
            }
        }
    }

    /// Check value constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.collector.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collector.poll_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/bidlens/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "bidlens", "bidlens").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Page-context collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Maximum time to wait for the auction library, in milliseconds
    pub wait_ms: u64,
    /// Delay between polls for the auction library, in milliseconds
    pub poll_interval_ms: u64,
    /// Ignore a trigger while a previous one is still running
    pub serialize_triggers: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            wait_ms: 2000,
            poll_interval_ms: 100,
            serialize_triggers: false,
        }
    }
}

/// Network capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Browser match patterns for the URLs to observe
    pub url_patterns: Vec<String>,
    /// Drop request-start events whose URL matches none of the patterns
    pub enforce_allowlist: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            url_patterns: DEFAULT_URL_PATTERNS.iter().map(|p| (*p).to_string()).collect(),
            enforce_allowlist: true,
        }
    }
}

/// Identity matching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Maximum characters of a matched cookie/storage value kept in reports
    pub value_preview_chars: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            value_preview_chars: 150,
        }
    }
}
