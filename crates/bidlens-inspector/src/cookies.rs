//! Cookie sources for identity matching.

use crate::error::{InspectorError, Result};
use async_trait::async_trait;
use bidlens_core::TabId;
use bidlens_enrich::Cookie;
use std::path::Path;

/// Host capability that lists the cookies visible to a tab's page.
#[async_trait]
pub trait CookieJar: Send + Sync {
    /// Cookies for the URL currently loaded in `tab`.
    async fn cookies_for(&self, tab: TabId) -> Result<Vec<Cookie>>;
}

/// Fixed cookie list, returned for every tab.
#[derive(Debug, Clone, Default)]
pub struct StaticCookieJar {
    cookies: Vec<Cookie>,
}

impl StaticCookieJar {
    /// Jar holding `cookies`.
    #[must_use]
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    /// Jar with no cookies.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a JSON array of cookies, as exported by the host's cookie API.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let cookies: Vec<Cookie> = serde_json::from_str(&contents)?;
        Ok(Self::new(cookies))
    }
}

#[async_trait]
impl CookieJar for StaticCookieJar {
    async fn cookies_for(&self, _tab: TabId) -> Result<Vec<Cookie>> {
        Ok(self.cookies.clone())
    }
}

/// Jar that always fails, standing in for a host without cookie access.
#[derive(Debug, Clone, Default)]
pub struct UnavailableCookieJar;

#[async_trait]
impl CookieJar for UnavailableCookieJar {
    async fn cookies_for(&self, tab: TabId) -> Result<Vec<Cookie>> {
        Err(InspectorError::Cookies(format!("no cookie access for tab {tab}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_host_export() {
        let mut file = NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"[{{"name": "_pubcid", "value": "xyz", "domain": ".example.com", "httpOnly": false, "sameSite": "lax"}}]"#
        )
        .expect("write cookies");

        let jar = StaticCookieJar::from_path(file.path()).expect("load cookies");
        let cookies = jar.cookies_for(TabId::new(1)).await.expect("cookies");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "_pubcid");
        assert_eq!(cookies[0].same_site.as_deref(), Some("lax"));
    }

    #[tokio::test]
    async fn test_unavailable_jar_errors() {
        let err = UnavailableCookieJar
            .cookies_for(TabId::new(4))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("tab 4"));
    }
}
