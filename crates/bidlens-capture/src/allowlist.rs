//! Browser match patterns (`*://*.adnxs.com/*`) selecting which requests are
//! captured.

use crate::error::{CaptureError, Result};
use regex::Regex;

/// A single compiled match pattern.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    source: String,
    regex: Regex,
}

impl UrlPattern {
    /// Compile a `<scheme>://<host><path>` match pattern.
    ///
    /// - scheme `*` matches `http` and `https`
    /// - host `*` matches any host, `*.example.com` matches `example.com`
    ///   and all of its subdomains
    /// - `*` in the path matches any run of characters, query included
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| CaptureError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern == "<all_urls>" {
            return Ok(Self {
                source: pattern.to_string(),
                regex: Regex::new(r"^(https?|wss?|ftp)://.*$")?,
            });
        }

        let (scheme, rest) = pattern
            .split_once("://")
            .ok_or_else(|| invalid("missing '://'"))?;
        let path_start = rest.find('/').ok_or_else(|| invalid("missing path"))?;
        let (host, path) = rest.split_at(path_start);

        let scheme_re = match scheme {
            "*" => "https?".to_string(),
            s if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()) => {
                regex::escape(s)
            }
            _ => return Err(invalid("unsupported scheme")),
        };

        let host_re = if host == "*" {
            "[^/:]+".to_string()
        } else if let Some(domain) = host.strip_prefix("*.") {
            if domain.is_empty() || domain.contains('*') {
                return Err(invalid("wildcard must only prefix the host"));
            }
            format!(r"([^/:]+\.)?{}", regex::escape(domain))
        } else if host.is_empty() || host.contains('*') {
            return Err(invalid("wildcard must only prefix the host"));
        } else {
            regex::escape(host)
        };

        let path_re = path
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = Regex::new(&format!(r"^{scheme_re}://{host_re}(:\d+)?{path_re}$"))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Whether the URL matches. Fragments are ignored.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let without_fragment = url.split('#').next().unwrap_or(url);
        self.regex.is_match(without_fragment)
    }

    /// The pattern text this was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// An allowlist of match patterns; a URL is allowed if any pattern matches.
#[derive(Debug, Clone, Default)]
pub struct UrlPatternSet {
    patterns: Vec<UrlPattern>,
}

impl UrlPatternSet {
    /// Compile every pattern, failing on the first malformed one.
    pub fn compile<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| UrlPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether any pattern matches the URL.
    #[must_use]
    pub fn allows(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(url))
    }

    /// Number of compiled patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the set has no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidlens_core::config::DEFAULT_URL_PATTERNS;

    #[test]
    fn test_subdomain_wildcard() {
        let pattern = UrlPattern::parse("*://*.adnxs.com/*").expect("valid pattern");
        assert!(pattern.matches("https://ib.adnxs.com/ut/v3/prebid"));
        assert!(pattern.matches("http://adnxs.com/"));
        assert!(!pattern.matches("https://notadnxs.com/ut"));
        assert!(!pattern.matches("https://adnxs.com.evil.io/ut"));
    }

    #[test]
    fn test_path_prefix() {
        let pattern = UrlPattern::parse("*://*.amazon-adsystem.com/e/dtb/bid*").expect("valid");
        assert!(pattern.matches("https://c.amazon-adsystem.com/e/dtb/bid?src=600"));
        assert!(!pattern.matches("https://c.amazon-adsystem.com/e/cm?x=1"));
    }

    #[test]
    fn test_port_and_fragment() {
        let pattern = UrlPattern::parse("*://*.criteo.com/*").expect("valid");
        assert!(pattern.matches("https://bidder.criteo.com:8443/cdb#frag"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(UrlPattern::parse("adnxs.com").is_err());
        assert!(UrlPattern::parse("*://*.adnxs.com").is_err());
        assert!(UrlPattern::parse("*://ad*nxs.com/*").is_err());
    }

    #[test]
    fn test_default_allowlist_compiles() {
        let set = UrlPatternSet::compile(DEFAULT_URL_PATTERNS).expect("defaults compile");
        assert_eq!(set.len(), DEFAULT_URL_PATTERNS.len());
        assert!(set.allows("https://pubads.ad.doubleclick.net/gampad/ads?iu=/1/a"));
        assert!(set.allows("https://aax.amazon-adsystem.com/x/ns/123?crid=9"));
        assert!(!set.allows("https://example.com/app.js"));
    }
}
