//! Query-string access for captured URLs.

use std::collections::BTreeMap;
use url::form_urlencoded;

/// Decoded query parameters of a URL, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse everything after the first `?`, up to any fragment.
    ///
    /// Never fails; a URL without a query yields no parameters.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let query = url.split_once('?').map_or("", |(_, query)| query);
        let query = query.split('#').next().unwrap_or_default();
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// First value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First non-empty value among several parameter names.
    #[must_use]
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .find_map(|name| self.get(name).filter(|value| !value.is_empty()))
    }

    /// All pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parameters as a map; a repeated name keeps its last value.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.pairs.iter().cloned().collect()
    }

    /// Whether the URL had no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_decode() {
        let params = QueryParams::from_url(
            "https://aax.amazon-adsystem.com/x/ns/abc?slotID=div-1&sz=300x250&crid=c%2F1#top",
        );
        assert_eq!(params.get("slotID"), Some("div-1"));
        assert_eq!(params.get("crid"), Some("c/1"));
        assert_eq!(params.to_map().len(), 3);
    }

    #[test]
    fn test_no_query() {
        assert!(QueryParams::from_url("https://example.com/path").is_empty());
    }

    #[test]
    fn test_first_of_skips_empty_values() {
        let params = QueryParams::from_url("https://x.test/?ad_id=&crid=42");
        assert_eq!(params.first_of(&["ad_id", "crid"]), Some("42"));
    }
}
