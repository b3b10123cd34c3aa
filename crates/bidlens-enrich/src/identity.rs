//! Identity matching: locate where each user identifier is persisted.
//!
//! The match is a containment heuristic over cookie names and storage keys.
//! False positives and misses are expected; the contract is a plausible
//! location or an explicit "not found".

use bidlens_core::IdentityConfig;
use bidlens_page::{StorageSnapshot, UserIdentifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A browser cookie visible to the inspected page's origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain attribute
    pub domain: String,
    /// Path attribute
    pub path: String,
    /// Expiry, seconds since the Unix epoch; `None` for session cookies
    pub expires: Option<f64>,
    /// `HttpOnly` attribute
    pub http_only: bool,
    /// `Secure` attribute
    pub secure: bool,
    /// `SameSite` attribute
    pub same_site: Option<String>,
}

impl Cookie {
    /// Cookie with a name, value and domain.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            ..Self::default()
        }
    }
}

/// Where an identifier was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchLocation {
    /// A cookie
    Cookie {
        /// Cookie name
        name: String,
        /// Cookie domain
        domain: String,
    },
    /// A `localStorage` key
    LocalStorage {
        /// Storage key
        key: String,
    },
    /// A `sessionStorage` key
    SessionStorage {
        /// Storage key
        key: String,
    },
    /// Nothing plausible was found
    NotFound,
}

impl fmt::Display for MatchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cookie { name, domain } => write!(f, "Cookie: {name} (Domain: {domain})"),
            Self::LocalStorage { key } => write!(f, "Local Storage: {key}"),
            Self::SessionStorage { key } => write!(f, "Session Storage: {key}"),
            Self::NotFound => f.write_str("Not Found in Accessible Storage"),
        }
    }
}

/// Outcome for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMatch {
    /// Identifier source
    pub source: String,
    /// Identifier value
    pub id: String,
    /// Where it was found
    pub location: MatchLocation,
    /// Stored value, truncated for display; `None` when not found
    pub matched_value: Option<String>,
}

impl IdentityMatch {
    /// Whether a location was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.location != MatchLocation::NotFound
    }
}

/// Matcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Characters of the stored value kept in the report
    pub value_preview_chars: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            value_preview_chars: 150,
        }
    }
}

impl From<&IdentityConfig> for MatchOptions {
    fn from(config: &IdentityConfig) -> Self {
        Self {
            value_preview_chars: config.value_preview_chars,
        }
    }
}

/// Locate each identifier in cookies, then `localStorage`, then
/// `sessionStorage`. The first plausible location wins.
///
/// With several plausible keys the pick follows the enumeration order of the
/// collection passed in.
#[must_use]
pub fn match_identifiers(
    ids: &[UserIdentifier],
    cookies: &[Cookie],
    storage: &StorageSnapshot,
    options: &MatchOptions,
) -> Vec<IdentityMatch> {
    ids.iter()
        .map(|id| {
            let needle = Needle::new(id);
            let found = cookies
                .iter()
                .find(|c| needle.matches_cookie(&c.name))
                .map(|c| {
                    (
                        MatchLocation::Cookie {
                            name: c.name.clone(),
                            domain: c.domain.clone(),
                        },
                        c.value.as_str(),
                    )
                })
                .or_else(|| {
                    storage
                        .local
                        .iter()
                        .find(|(k, _)| needle.matches_key(k))
                        .map(|(k, v)| (MatchLocation::LocalStorage { key: k.clone() }, v.as_str()))
                })
                .or_else(|| {
                    storage
                        .session
                        .iter()
                        .find(|(k, _)| needle.matches_key(k))
                        .map(|(k, v)| (MatchLocation::SessionStorage { key: k.clone() }, v.as_str()))
                });

            let (location, matched_value) = match found {
                Some((location, value)) => {
                    (location, Some(preview(value, options.value_preview_chars)))
                }
                None => (MatchLocation::NotFound, None),
            };

            IdentityMatch {
                source: id.source.clone(),
                id: id.id.clone(),
                location,
                matched_value,
            }
        })
        .collect()
}

/// Merge identifier lists, keeping the first occurrence of each
/// `(source, id)` pair.
#[must_use]
pub fn merge_identifiers<'a, I>(lists: I) -> Vec<UserIdentifier>
where
    I: IntoIterator<Item = &'a [UserIdentifier]>,
{
    let mut seen = BTreeSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|id| seen.insert((id.source.as_str(), id.id.as_str())))
        .cloned()
        .collect()
}

/// Lower-cased search terms for one identifier.
struct Needle {
    source: String,
    ext_type: Option<String>,
}

impl Needle {
    fn new(id: &UserIdentifier) -> Self {
        Self {
            source: id.source.to_lowercase(),
            ext_type: id
                .ext_type
                .as_deref()
                .map(str::to_lowercase)
                .filter(|t| !t.is_empty()),
        }
    }

    fn matches_cookie(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        !name.is_empty() && (name == self.source || self.contains_either_way(&name))
    }

    fn matches_key(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        !key.is_empty() && self.contains_either_way(&key)
    }

    fn contains_either_way(&self, candidate: &str) -> bool {
        let by_source = !self.source.is_empty()
            && (candidate.contains(&self.source) || self.source.contains(candidate));
        let by_type = self
            .ext_type
            .as_deref()
            .is_some_and(|t| candidate.contains(t));
        by_source || by_type
    }
}

fn preview(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}
