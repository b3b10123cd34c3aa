//! Ad-hoc search over the page's resource-timing entries.

use crate::context::PageContext;
use crate::error::{PageError, Result};
use serde::{Deserialize, Serialize};

/// How many resource URLs contain a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCount {
    /// Resources whose URL contains the phrase
    pub count: usize,
    /// All resources on the page
    pub total: usize,
}

/// Count resource URLs containing `phrase`, ignoring case.
///
/// # Errors
/// Returns [`PageError::EmptyPhrase`] for a blank phrase, or the page's
/// error if resources cannot be listed.
pub async fn count_matching_resources<P: PageContext + ?Sized>(
    page: &P,
    phrase: &str,
) -> Result<ResourceCount> {
    let needle = phrase.trim().to_lowercase();
    if needle.is_empty() {
        return Err(PageError::EmptyPhrase);
    }

    let urls = page.resource_urls().await?;
    let count = urls
        .iter()
        .filter(|url| url.to_lowercase().contains(&needle))
        .count();

    Ok(ResourceCount {
        count,
        total: urls.len(),
    })
}
