//! Page fetcher: pulls the forum page and extracts the top discussion row

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::io::HttpClient;

static ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<tr\b([^>]*)>(.*?)</tr\s*>").expect("row pattern is valid")
});
static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("class pattern is valid")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

/// Fetches the identifier of the newest forum post
#[async_trait]
pub trait PageFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch `url` and return the text of its first discussion entry
    async fn fetch_first_post(&self, url: &str) -> crate::Result<String>;
}

/// Fetcher for forum pages that list discussions as `<tr class="discussion">` rows
pub struct ForumPageFetcher {
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ForumPageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForumPageFetcher").finish()
    }
}

impl ForumPageFetcher {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PageFetcher for ForumPageFetcher {
    async fn fetch_first_post(&self, url: &str) -> crate::Result<String> {
        let response = self
            .http
            .get(url)
            .await
            .map_err(|e| crate::ForumWatchError::Fetch(e.to_string()))?;

        if !response.is_success() {
            return Err(crate::ForumWatchError::Fetch(format!(
                "Forum page returned status {}",
                response.status
            )));
        }

        let text = first_discussion_text(&response.body).ok_or_else(|| {
            crate::ForumWatchError::Fetch("Could not find discussion posts on the page".to_string())
        })?;

        if text.is_empty() {
            return Err(crate::ForumWatchError::Fetch(
                "Found post but title is empty".to_string(),
            ));
        }

        tracing::debug!("First discussion on {}: {:?}", url, text);
        Ok(text)
    }
}

/// Text content of the first table row whose class list contains `discussion`.
///
/// Returns `Some("")` when the row exists but has no text.
pub fn first_discussion_text(html: &str) -> Option<String> {
    ROW.captures_iter(html)
        .find(|row| row.get(1).is_some_and(|attrs| has_discussion_class(attrs.as_str())))
        .map(|row| row.get(2).map(|m| text_content(m.as_str())).unwrap_or_default())
}

fn has_discussion_class(attrs: &str) -> bool {
    CLASS_ATTR.captures(attrs).is_some_and(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .is_some_and(|value| value.as_str().split_whitespace().any(|c| c == "discussion"))
    })
}

fn text_content(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
