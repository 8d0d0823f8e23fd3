//! Subtitle sources
//!
//! - SubtitleCat: catalog site, scraped HTML, language-partitioned
//! - Thunder: Xunlei's oracle API, loose JSON, fingerprint-aware
//!
//! Both implement `SubtitleSource`; the orchestrator only sees the trait.

pub mod subtitlecat;
pub mod thunder;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SourceError;
use crate::models::{CandidateResult, SearchQuery, SubtitleContent};
use crate::token::SubtitleToken;

pub use subtitlecat::SubtitleCatClient;
pub use thunder::ThunderClient;

/// Browser-like user agent; both upstreams reject obvious bots
pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Search/fetch contract shared by every upstream
///
/// Neither operation fails: transport and parse errors are logged and turn
/// into empty results.
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    /// Display name, stamped on every candidate
    fn name(&self) -> &str;

    /// Configuration flag read at construction
    fn is_enabled(&self) -> bool;

    /// Whether a decoded token was issued by this source
    fn claims(&self, token: &SubtitleToken) -> bool;

    async fn search(&self, query: &SearchQuery, cancel: &CancellationToken)
        -> Vec<CandidateResult>;

    async fn fetch(&self, token: &str, cancel: &CancellationToken) -> SubtitleContent;
}

/// Resolve an href the way a browser would, relative to the page it came from
pub(crate) fn resolve_href(base: &str, href: &str) -> Result<reqwest::Url, SourceError> {
    let base = reqwest::Url::parse(base)
        .map_err(|e| SourceError::InvalidUrl(format!("{base}: {e}")))?;
    base.join(href.trim())
        .map_err(|e| SourceError::InvalidUrl(format!("{href}: {e}")))
}
