//! Search orchestration
//!
//! Fronts every `SubtitleSource` behind one `search` / `fetch` pair. Sources
//! are queried concurrently and their results concatenated in registration
//! order; each source's own ranking is kept as is.

use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{SubtitleCatClient, SubtitleSource, ThunderClient};
use crate::config::Config;
use crate::models::{CandidateResult, SearchQuery, SubtitleContent};
use crate::token;
use crate::transport::HttpFetch;

/// Entry point used by the host
pub struct SubtitleSearch {
    sources: Vec<Arc<dyn SubtitleSource>>,
}

impl SubtitleSearch {
    pub fn new(sources: Vec<Arc<dyn SubtitleSource>>) -> Self {
        Self { sources }
    }

    /// SubtitleCat then Thunder, with the host's enable flags applied
    pub fn from_config(config: &Config, http: Arc<dyn HttpFetch>) -> Self {
        Self::new(vec![
            Arc::new(SubtitleCatClient::new(http.clone()).enabled(config.enable_subtitle_cat)),
            Arc::new(ThunderClient::new(http).enabled(config.enable_thunder)),
        ])
    }

    pub fn sources(&self) -> &[Arc<dyn SubtitleSource>] {
        &self.sources
    }

    /// Query every enabled source; disabled ones are never called
    pub async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Vec<CandidateResult> {
        let enabled: Vec<&Arc<dyn SubtitleSource>> =
            self.sources.iter().filter(|s| s.is_enabled()).collect();

        info!(
            title = %query.title,
            sources = enabled.len(),
            "searching subtitles"
        );

        let results = join_all(enabled.iter().map(|source| source.search(query, cancel))).await;

        let candidates: Vec<CandidateResult> = results.into_iter().flatten().collect();
        info!(count = candidates.len(), "search finished");
        candidates
    }

    /// Redeem a token with the source that issued it
    ///
    /// Enable flags are not consulted: a token handed out earlier stays
    /// redeemable. Unclaimed tokens yield empty content.
    pub async fn fetch(&self, token: &str, cancel: &CancellationToken) -> SubtitleContent {
        let decoded = token::decode_lenient(token);

        match self.sources.iter().find(|s| s.claims(&decoded)) {
            Some(source) => {
                info!(source = source.name(), url = %decoded.url, "routing fetch");
                source.fetch(token, cancel).await
            }
            None => {
                warn!(url = %decoded.url, "no source claims token");
                SubtitleContent::default()
            }
        }
    }
}
