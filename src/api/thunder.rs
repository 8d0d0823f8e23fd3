//! Thunder (Xunlei) subtitle oracle client
//!
//! The oracle is keyed by name but also reports each subtitle's content id
//! (`cid`), the same partial-file SHA-1 that `matching::fingerprint` computes.
//! A local file whose fingerprint equals a `cid` is an exact match.
//!
//! Results are not language-partitioned, so tokens carry only the URL.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{SubtitleSource, BROWSER_USER_AGENT};
use crate::error::SourceError;
use crate::matching::{extract_code, fingerprint};
use crate::models::{CandidateResult, Fingerprint, SearchQuery, SubFormat, SubtitleContent};
use crate::parse::oracle::{self, OracleItem};
use crate::token::{self, SubtitleToken};
use crate::transport::{get_text, ByteStream, FetchRequest, HttpFetch, RetryPolicy};

const NAME: &str = "Thunder";
const BASE_URL: &str = "https://api-shoulei-ssl.xunlei.com";
const MAX_RESULTS: usize = 10;

/// Language tag reported for every Thunder download (generic Chinese)
pub const CONTENT_LANGUAGE: &str = "chi";

/// Prefix on the display name of fingerprint matches
pub const EXACT_MATCH_MARKER: &str = "[Exact Match] ";
pub const HASH_MATCH_BONUS: f32 = 1000.0;
pub const CODE_MATCH_BONUS: f32 = 100.0;

/// Thunder oracle client
pub struct ThunderClient {
    base_url: String,
    http: Arc<dyn HttpFetch>,
    enabled: bool,
    retry: RetryPolicy,
}

impl ThunderClient {
    /// Create a client for the public oracle
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(http: Arc<dyn HttpFetch>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            enabled: true,
            retry: RetryPolicy::default(),
        }
    }

    /// Apply the host's enable flag
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, url: &str) -> FetchRequest {
        FetchRequest::get(url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .timeout(self.retry.attempt_timeout)
    }

    /// Fingerprint the local media file, if there is one
    ///
    /// Any failure just means no exact-match boost.
    async fn local_fingerprint(&self, query: &SearchQuery) -> Option<Fingerprint> {
        let path = query.local_media_path.clone()?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(source = NAME, path = %path.display(), "local media not found");
            return None;
        }

        let shown = path.display().to_string();
        match tokio::task::spawn_blocking(move || fingerprint(&path)).await {
            Ok(Ok(fp)) => {
                info!(source = NAME, path = %shown, fingerprint = %fp, "computed fingerprint");
                Some(fp)
            }
            Ok(Err(err)) => {
                warn!(source = NAME, path = %shown, %err, "failed to fingerprint local media");
                None
            }
            Err(err) => {
                warn!(source = NAME, %err, "fingerprint task failed");
                None
            }
        }
    }

    async fn try_search(
        &self,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<OracleItem>, SourceError> {
        let url = format!(
            "{}/oracle/subtitle?name={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(keyword)
        );
        let request = self.request(&url);

        crate::transport::with_retry(NAME, self.retry, cancel, |attempt| {
            self.search_attempt(attempt, &request, cancel)
        })
        .await
    }

    async fn search_attempt(
        &self,
        attempt: u32,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<OracleItem>, SourceError> {
        info!(source = NAME, attempt, url = %request.url, "querying oracle");
        let json = get_text(self.http.as_ref(), request, cancel).await?;
        debug!(source = NAME, bytes = json.len(), "got oracle response");

        if !oracle::is_ok(&json) {
            info!(source = NAME, "result not ok");
            return Ok(Vec::new());
        }

        let items = oracle::parse_items(&json);
        debug!(source = NAME, count = items.len(), "parsed oracle items");
        Ok(items)
    }

    async fn try_fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<SubtitleContent, SourceError> {
        let request = self.request(url);
        let policy = RetryPolicy {
            max_attempts: 1,
            ..self.retry
        };
        let body = crate::transport::with_retry(NAME, policy, cancel, |_| {
            self.open_stream(&request, cancel)
        })
        .await?;

        let format = SubFormat::from_url(url);
        info!(source = NAME, %format, "downloaded subtitle");
        Ok(SubtitleContent::new(CONTENT_LANGUAGE, format, body))
    }

    async fn open_stream(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, SourceError> {
        let response = self.http.fetch(request, cancel).await?;
        Ok(response.into_success_body()?)
    }
}

#[async_trait]
impl SubtitleSource for ThunderClient {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Oracle tokens carry no language segment
    fn claims(&self, token: &SubtitleToken) -> bool {
        token.language.is_none()
    }

    async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Vec<CandidateResult> {
        let code = extract_code(&query.title);
        let is_code_extraction = code.is_some();
        let keyword = code
            .as_ref()
            .map(|c| c.as_str())
            .unwrap_or(&query.title)
            .trim();
        info!(source = NAME, title = %query.title, keyword, "search");

        if !self.enabled {
            info!(source = NAME, "disabled by config");
            return Vec::new();
        }

        let local = self.local_fingerprint(query).await;

        if keyword.is_empty() {
            info!(source = NAME, "keyword is empty");
            return Vec::new();
        }

        match self.try_search(keyword, cancel).await {
            Ok(items) => {
                let results = rank(items, local.as_ref(), is_code_extraction);
                info!(source = NAME, count = results.len(), "returning results");
                results
            }
            Err(err) => {
                warn!(source = NAME, %err, "search failed");
                Vec::new()
            }
        }
    }

    async fn fetch(&self, token: &str, cancel: &CancellationToken) -> SubtitleContent {
        let token = token::decode_lenient(token);
        info!(source = NAME, url = %token.url, "fetch");

        match self.try_fetch(&token.url, cancel).await {
            Ok(content) => content,
            Err(err) => {
                warn!(source = NAME, %err, "download failed");
                SubtitleContent::default()
            }
        }
    }
}

/// Score, mark and order oracle items
///
/// Fingerprint matches get a large bonus and sort first; otherwise a
/// successful code extraction earns a smaller bonus since the keyword was
/// precise. Ties keep upstream order.
fn rank(
    items: Vec<OracleItem>,
    local: Option<&Fingerprint>,
    is_code_extraction: bool,
) -> Vec<CandidateResult> {
    let mut results: Vec<CandidateResult> = items
        .into_iter()
        .map(|item| {
            let is_hash_match = match (local, item.cid.as_deref()) {
                (Some(fp), Some(cid)) => fp.matches(cid),
                _ => false,
            };

            let mut rank = item.score as f32;
            let mut display_name = item.name;
            if is_hash_match {
                display_name = format!("{EXACT_MATCH_MARKER}{display_name}");
                rank += HASH_MATCH_BONUS;
            } else if is_code_extraction {
                rank += CODE_MATCH_BONUS;
            }

            let format = item
                .ext
                .as_deref()
                .map(SubFormat::from_extension)
                .unwrap_or_else(|| SubFormat::from_url(&item.url));

            CandidateResult {
                token: token::encode(&item.url, ""),
                display_name,
                source_name: NAME.to_string(),
                format,
                rank,
                is_exact_match: is_hash_match,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.is_exact_match
            .cmp(&a.is_exact_match)
            .then_with(|| b.rank.total_cmp(&a.rank))
    });
    results.truncate(MAX_RESULTS);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, cid: Option<&str>, score: f64) -> OracleItem {
        OracleItem {
            name: name.to_string(),
            url: format!("https://cdn.example.com/{name}"),
            ext: None,
            cid: cid.map(str::to_string),
            score,
        }
    }

    fn local() -> Fingerprint {
        Fingerprint::from_digest(&[0xAB; 20])
    }

    #[test]
    fn test_rank_hash_match_sorts_first() {
        let cid = "ab".repeat(20);
        let items = vec![
            item("a.srt", None, 50.0),
            item("b.ass", Some(cid.as_str()), 1.0),
            item("c.srt", Some("FFFF"), 30.0),
        ];
        let fp = local();
        let results = rank(items, Some(&fp), false);

        assert_eq!(results[0].display_name, "[Exact Match] b.ass");
        assert!(results[0].is_exact_match);
        assert_eq!(results[0].rank, 1001.0);
        assert_eq!(results[0].format, SubFormat::Ass);

        assert_eq!(results[1].display_name, "a.srt");
        assert_eq!(results[2].display_name, "c.srt");
        assert!(!results[1].is_exact_match);
    }

    #[test]
    fn test_rank_code_bonus_without_hash_match() {
        let results = rank(vec![item("a.srt", Some("1234"), 5.0)], Some(&local()), true);
        assert_eq!(results[0].rank, 105.0);
        assert!(!results[0].is_exact_match);

        let results = rank(vec![item("a.srt", None, 5.0)], None, false);
        assert_eq!(results[0].rank, 5.0);
    }

    #[test]
    fn test_rank_no_local_fingerprint_never_matches() {
        let cid = "ab".repeat(20);
        let results = rank(vec![item("a.srt", Some(cid.as_str()), 5.0)], None, true);
        assert!(!results[0].is_exact_match);
        assert_eq!(results[0].rank, 105.0);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let items = vec![
            item("first.srt", None, 10.0),
            item("second.srt", None, 10.0),
            item("third.srt", None, 10.0),
        ];
        let names: Vec<_> = rank(items, None, false)
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, ["first.srt", "second.srt", "third.srt"]);
    }

    #[test]
    fn test_rank_caps_results() {
        let items = (0..15).map(|i| item(&format!("{i}.srt"), None, i as f64)).collect();
        let results = rank(items, None, false);
        assert_eq!(results.len(), MAX_RESULTS);
        assert_eq!(results[0].display_name, "14.srt");
    }

    #[test]
    fn test_rank_tokens_have_no_language() {
        let results = rank(vec![item("a.srt", None, 1.0)], None, false);
        let decoded = token::decode(&results[0].token).unwrap();
        assert_eq!(decoded.url, "https://cdn.example.com/a.srt");
        assert_eq!(decoded.language, None);
    }
}
