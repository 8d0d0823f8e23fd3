//! SubtitleCat client
//!
//! Scrapes subtitlecat.com. Search hits are detail pages; each detail page
//! carries one `download_<lang>` link per available translation, so the
//! requested language travels inside the result token.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{resolve_href, SubtitleSource, BROWSER_USER_AGENT};
use crate::error::SourceError;
use crate::matching::{extract_code, similarity};
use crate::models::{CandidateResult, SearchQuery, SubFormat, SubtitleContent, DEFAULT_LANGUAGE};
use crate::parse::catalog::{parse_download_links, parse_search_rows, DownloadLink};
use crate::token::{self, SubtitleToken};
use crate::transport::{get_text, ByteStream, FetchRequest, HttpFetch, RetryPolicy};

const NAME: &str = "SubtitleCat";
const BASE_URL: &str = "https://subtitlecat.com";
const MAX_RESULTS: usize = 10;

/// Tags tried, in document order, when the exact Chinese tag is missing
const CHINESE_VARIANTS: &[&str] = &["zh-CN", "zho", "chi", "zh-TW", "zh-Hans", "zh-Hant"];

/// SubtitleCat catalog client
pub struct SubtitleCatClient {
    base_url: String,
    http: Arc<dyn HttpFetch>,
    enabled: bool,
    retry: RetryPolicy,
}

impl SubtitleCatClient {
    /// Create a client for subtitlecat.com
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

    fn single_attempt(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            ..self.retry
        }
    }

    async fn try_search(
        &self,
        keyword: &str,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<CandidateResult>, SourceError> {
        let url = format!(
            "{}/index.php?search={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(keyword)
        );
        let request = self.request(&url);

        crate::transport::with_retry(NAME, self.retry, cancel, |attempt| {
            self.search_attempt(attempt, &request, query, cancel)
        })
        .await
    }

    async fn search_attempt(
        &self,
        attempt: u32,
        request: &FetchRequest,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<CandidateResult>, SourceError> {
        info!(source = NAME, attempt, url = %request.url, "fetching search page");
        let html = get_text(self.http.as_ref(), request, cancel).await?;
        debug!(source = NAME, bytes = html.len(), "got search page");
        Ok(self.candidates(&html, query))
    }

    /// Turn the first rows of a search page into ranked candidates
    ///
    /// Every row counts toward the cap, including the ones skipped here for a
    /// blank title or a missing, fragment-only or unresolvable href.
    fn candidates(&self, html: &str, query: &SearchQuery) -> Vec<CandidateResult> {
        let rows = parse_search_rows(html);
        debug!(source = NAME, rows = rows.len(), "parsed search rows");

        let language = match query.language.trim() {
            "" => DEFAULT_LANGUAGE,
            language => language,
        };

        rows.into_iter()
            .take(MAX_RESULTS)
            .filter(|row| !row.title.is_empty())
            .filter(|row| !row.href.is_empty() && !row.href.starts_with('#'))
            .filter_map(|row| {
                let url = match resolve_href(&self.base_url, &row.href) {
                    Ok(url) => url,
                    Err(err) => {
                        debug!(source = NAME, %err, "skipping row");
                        return None;
                    }
                };
                let rank = (similarity(&query.title, &row.title) * 100.0).trunc() as f32;
                Some(CandidateResult {
                    token: token::encode(url.as_str(), language),
                    display_name: row.title,
                    source_name: NAME.to_string(),
                    format: SubFormat::Srt,
                    rank,
                    is_exact_match: false,
                })
            })
            .collect()
    }

    async fn try_fetch(
        &self,
        token: &SubtitleToken,
        cancel: &CancellationToken,
    ) -> Result<SubtitleContent, SourceError> {
        let page_request = self.request(&token.url);
        let html = crate::transport::with_retry(NAME, self.single_attempt(), cancel, |_| {
            self.get_page(&page_request, cancel)
        })
        .await?;

        let links = parse_download_links(&html);
        let link = select_download_link(&links, token.language.as_deref())
            .ok_or_else(|| SourceError::NoDownloadLink(token.url.clone()))?;

        // Download hrefs are relative to the detail page, not the site root
        let download_url = resolve_href(&token.url, &link.href)?;
        info!(source = NAME, url = %download_url, language = %link.language, "downloading");

        let download_request = self.request(download_url.as_str());
        let body = crate::transport::with_retry(NAME, self.single_attempt(), cancel, |_| {
            self.open_stream(&download_request, cancel)
        })
        .await?;

        // Tokens that failed to decode carry no language; report what we got
        let language = token
            .language
            .clone()
            .unwrap_or_else(|| link.language.clone());

        Ok(SubtitleContent::new(language, SubFormat::Srt, body))
    }

    async fn get_page(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<String, SourceError> {
        Ok(get_text(self.http.as_ref(), request, cancel).await?)
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
impl SubtitleSource for SubtitleCatClient {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Catalog tokens always carry the requested language
    fn claims(&self, token: &SubtitleToken) -> bool {
        token.language.is_some()
    }

    async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Vec<CandidateResult> {
        let code = extract_code(&query.title);
        let keyword = code
            .as_ref()
            .map(|c| c.as_str())
            .unwrap_or(&query.title)
            .trim();
        info!(
            source = NAME,
            title = %query.title,
            keyword,
            language = %query.language,
            "search"
        );

        if !self.enabled {
            info!(source = NAME, "disabled by config");
            return Vec::new();
        }

        if keyword.is_empty() {
            info!(source = NAME, "keyword is empty");
            return Vec::new();
        }

        match self.try_search(keyword, query, cancel).await {
            Ok(results) => {
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
        info!(
            source = NAME,
            url = %token.url,
            language = token.language.as_deref().unwrap_or("-"),
            "fetch"
        );

        match self.try_fetch(&token, cancel).await {
            Ok(content) => content,
            Err(err) => {
                warn!(source = NAME, %err, "download failed");
                SubtitleContent::default()
            }
        }
    }
}

fn is_chinese(language: &str) -> bool {
    let language = language.to_ascii_lowercase();
    language.starts_with("zh") || language == "chi" || language == "zho"
}

/// Pick the download link for a language
///
/// Exact tag first, then any Chinese variant for Chinese requests, then
/// whatever the page offers first.
fn select_download_link<'a>(
    links: &'a [DownloadLink],
    language: Option<&str>,
) -> Option<&'a DownloadLink> {
    if let Some(language) = language {
        if let Some(link) = links
            .iter()
            .find(|l| l.language.eq_ignore_ascii_case(language))
        {
            return Some(link);
        }

        if is_chinese(language) {
            let variant = links.iter().find(|l| {
                CHINESE_VARIANTS
                    .iter()
                    .any(|v| v.eq_ignore_ascii_case(&l.language))
            });
            if let Some(link) = variant {
                debug!(source = NAME, found = %link.language, "using Chinese variant");
                return Some(link);
            }
        }

        debug!(source = NAME, language, "no link for language, taking first");
    }

    links.first()
}
