//! Search Orchestration Tests
//!
//! Runs both sources against an in-memory upstream so call counts, timeouts
//! and routing can be observed directly.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use subhound::transport::{FetchRequest, FetchResponse, HttpFetch, RetryPolicy};
use subhound::{
    token, CancellationToken, Config, SearchQuery, SubtitleCatClient, SubtitleSearch,
    SubtitleSource, ThunderClient, TransportError,
};

const CAT_URL: &str = "http://cat.test";
const THUNDER_URL: &str = "http://thunder.test";

const CATALOG_PAGE: &str = r#"<table>
    <tr><td><a href="/subs/1/LULU-421.html">LULU-421</a></td></tr>
    <tr><td><a href="/subs/2/LULU-421-b.html">LULU-421 b</a></td></tr>
</table>"#;

const DETAIL_PAGE: &str = r#"<a id="download_en" href="/dl/en.srt">en</a>
<a id="download_zh-CN" href="/dl/zh.srt">zh</a>"#;

const ORACLE_JSON: &str = r#"{"data": [
    {"name": "t1.srt", "url": "http:\/\/thunder.test\/files\/t1.srt", "ext": "srt", "score": 3},
    {"name": "t2.ass", "url": "http:\/\/thunder.test\/files\/t2.ass", "ext": "ass", "score": 9}
], "result": "ok"}"#;

// =============================================================================
// In-memory upstream
// =============================================================================

/// Serves canned pages by URL shape and records every request
#[derive(Default)]
struct FakeUpstream {
    requests: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakeUpstream {
    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn body_for(url: &str) -> String {
        if url.contains("/index.php") {
            CATALOG_PAGE.to_string()
        } else if url.contains("/oracle/subtitle") {
            ORACLE_JSON.to_string()
        } else if url.ends_with(".html") {
            DETAIL_PAGE.to_string()
        } else {
            format!("subtitle from {url}")
        }
    }
}

#[async_trait]
impl HttpFetch for FakeUpstream {
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        self.requests.lock().unwrap().push(request.url.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let body = Bytes::from(Self::body_for(&request.url));
        Ok(FetchResponse {
            status: 200,
            body: futures::stream::once(async move { Ok(body) }).boxed(),
        })
    }
}

fn search_with(http: Arc<FakeUpstream>, config: &Config) -> SubtitleSearch {
    SubtitleSearch::new(vec![
        Arc::new(
            SubtitleCatClient::with_base_url(http.clone(), CAT_URL)
                .enabled(config.enable_subtitle_cat),
        ),
        Arc::new(ThunderClient::with_base_url(http, THUNDER_URL).enabled(config.enable_thunder)),
    ])
}

fn both_enabled() -> Config {
    Config::default()
}

// =============================================================================
// Search Tests
// =============================================================================

/// Test: Results are concatenated, SubtitleCat first
#[tokio::test]
async fn test_search_concatenates_in_source_order() {
    let http = Arc::new(FakeUpstream::default());
    let search = search_with(http.clone(), &both_enabled());

    let results = search
        .search(&SearchQuery::new("LULU-421 1080p"), &CancellationToken::new())
        .await;

    let sources: Vec<&str> = results.iter().map(|r| r.source_name.as_str()).collect();
    assert_eq!(sources, ["SubtitleCat", "SubtitleCat", "Thunder", "Thunder"]);

    // Each source keeps its own order
    assert_eq!(results[2].display_name, "t2.ass");
    assert_eq!(results[2].rank, 109.0);
    assert_eq!(results[3].display_name, "t1.srt");

    assert_eq!(http.calls(), 2);
}

/// Test: Both sources disabled means no results and no upstream calls
#[tokio::test]
async fn test_search_all_disabled() {
    let http = Arc::new(FakeUpstream::default());
    let config = Config {
        enable_subtitle_cat: false,
        enable_thunder: false,
    };
    let search = search_with(http.clone(), &config);

    let results = search
        .search(&SearchQuery::new("LULU-421"), &CancellationToken::new())
        .await;

    assert!(results.is_empty());
    assert_eq!(http.calls(), 0);
}

/// Test: A disabled source contributes nothing
#[tokio::test]
async fn test_search_one_source_disabled() {
    let http = Arc::new(FakeUpstream::default());
    let config = Config {
        enable_subtitle_cat: false,
        enable_thunder: true,
    };
    let search = search_with(http.clone(), &config);

    let results = search
        .search(&SearchQuery::new("LULU-421"), &CancellationToken::new())
        .await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.source_name == "Thunder"));
    assert!(http.requests().iter().all(|url| url.starts_with(THUNDER_URL)));
}

/// Test: A blank title never reaches the upstreams
#[tokio::test]
async fn test_search_blank_title() {
    let http = Arc::new(FakeUpstream::default());
    let search = search_with(http.clone(), &both_enabled());

    for title in ["", "   "] {
        let results = search
            .search(&SearchQuery::new(title), &CancellationToken::new())
            .await;
        assert!(results.is_empty());
    }
    assert_eq!(http.calls(), 0);
}

/// Test: Slow upstreams time out, are retried once, then give up
#[tokio::test]
async fn test_search_timeout_retried_then_empty() {
    let http = Arc::new(FakeUpstream::slow(Duration::from_secs(5)));
    let policy = RetryPolicy {
        max_attempts: 2,
        attempt_timeout: Duration::from_millis(50),
    };
    let search = SubtitleSearch::new(vec![
        Arc::new(SubtitleCatClient::with_base_url(http.clone(), CAT_URL).with_retry(policy)),
        Arc::new(ThunderClient::with_base_url(http.clone(), THUNDER_URL).with_retry(policy)),
    ]);

    let started = std::time::Instant::now();
    let results = search
        .search(&SearchQuery::new("LULU-421"), &CancellationToken::new())
        .await;

    assert!(results.is_empty());
    assert_eq!(http.calls(), 4, "two attempts per source");
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// Test: A cancelled search returns nothing and calls nothing
#[tokio::test]
async fn test_search_cancelled() {
    let http = Arc::new(FakeUpstream::default());
    let search = search_with(http.clone(), &both_enabled());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let results = search.search(&SearchQuery::new("LULU-421"), &cancel).await;

    assert!(results.is_empty());
    assert_eq!(http.calls(), 0);
}

/// Test: Cancelling mid-flight stops slow requests without retrying
#[tokio::test]
async fn test_search_cancelled_mid_flight() {
    let http = Arc::new(FakeUpstream::slow(Duration::from_secs(5)));
    let search = search_with(http.clone(), &both_enabled());

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let results = search.search(&SearchQuery::new("LULU-421"), &cancel).await;

    assert!(results.is_empty());
    assert_eq!(http.calls(), 2, "one attempt per source");
    assert!(started.elapsed() < Duration::from_secs(5));
}

// =============================================================================
// Fetch Routing Tests
// =============================================================================

/// Test: Tokens with a language go to SubtitleCat
#[tokio::test]
async fn test_fetch_routes_catalog_token() {
    let http = Arc::new(FakeUpstream::default());
    let search = search_with(http.clone(), &both_enabled());

    let token = token::encode(&format!("{CAT_URL}/subs/1/LULU-421.html"), "zh-CN");
    let content = search.fetch(&token, &CancellationToken::new()).await;

    assert_eq!(content.language, "zh-CN");
    let bytes = content.into_bytes().await.unwrap();
    assert_eq!(&bytes[..], format!("subtitle from {CAT_URL}/dl/zh.srt").as_bytes());

    assert_eq!(
        http.requests(),
        [
            format!("{CAT_URL}/subs/1/LULU-421.html"),
            format!("{CAT_URL}/dl/zh.srt"),
        ]
    );
}

/// Test: Tokens without a language go to Thunder
#[tokio::test]
async fn test_fetch_routes_oracle_token() {
    let http = Arc::new(FakeUpstream::default());
    let search = search_with(http.clone(), &both_enabled());

    let token = token::encode(&format!("{THUNDER_URL}/files/t2.ass"), "");
    let content = search.fetch(&token, &CancellationToken::new()).await;

    assert_eq!(content.language, "chi");
    assert_eq!(content.format, subhound::SubFormat::Ass);
    assert!(!content.is_empty());
    assert_eq!(http.requests(), [format!("{THUNDER_URL}/files/t2.ass")]);
}

/// Test: A literal URL is treated as a language-less token
#[tokio::test]
async fn test_fetch_routes_literal_url() {
    let http = Arc::new(FakeUpstream::default());
    let search = search_with(http.clone(), &both_enabled());

    let content = search
        .fetch(&format!("{THUNDER_URL}/files/t1.srt"), &CancellationToken::new())
        .await;

    assert_eq!(content.language, "chi");
    assert_eq!(http.requests(), [format!("{THUNDER_URL}/files/t1.srt")]);
}

/// Test: Tokens stay redeemable after their source is disabled
#[tokio::test]
async fn test_fetch_ignores_enable_flags() {
    let http = Arc::new(FakeUpstream::default());
    let config = Config {
        enable_subtitle_cat: false,
        enable_thunder: false,
    };
    let search = search_with(http.clone(), &config);

    let token = token::encode(&format!("{THUNDER_URL}/files/t1.srt"), "");
    let content = search.fetch(&token, &CancellationToken::new()).await;

    assert!(!content.is_empty());
}

/// Test: Search tokens round-trip through fetch
#[tokio::test]
async fn test_search_then_fetch() {
    let http = Arc::new(FakeUpstream::default());
    let search = search_with(http.clone(), &both_enabled());
    let cancel = CancellationToken::new();

    let results = search
        .search(&SearchQuery::new("LULU-421").with_language("zh-CN"), &cancel)
        .await;

    for result in &results {
        let content = search.fetch(&result.token, &cancel).await;
        assert!(!content.is_empty(), "{} should be fetchable", result.display_name);
    }
}

/// Test: Unclaimed tokens yield empty content
#[tokio::test]
async fn test_fetch_unclaimed_token() {
    let http = Arc::new(FakeUpstream::default());
    let only_catalog: Vec<Arc<dyn SubtitleSource>> =
        vec![Arc::new(SubtitleCatClient::with_base_url(http.clone(), CAT_URL))];
    let search = SubtitleSearch::new(only_catalog);

    let token = token::encode(&format!("{THUNDER_URL}/files/t1.srt"), "");
    let content = search.fetch(&token, &CancellationToken::new()).await;

    assert!(content.is_empty());
    assert_eq!(http.calls(), 0);
}

/// Test: A cancelled fetch yields empty content
#[tokio::test]
async fn test_fetch_cancelled() {
    let http = Arc::new(FakeUpstream::default());
    let search = search_with(http.clone(), &both_enabled());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let token = token::encode(&format!("{THUNDER_URL}/files/t1.srt"), "");
    let content = search.fetch(&token, &cancel).await;

    assert!(content.is_empty());
    assert_eq!(http.calls(), 0);
}

/// Test: A `|` inside an oracle URL does not turn its token into a catalog token
#[tokio::test]
async fn test_fetch_routes_oracle_url_with_pipe() {
    let http = Arc::new(FakeUpstream::default());
    let search = search_with(http.clone(), &both_enabled());

    let token = token::encode(&format!("{THUNDER_URL}/files/a|b.srt"), "");
    let content = search.fetch(&token, &CancellationToken::new()).await;

    assert_eq!(content.language, "chi");
    assert_eq!(http.requests(), [format!("{THUNDER_URL}/files/a%7Cb.srt")]);
}
