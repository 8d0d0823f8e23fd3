//! HTTP transport capability and retry policy
//!
//! Adapters never talk to reqwest directly. They go through `HttpFetch`, so a
//! host can supply its own transport, and through `with_retry`, which bounds
//! every attempt by a timeout and the caller's cancellation token.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{SourceError, TransportError};

/// Per-attempt timeout for every upstream call
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Response body, consumed exactly once
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// A single GET request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: ATTEMPT_TIMEOUT,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Status plus streaming body
pub struct FetchResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail on non-2xx, otherwise hand back the body
    pub fn into_success_body(self) -> Result<ByteStream, TransportError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(TransportError::Status(self.status))
        }
    }
}

/// The outbound HTTP capability the pipeline depends on
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, TransportError>;
}

/// `HttpFetch` backed by a shared reqwest client
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (proxy, TLS roots, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, TransportError> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            response = builder.send() => response?,
        };

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map_err(TransportError::from)
            .boxed();

        Ok(FetchResponse { status, body })
    }
}

/// Drain a body into a string, replacing invalid UTF-8
pub async fn read_to_string(body: ByteStream) -> Result<String, TransportError> {
    let buf = body
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// GET a URL and return the whole body as text (non-2xx is an error)
pub async fn get_text(
    http: &dyn HttpFetch,
    request: &FetchRequest,
    cancel: &CancellationToken,
) -> Result<String, TransportError> {
    let body = http.fetch(request, cancel).await?.into_success_body()?;
    read_to_string(body).await
}

/// Bounded, immediate retries
///
/// No backoff between attempts. Kept deliberately simple; upstreams are
/// queried at most `max_attempts` times per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// One attempt, still timeout- and cancellation-bounded
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }
}

/// Run `op` until it succeeds or the attempt budget is spent
///
/// Each attempt races the timeout and the cancellation token. A timeout counts
/// as a failed attempt; cancellation returns at once without retrying.
pub async fn with_retry<T, F, Fut>(
    source: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, SourceError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SourceError::from(TransportError::Cancelled)),
            timed = tokio::time::timeout(policy.attempt_timeout, op(attempt)) => {
                timed.unwrap_or_else(|_| {
                    Err(TransportError::Timeout(policy.attempt_timeout).into())
                })
            }
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if err.is_cancelled() => {
                tracing::info!(source, "cancelled, not retrying");
                return Err(err);
            }
            Err(err) if attempt >= max_attempts => {
                tracing::error!(source, attempt, max_attempts, %err, "giving up");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(source, attempt, max_attempts, %err, "attempt failed, retrying");
                attempt += 1;
            }
        }
    }
}
