//! Data structures shared across the pipeline
//!
//! - **Query**: what the host asks for
//! - **Candidates**: ranked search results with opaque tokens
//! - **Content**: the subtitle byte stream handed back by `fetch`
//! - **Identifiers**: release codes and content fingerprints

use bytes::Bytes;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::TransportError;
use crate::transport::ByteStream;

/// Language used when the host does not name one
pub const DEFAULT_LANGUAGE: &str = "zh-CN";

// =============================================================================
// Query
// =============================================================================

/// Immutable input to a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text title, usually the media file's display name
    pub title: String,
    /// BCP-47-like language tag (e.g. "zh-CN")
    pub language: String,
    /// Local media file, used for fingerprint matching
    pub local_media_path: Option<PathBuf>,
}

impl SearchQuery {
    /// Create a query with the default language and no local file
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            local_media_path: None,
        }
    }

    /// Set the requested language (blank falls back to the default)
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        self.language = if language.trim().is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            language.trim().to_string()
        };
        self
    }

    /// Attach the local media file
    pub fn with_local_media(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_media_path = Some(path.into());
        self
    }
}

// =============================================================================
// Subtitle Format
// =============================================================================

/// Subtitle file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubFormat {
    #[default]
    Srt,
    #[serde(rename = "vtt")]
    WebVtt,
    Sub,
    Ass,
}

impl SubFormat {
    /// Parse format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "srt" => SubFormat::Srt,
            "vtt" | "webvtt" => SubFormat::WebVtt,
            "sub" => SubFormat::Sub,
            "ass" | "ssa" => SubFormat::Ass,
            _ => SubFormat::Srt,
        }
    }

    /// Infer format from a download URL (query string and fragment ignored)
    ///
    /// Only `.ass` and `.vtt` are recognised; everything else is SRT.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
        if path.ends_with(".ass") {
            SubFormat::Ass
        } else if path.ends_with(".vtt") {
            SubFormat::WebVtt
        } else {
            SubFormat::Srt
        }
    }

    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            SubFormat::Srt => "srt",
            SubFormat::WebVtt => "vtt",
            SubFormat::Sub => "sub",
            SubFormat::Ass => "ass",
        }
    }
}

impl fmt::Display for SubFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubFormat::Srt => write!(f, "SRT"),
            SubFormat::WebVtt => write!(f, "WebVTT"),
            SubFormat::Sub => write!(f, "SUB"),
            SubFormat::Ass => write!(f, "ASS"),
        }
    }
}

// =============================================================================
// Candidates
// =============================================================================

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Opaque, self-describing token redeemed by `fetch`
    pub token: String,
    pub display_name: String,
    pub source_name: String,
    pub format: SubFormat,
    pub rank: f32,
    /// Local fingerprint matched the upstream content id
    pub is_exact_match: bool,
}

impl fmt::Display for CandidateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_exact_match { " ★" } else { "" };
        write!(
            f,
            "[{}] {} ({}, {:.0}){}",
            self.source_name, self.display_name, self.format, self.rank, marker
        )
    }
}

// =============================================================================
// Content
// =============================================================================

/// Subtitle bytes returned by `fetch`
///
/// `Default` is the "nothing found" value: no stream, empty tags.
#[derive(Default)]
pub struct SubtitleContent {
    pub language: String,
    pub format: SubFormat,
    pub stream: Option<ByteStream>,
}

impl SubtitleContent {
    pub fn new(language: impl Into<String>, format: SubFormat, stream: ByteStream) -> Self {
        Self {
            language: language.into(),
            format,
            stream: Some(stream),
        }
    }

    /// True when the fetch produced nothing
    pub fn is_empty(&self) -> bool {
        self.stream.is_none()
    }

    /// Drain the stream into memory
    pub async fn into_bytes(self) -> Result<Bytes, TransportError> {
        match self.stream {
            Some(stream) => {
                let buf = stream
                    .try_fold(Vec::new(), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        Ok(acc)
                    })
                    .await?;
                Ok(Bytes::from(buf))
            }
            None => Ok(Bytes::new()),
        }
    }
}

impl fmt::Debug for SubtitleContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtitleContent")
            .field("language", &self.language)
            .field("format", &self.format)
            .field("stream", &self.stream.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Canonical, uppercase release code such as "ABC-123"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseCode(String);

impl ReleaseCode {
    pub(crate) fn new(code: &str) -> Self {
        Self(code.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 40-character uppercase hex SHA-1 over sampled slices of a media file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(digest.iter().map(|b| format!("{:02X}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against an upstream content id, ignoring case
    pub fn matches(&self, cid: &str) -> bool {
        self.0.eq_ignore_ascii_case(cid.trim())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
