//! subhound - subtitle search and matching
//!
//! Finds subtitles for a video by querying SubtitleCat and the Thunder oracle,
//! ranks the candidates, and later redeems an opaque token for the subtitle
//! bytes. Tokens are self-contained, so no state is kept between the two steps.
//!
//! # Modules
//!
//! - `models` - Queries, candidates, subtitle content
//! - `matching` - Release codes, similarity, content fingerprints
//! - `token` - Reversible result tokens
//! - `parse` - Upstream HTML/JSON scrapers
//! - `transport` - HTTP capability, timeouts and retries
//! - `api` - The two subtitle sources
//! - `search` - Orchestrator used by the host
//! - `config` - Source toggles

pub mod api;
pub mod config;
pub mod error;
pub mod matching;
pub mod models;
pub mod parse;
pub mod search;
pub mod token;
pub mod transport;

// Re-export commonly used types
pub use models::{
    CandidateResult, Fingerprint, ReleaseCode, SearchQuery, SubFormat, SubtitleContent,
};

pub use api::{SubtitleCatClient, SubtitleSource, ThunderClient};
pub use config::Config;
pub use error::{SourceError, TokenError, TransportError};
pub use search::SubtitleSearch;
pub use transport::{HttpFetch, ReqwestFetcher};

// Cancellation is part of the public contract
pub use tokio_util::sync::CancellationToken;
