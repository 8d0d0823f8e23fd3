//! Pure matching helpers
//!
//! - `code`: release-code extraction from noisy titles
//! - `similarity`: lexical closeness between query and candidate titles
//! - `fingerprint`: partial-file content hash for exact-match detection

pub mod code;
pub mod fingerprint;
pub mod similarity;

pub use code::extract_code;
pub use fingerprint::fingerprint;
pub use similarity::similarity;
