//! Release code extraction
//!
//! Pulls identifiers like "ABC-123" or "390JAC-177" out of free-text titles so
//! upstream searches use the code instead of the noisy full title.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::ReleaseCode;

/// Optional digits, 2-10 letters, dash, 2-7 digits
static DASHED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d*[a-z]{2,10}-\d{2,7}").expect("dashed code pattern is valid")
});

/// 2-6 letters immediately followed by 5-8 digits
static UNDASHED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-z]{2,6}\d{5,8}").expect("undashed code pattern is valid")
});

/// Extract the release code from a title
///
/// The dashed pattern wins whenever it matches anywhere in the title; the
/// undashed pattern is only tried when it does not. Returns `None` when the
/// title carries no code, in which case callers search with the raw title.
pub fn extract_code(title: &str) -> Option<ReleaseCode> {
    if title.trim().is_empty() {
        return None;
    }

    DASHED_CODE
        .find(title)
        .or_else(|| UNDASHED_CODE.find(title))
        .map(|m| ReleaseCode::new(m.as_str()))
}
