//! Thunder oracle JSON scanning
//!
//! The oracle's payload is not reliably well-formed, so it is scanned rather
//! than deserialized: the top-level `result` field is checked, then every
//! innermost `{...}` fragment is searched for the fields of one subtitle,
//! in any order. Fragments that cannot be read are skipped.

use regex::Regex;
use std::sync::LazyLock;

static RESULT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""result"\s*:\s*"(\w+)""#).expect("result pattern is valid")
});

/// Innermost brace-delimited fragment
static FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("fragment pattern is valid"));

static NAME: LazyLock<Regex> = LazyLock::new(|| string_field("name"));
static URL: LazyLock<Regex> = LazyLock::new(|| string_field("url"));
static EXT: LazyLock<Regex> = LazyLock::new(|| string_field("ext"));
static CID: LazyLock<Regex> = LazyLock::new(|| string_field("cid"));
static SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""score"\s*:\s*"?(-?\d+(?:\.\d+)?)"#).expect("score pattern is valid")
});

fn string_field(key: &str) -> Regex {
    Regex::new(&format!(r#""{key}"\s*:\s*"((?:[^"\\]|\\.)*)""#))
        .expect("string field pattern is valid")
}

/// One subtitle entry as the oracle describes it
#[derive(Debug, Clone, PartialEq)]
pub struct OracleItem {
    pub name: String,
    /// Download URL with JSON escapes removed
    pub url: String,
    pub ext: Option<String>,
    /// Upstream content fingerprint
    pub cid: Option<String>,
    pub score: f64,
}

/// True when the top-level `result` field equals `"ok"`
pub fn is_ok(json: &str) -> bool {
    RESULT_FIELD
        .captures(json)
        .is_some_and(|caps| &caps[1] == "ok")
}

/// Every readable subtitle fragment, in document order
///
/// Fragments missing `name` or `url` are skipped. A missing or unparsable
/// `score` reads as 0.
pub fn parse_items(json: &str) -> Vec<OracleItem> {
    FRAGMENT
        .find_iter(json)
        .filter_map(|fragment| parse_fragment(fragment.as_str()))
        .collect()
}

fn parse_fragment(fragment: &str) -> Option<OracleItem> {
    let name = capture(&NAME, fragment)?;
    let url = capture(&URL, fragment)?;
    if url.is_empty() {
        return None;
    }

    let score = SCORE
        .captures(fragment)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .unwrap_or(0.0);

    Some(OracleItem {
        name,
        url,
        ext: capture(&EXT, fragment).filter(|s| !s.is_empty()),
        cid: capture(&CID, fragment).filter(|s| !s.is_empty()),
        score,
    })
}

fn capture(re: &Regex, fragment: &str) -> Option<String> {
    re.captures(fragment).map(|caps| unescape(&caps[1]))
}

/// Undo JSON string escapes (`\/`, `\"`, `\uXXXX`, ...)
///
/// Falls back to only un-escaping forward slashes if the literal is invalid.
fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\""))
        .unwrap_or_else(|_| raw.replace("\\/", "/"))
}
