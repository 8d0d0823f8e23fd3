//! Title similarity scoring
//!
//! Jaccard similarity over the sets of distinct characters. This ignores
//! order and frequency, so it is only a rough relevance signal.

use std::collections::HashSet;

/// Score lexical closeness of two strings in `[0, 1]`
///
/// Case-insensitive. Either string empty scores `0.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a: HashSet<char> = a.to_lowercase().chars().collect();
    let b: HashSet<char> = b.to_lowercase().chars().collect();

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}
