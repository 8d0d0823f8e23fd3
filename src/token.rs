//! Stateless result tokens
//!
//! A token is standard base64 of `"<url>|<language>"`, or of `"<url>"` alone
//! when there is no language. Everything `fetch` needs travels inside the
//! token, so it stays valid across process restarts.
//!
//! A literal `|` in a URL would read as the separator, so `encode` writes it
//! as `%7C`. Tokens minted elsewhere with a raw `|` in the URL are split at
//! the last `|`: a catalog URL survives, but a language-less URL containing
//! `|` decodes with a bogus language and is routed as a catalog token.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::TokenError;

const SEPARATOR: char = '|';
const ESCAPED_SEPARATOR: &str = "%7C";

/// Decoded contents of a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleToken {
    pub url: String,
    pub language: Option<String>,
}

/// Encode a download location and requested language
pub fn encode(url: &str, language: &str) -> String {
    let url = url.replace(SEPARATOR, ESCAPED_SEPARATOR);
    if language.is_empty() {
        STANDARD.encode(url)
    } else {
        STANDARD.encode(format!("{url}{SEPARATOR}{language}"))
    }
}

/// Strict decode: anything that is not a well-formed token is an error
pub fn decode(token: &str) -> Result<SubtitleToken, TokenError> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|e| TokenError::MalformedToken(e.to_string()))?;
    let payload =
        String::from_utf8(bytes).map_err(|e| TokenError::MalformedToken(e.to_string()))?;

    let (url, language) = match payload.rsplit_once(SEPARATOR) {
        Some((url, language)) if !language.is_empty() => (url, Some(language.to_string())),
        Some((url, _)) => (url, None),
        None => (payload.as_str(), None),
    };

    if url.is_empty() {
        return Err(TokenError::MalformedToken("empty url".to_string()));
    }

    Ok(SubtitleToken {
        url: url.to_string(),
        language,
    })
}

/// Lenient decode: an undecodable token is taken as a literal URL
///
/// The fallback never invents a language; `language` is `None`.
pub fn decode_lenient(token: &str) -> SubtitleToken {
    decode(token).unwrap_or_else(|err| {
        tracing::debug!(%err, "token is not base64, using it as a literal url");
        SubtitleToken {
            url: token.trim().to_string(),
            language: None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_with_language() {
        let pairs = [
            ("https://subtitlecat.com/subs/12/LULU-421.html", "zh-CN"),
            ("https://example.com/a b/字幕.srt?x=1&y=2", "en"),
            ("http://127.0.0.1:1234/path", "zh-Hant"),
        ];
        for (url, lang) in pairs {
            let token = decode(&encode(url, lang)).unwrap();
            assert_eq!(token.url, url);
            assert_eq!(token.language.as_deref(), Some(lang));
        }
    }

    #[test]
    fn test_round_trip_without_language() {
        let token = decode(&encode("https://cdn.example.com/s.ass", "")).unwrap();
        assert_eq!(token.url, "https://cdn.example.com/s.ass");
        assert_eq!(token.language, None);
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(encode("u", "zh"), STANDARD.encode("u|zh"));
        assert_eq!(encode("https://a/b", ""), "aHR0cHM6Ly9hL2I=");
    }

    #[test]
    fn test_distinct_urls_give_distinct_tokens() {
        assert_ne!(encode("https://a/1", "en"), encode("https://a/2", "en"));
        assert_ne!(encode("https://a/1", "en"), encode("https://a/1", "fr"));
    }

    #[test]
    fn test_pipe_in_url_is_escaped() {
        let token = decode(&encode("https://cdn.example.com/a|b.srt", "")).unwrap();
        assert_eq!(token.url, "https://cdn.example.com/a%7Cb.srt");
        assert_eq!(token.language, None);

        let token = decode(&encode("https://subtitlecat.com/subs/a|b.html", "zh-CN")).unwrap();
        assert_eq!(token.url, "https://subtitlecat.com/subs/a%7Cb.html");
        assert_eq!(token.language.as_deref(), Some("zh-CN"));
    }

    #[test]
    fn test_foreign_token_splits_at_last_pipe() {
        let token = decode(&STANDARD.encode("https://subtitlecat.com/a|b.html|en")).unwrap();
        assert_eq!(token.url, "https://subtitlecat.com/a|b.html");
        assert_eq!(token.language.as_deref(), Some("en"));

        // Known limitation: a raw `|` in a language-less URL reads as a language
        let token = decode(&STANDARD.encode("https://cdn.example.com/a|b.srt")).unwrap();
        assert_eq!(token.url, "https://cdn.example.com/a");
        assert_eq!(token.language.as_deref(), Some("b.srt"));
    }

    #[test]
    fn test_strict_rejects_garbage() {
        assert!(matches!(
            decode("not base64 at all!"),
            Err(TokenError::MalformedToken(_))
        ));
        // Valid base64 of invalid UTF-8
        assert!(decode(&STANDARD.encode([0xff, 0xfe])).is_err());
        // Empty url segment
        assert!(decode(&STANDARD.encode("|zh-CN")).is_err());
    }

    #[test]
    fn test_lenient_falls_back_to_literal_url() {
        let token = decode_lenient("https://example.com/sub.srt");
        assert_eq!(token.url, "https://example.com/sub.srt");
        assert_eq!(token.language, None);
    }
}
