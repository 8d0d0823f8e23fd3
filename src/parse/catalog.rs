//! SubtitleCat HTML parsing

use scraper::{Html, Selector};
use std::sync::LazyLock;

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("row selector is valid"));
static ROW_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td a[href]").expect("row link selector is valid"));
static DOWNLOAD_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[id^="download_"][href]"#).expect("download selector is valid")
});

/// Anchor found in a search-result table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRow {
    /// Entity-decoded link text
    pub title: String,
    pub href: String,
}

/// Language-tagged download anchor on a detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    /// Suffix of the anchor's `download_<lang>` id
    pub language: String,
    pub href: String,
}

/// First anchor inside a cell of every table row, in document order
///
/// Only rows without a linked cell are dropped. Anchors with blank text or an
/// empty or `#` href are still returned, so they take up a result slot; the
/// caller decides what to skip.
pub fn parse_search_rows(html: &str) -> Vec<SearchRow> {
    let document = Html::parse_document(html);

    document
        .select(&ROW)
        .filter_map(|row| {
            let link = row.select(&ROW_LINK).next()?;
            let title = link.text().collect::<String>().trim().to_string();
            Some(SearchRow {
                title,
                href: link.value().attr("href").unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

/// Every `download_<lang>` anchor, in document order
pub fn parse_download_links(html: &str) -> Vec<DownloadLink> {
    let document = Html::parse_document(html);

    document
        .select(&DOWNLOAD_LINK)
        .filter_map(|a| {
            let id = a.value().id()?;
            let href = a.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            Some(DownloadLink {
                language: id.trim_start_matches("download_").to_string(),
                href: href.to_string(),
            })
        })
        .collect()
}
