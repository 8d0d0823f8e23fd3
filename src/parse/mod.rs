//! Upstream response parsers
//!
//! Text in, plain structs out. Adapters only see these functions, so either
//! scraper can be replaced without touching request or ranking logic.
//!
//! - `catalog`: SubtitleCat HTML (search table, detail-page download links)
//! - `oracle`: Thunder's loosely structured JSON

pub mod catalog;
pub mod oracle;
