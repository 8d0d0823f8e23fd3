//! Integration tests for subhound
//!
//! Tests are organized by component:
//! - fingerprint_test: Partial-file SHA-1 layout
//! - subtitlecat_test: SubtitleCat scraping and download fallbacks (mockito)
//! - thunder_test: Thunder oracle ranking and exact matches (mockito)
//! - search_test: Orchestration, timeouts, cancellation, token routing
//! - cli_test: Binary exit codes and JSON output

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
