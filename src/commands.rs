//! CLI Command Handlers
//!
//! Each handler takes CLI args and Output, returns ExitCode.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use subhound::matching::{extract_code, fingerprint};
use subhound::{CancellationToken, Config, ReqwestFetcher, SearchQuery, SubtitleSearch};

use crate::cli::{CodeCmd, ConfigCmd, ExitCode, FetchCmd, FetchResponse, HashCmd, Output, SearchCmd};

fn searcher(config: &Config) -> SubtitleSearch {
    SubtitleSearch::from_config(config, Arc::new(ReqwestFetcher::new()))
}

// =============================================================================
// Search Command
// =============================================================================

pub async fn search_cmd(
    cmd: SearchCmd,
    config: &Config,
    cancel: &CancellationToken,
    output: &Output,
) -> ExitCode {
    if !config.enable_subtitle_cat && !config.enable_thunder {
        return output.error("All sources are disabled", ExitCode::InvalidArgs);
    }

    let mut query = SearchQuery::new(&cmd.title).with_language(&cmd.lang);
    if let Some(file) = &cmd.file {
        if !file.exists() {
            return output.error(
                format!("File not found: {}", file.display()),
                ExitCode::InvalidArgs,
            );
        }
        query = query.with_local_media(file);
    }

    output.info(format!("Searching subtitles for: {} ({})", cmd.title, query.language));

    let mut results = searcher(config).search(&query, cancel).await;

    if cancel.is_cancelled() {
        return output.error("Cancelled", ExitCode::Error);
    }
    if results.is_empty() {
        return output.error("No subtitles found", ExitCode::NoResults);
    }

    results.truncate(cmd.limit);

    if output.json {
        if let Err(e) = output.print(&results) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        for result in &results {
            println!("{}\n    {}", result, result.token);
        }
    }
    ExitCode::Success
}

// =============================================================================
// Fetch Command
// =============================================================================

pub async fn fetch_cmd(
    cmd: FetchCmd,
    config: &Config,
    cancel: &CancellationToken,
    output: &Output,
) -> ExitCode {
    let content = searcher(config).fetch(&cmd.token, cancel).await;

    if content.is_empty() {
        return output.error("Subtitle download failed", ExitCode::NetworkError);
    }

    let language = content.language.clone();
    let format = content.format;

    let bytes = match content.into_bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            return output.error(format!("Download interrupted: {}", e), ExitCode::NetworkError)
        }
    };

    let written = match &cmd.output {
        Some(path) => tokio::fs::write(path, &bytes).await,
        None => {
            let mut stdout = tokio::io::stdout();
            match stdout.write_all(&bytes).await {
                Ok(()) => stdout.flush().await,
                Err(e) => Err(e),
            }
        }
    };
    if let Err(e) = written {
        return output.error(format!("Failed to write subtitle: {}", e), ExitCode::Error);
    }

    let response = FetchResponse {
        language,
        format: format.extension().to_string(),
        bytes: bytes.len(),
        path: cmd.output.clone(),
    };

    // stdout carries the subtitle itself when no output file is given
    if cmd.output.is_some() {
        if let Err(e) = output.print(&response) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        output.info(format!(
            "Fetched {} bytes ({}, {})",
            response.bytes, response.language, format
        ));
    }
    ExitCode::Success
}

// =============================================================================
// Hash Command
// =============================================================================

pub async fn hash_cmd(cmd: HashCmd, output: &Output) -> ExitCode {
    let path: PathBuf = cmd.file;
    let display = path.display().to_string();

    match tokio::task::spawn_blocking(move || fingerprint(&path)).await {
        Ok(Ok(fp)) => {
            if output.json {
                if let Err(e) = output.print(serde_json::json!({ "file": display, "fingerprint": fp })) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                println!("{}", fp);
            }
            ExitCode::Success
        }
        Ok(Err(e)) => output.error(format!("Cannot read {}: {}", display, e), ExitCode::InvalidArgs),
        Err(e) => output.error(format!("Fingerprint task failed: {}", e), ExitCode::Error),
    }
}

// =============================================================================
// Code Command
// =============================================================================

pub fn code_cmd(cmd: CodeCmd, output: &Output) -> ExitCode {
    match extract_code(&cmd.title) {
        Some(code) => {
            if output.json {
                if let Err(e) = output.print(&code) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                println!("{}", code);
            }
            ExitCode::Success
        }
        None => output.error("No release code found", ExitCode::NoResults),
    }
}

// =============================================================================
// Config Command
// =============================================================================

pub fn config_cmd(cmd: ConfigCmd, config_path: Option<PathBuf>, output: &Output) -> ExitCode {
    let Some(path) = config_path.or_else(Config::path) else {
        return output.error("Could not determine config path", ExitCode::Error);
    };

    let mut config = Config::load_from(&path);

    if cmd.is_update() {
        if let Some(toggle) = cmd.subtitle_cat {
            config.enable_subtitle_cat = toggle.into();
        }
        if let Some(toggle) = cmd.thunder {
            config.enable_thunder = toggle.into();
        }
        if let Err(e) = config.save_to(&path) {
            return output.error(format!("Failed to save config: {}", e), ExitCode::Error);
        }
        output.info(format!("Saved {}", path.display()));
    }

    if let Err(e) = output.print(&config) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}
