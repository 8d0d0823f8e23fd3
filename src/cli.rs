//! CLI - Command Line Interface for subhound
//!
//! A scriptable host for the search-and-match pipeline. All output is
//! JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Search both sources, boosting exact matches of a local file
//! subhound search "LULU-421 1080p" --file ./LULU-421.mp4
//!
//! # Redeem a token from the search output
//! subhound fetch aHR0cHM6Ly9zdWJ0aXRsZWNhdC5jb20vc3Vicy8xL2EuaHRtbHx6aC1DTg== -o sub.srt
//!
//! # Turn a source off
//! subhound config --thunder off
//! ```

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Nothing found
    NoResults = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// subhound - find subtitles on SubtitleCat and Thunder
#[derive(Parser, Debug)]
#[command(
    name = "subhound",
    version,
    about = "Find and download subtitles from SubtitleCat and Thunder",
    long_about = "Searches SubtitleCat and the Thunder oracle for subtitles, ranks \
                  the results, and downloads the one you pick by its token.\n\n\
                  Pass --file to fingerprint a local video; Thunder results whose \
                  content id matches are marked as exact matches.",
    after_help = "EXAMPLES:\n\
                  subhound search \"LULU-421\"                 Search both sources\n\
                  subhound search \"LULU-421\" -f video.mp4    Boost exact matches\n\
                  subhound fetch <token> -o sub.srt          Download a result\n\
                  subhound config --subtitle-cat off         Disable a source"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }

    /// Default tracing filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search for subtitles
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Download a subtitle by token
    #[command(visible_alias = "f")]
    Fetch(FetchCmd),

    /// Print the content fingerprint of a local file
    Hash(HashCmd),

    /// Print the release code extracted from a title
    Code(CodeCmd),

    /// Show or change source toggles
    Config(ConfigCmd),
}

// =============================================================================
// Search Command
// =============================================================================

/// Search both sources for a title
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Title or file name (a release code is extracted when present)
    #[arg(required = true)]
    pub title: String,

    /// Subtitle language tag
    #[arg(long, short = 'l', default_value = "zh-CN")]
    pub lang: String,

    /// Local video file, fingerprinted for exact matches
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Maximum number of results
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

// =============================================================================
// Fetch Command
// =============================================================================

/// Download the subtitle behind a search token
#[derive(Args, Debug)]
pub struct FetchCmd {
    /// Token from `search` output
    #[arg(required = true)]
    pub token: String,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

// =============================================================================
// Hash / Code Commands
// =============================================================================

/// Fingerprint a local media file
#[derive(Args, Debug)]
pub struct HashCmd {
    #[arg(required = true)]
    pub file: PathBuf,
}

/// Extract a release code from a title
#[derive(Args, Debug)]
pub struct CodeCmd {
    #[arg(required = true)]
    pub title: String,
}

// =============================================================================
// Config Command
// =============================================================================

/// Show the config, or update the given toggles
#[derive(Args, Debug)]
pub struct ConfigCmd {
    /// Enable or disable SubtitleCat
    #[arg(long, value_enum)]
    pub subtitle_cat: Option<Toggle>,

    /// Enable or disable Thunder
    #[arg(long, value_enum)]
    pub thunder: Option<Toggle>,
}

impl ConfigCmd {
    /// True when the command changes something
    pub fn is_update(&self) -> bool {
        self.subtitle_cat.is_some() || self.thunder.is_some()
    }
}

/// On/off switch
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    #[value(alias = "true")]
    On,
    #[value(alias = "false")]
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> bool {
        toggle == Toggle::On
    }
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Metadata printed after a download
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchResponse {
    pub language: String,
    pub format: String,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
