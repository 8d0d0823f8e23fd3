//! subhound - find subtitles on SubtitleCat and Thunder
//!
//! # Usage
//!
//! ```bash
//! subhound search "LULU-421 1080p" --file ./LULU-421.mp4
//! subhound fetch <token> -o LULU-421.srt
//! subhound hash ./LULU-421.mp4
//! subhound config --thunder off
//! ```

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use subhound::{CancellationToken, Config};

use crate::cli::{Cli, Command, ExitCode, Output};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    run_cli(cli).await.into()
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(cli: &Cli) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_filter())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    // Ctrl-C stops in-flight requests instead of killing mid-write
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    match cli.command {
        Command::Search(cmd) => commands::search_cmd(cmd, &config, &cancel, &output).await,
        Command::Fetch(cmd) => commands::fetch_cmd(cmd, &config, &cancel, &output).await,
        Command::Hash(cmd) => commands::hash_cmd(cmd, &output).await,
        Command::Code(cmd) => commands::code_cmd(cmd, &output),
        Command::Config(cmd) => commands::config_cmd(cmd, cli.config.clone(), &output),
    }
}
