//! # renlib - Opening Library Tool
//!
//! The command-line binary over `renlib-core`.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │             apps/renlib (THE BINARY)          │
//! │                                               │
//! │   ┌─────────────┐        ┌────────────────┐   │
//! │   │    CLI      │        │  AppConfig     │   │
//! │   │   (clap)    │        │  (toml)        │   │
//! │   └──────┬──────┘        └───────┬────────┘   │
//! │          └───────────┬───────────┘            │
//! │                      ▼                        │
//! │              ┌───────────────┐                │
//! │              │  renlib-core  │                │
//! │              │ (THE ENGINE)  │                │
//! │              └───────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! renlib info openings.lib
//! renlib show openings.db --moves "h8 i9 j10"
//! renlib convert openings.lib openings.db --compress
//! renlib --json-mode hash openings.db
//! ```

use clap::Parser;
use renlib::cli;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // RENLIB_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("RENLIB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = EnvFilter::try_from_env("RENLIB_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "renlib=info,renlib_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!("renlib v{} - 15x15 opening library tool\n", env!("CARGO_PKG_VERSION"));
}
