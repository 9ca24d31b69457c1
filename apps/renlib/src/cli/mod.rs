//! # Renlib CLI Module
//!
//! This module implements the CLI interface for renlib.
//!
//! ## Available Commands
//!
//! - `info` - Load a library and report what was read
//! - `show` - Walk a line and print the board with its continuations
//! - `convert` - Rewrite a library in another container or encoding
//! - `hash` - Compute the BLAKE3 digest of a library

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use renlib_core::LibraryError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// renlib - opening library tool for 15x15 boards
///
/// Reads LinkTree (.lib) and FlatRecord (.db) move trees, follows lines
/// through transpositions in any board orientation and converts between
/// the two containers.
#[derive(Parser, Debug)]
#[command(name = "renlib")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Text encoding of annotations (WHATWG label, e.g. utf-8, shift_jis, gbk)
    #[arg(short, long, global = true)]
    pub encoding: Option<String>,

    /// Cap on tree nodes while loading
    #[arg(long, global = true)]
    pub max_nodes: Option<u32>,

    /// Seed of the position hash keys
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a library and report what was read
    Info {
        /// Library file (.lib or .db)
        file: PathBuf,
    },

    /// Walk a line and print the board with its continuations
    Show {
        /// Library file (.lib or .db)
        file: PathBuf,

        /// Moves in letter + row notation, e.g. "h8 i9 j10"
        #[arg(short, long)]
        moves: Option<String>,

        /// Moves as an SGF record, e.g. "(;B[hh];W[ig])"
        #[arg(long, conflicts_with = "moves")]
        sgf: Option<String>,
    },

    /// Rewrite a library in the container implied by the output extension
    Convert {
        /// Source library
        input: PathBuf,

        /// Destination (.db writes FlatRecord, anything else LinkTree)
        output: PathBuf,

        /// Encoding of the written annotations (defaults to the read encoding)
        #[arg(long)]
        to_encoding: Option<String>,

        /// Wrap FlatRecord output in an LZ4 frame
        #[arg(long)]
        compress: bool,
    },

    /// Compute the BLAKE3 digest of a library, independent of its container
    Hash {
        /// Library file (.lib or .db)
        file: PathBuf,
    },
}

impl Cli {
    /// Configuration file values overridden by the flags given.
    pub fn resolve_config(&self) -> Result<AppConfig, LibraryError> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(encoding) = &self.encoding {
            config.encoding.clone_from(encoding);
        }
        if let Some(max_nodes) = self.max_nodes {
            config.library.max_nodes = max_nodes;
        }
        if let Some(seed) = self.seed {
            config.symmetry_seed = Some(seed);
        }
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), LibraryError> {
    let config = cli.resolve_config()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Info { file } => cmd_info(&config, &file, json_mode),
        Commands::Show { file, moves, sgf } => {
            let line = LineInput::from_args(moves.as_deref(), sgf.as_deref());
            cmd_show(&config, &file, &line, json_mode)
        }
        Commands::Convert {
            input,
            output,
            to_encoding,
            compress,
        } => cmd_convert(
            &config,
            &input,
            &output,
            to_encoding.as_deref(),
            compress || config.compress,
            json_mode,
        ),
        Commands::Hash { file } => cmd_hash(&config, &file, json_mode),
    }
}
