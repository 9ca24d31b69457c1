//! # renlib
//!
//! Library half of the `renlib` binary: command-line parsing, command
//! implementations and configuration loading, exposed for integration tests.

pub mod cli;
pub mod config;
