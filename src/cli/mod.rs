//! CLI module for awstools
//!
//! This module provides the command-line interface, including argument
//! parsing and subcommand dispatch.

pub mod commands;
pub mod output;

use awstools::session::SessionFlags;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// awstools - operational helpers for AWS
///
/// Resolves configuration documents whose values live in KMS, SSM,
/// Secrets Manager, or local files.
#[derive(Parser, Debug, Clone)]
#[command(name = "awstools")]
#[command(version)]
#[command(about = "Resolve AWS-backed configuration values", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// AWS session options
    #[command(flatten)]
    pub session: SessionFlags,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to settings file (skips the standard locations and AWSTOOLS_CONFIG)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Resolve a configuration document and print the result as JSON
    Resolve(commands::resolve::ResolveArgs),

    /// Resolve a configuration document into environment variables
    Env(commands::env::EnvArgs),

    /// List the placeholders of a configuration document without resolving them
    Inspect(commands::inspect::InspectArgs),

    /// Show the identity of the current credentials
    Whoami(commands::whoami::WhoamiArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-4)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(4)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
