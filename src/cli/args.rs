//! Command-line argument parsing
//!
//! Clap-based CLI with subcommands and verbosity control.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Product assistant over local reviews, with web-search fallback
#[derive(Parser, Debug)]
#[command(name = "prodassist")]
#[command(version)]
#[command(about = "E-commerce product assistant with an agentic RAG workflow", long_about = None)]
pub struct Args {
    /// Question to answer in one shot
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Conversation thread to continue
    #[arg(short, long, default_value = "default_thread")]
    pub thread: String,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP chat interface
    Serve {
        /// Bind host (overrides configuration)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides configuration)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the MCP tool server on stdio
    McpServer,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Check the query/subcommand combination
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_none() && self.query.is_none() {
            return Err(
                "Query required. Use 'prodassist <QUERY>' or run a subcommand.".to_string(),
            );
        }

        if self.command.is_some() && self.query.is_some() {
            return Err("Cannot specify a query with a subcommand.".to_string());
        }

        Ok(())
    }
}

impl Verbosity {
    /// Default tracing level for this verbosity
    pub fn log_level(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
        }
    }
}
