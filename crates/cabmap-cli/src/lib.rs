//! Library side of the `cabmap` command-line tool
//!
//! Holds the subcommand definitions and their handlers so they can be
//! exercised without spawning the binary.

pub mod commands;
pub mod config;
pub mod output;
pub mod progress;

pub use crate::commands::{
    build::handle as handle_build, inspect::handle as handle_inspect,
    query::handle as handle_query,
};

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Arguments of the `build` command
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Wrapper files to index, in order; builtin resource files go last
    pub paths: Vec<PathBuf>,

    /// Index every wrapper file found below this directory
    #[arg(short, long, conflicts_with = "paths")]
    pub dir: Option<PathBuf>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum QueryCommands {
    /// Show statistics about the persisted index
    Info {
        /// List every missing dependency reference
        #[arg(long)]
        missing: bool,
    },

    /// List CAB ids stored in wrappers whose path contains a fragment
    Find {
        /// Path fragment to search for
        fragment: String,
    },

    /// Show one entry and everything it depends on
    Show {
        /// CAB id
        cab: String,
    },

    /// Expand a request list with every wrapper it depends on
    Resolve {
        /// Requested wrapper paths
        #[arg(required = true)]
        files: Vec<String>,
    },
}

/// Arguments of the `inspect` command
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Wrapper file to scan
    pub path: PathBuf,

    /// Also list the external references of each serialized entry
    #[arg(short, long)]
    pub externals: bool,
}

/// Output format
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

impl OutputFormat {
    /// Whether the output is machine readable
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_debug() {
        assert_eq!(format!("{:?}", OutputFormat::Text), "Text");
        assert_eq!(format!("{:?}", OutputFormat::Json), "Json");
        assert_eq!(format!("{:?}", OutputFormat::JsonPretty), "JsonPretty");
    }

    #[test]
    fn test_output_format_is_json() {
        assert!(!OutputFormat::Text.is_json());
        assert!(OutputFormat::Json.is_json());
        assert!(OutputFormat::JsonPretty.is_json());
    }
}
