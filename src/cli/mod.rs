//! CLI argument definitions for the blueprint tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::merge::Policy;

/// Blueprint - a living project-planning document set.
///
/// Feed it a model (YAML or JSON) and it scaffolds or incrementally merges
/// a set of markdown documents with embedded diagrams, preserving the
/// human-authored regions of every file.
#[derive(Parser, Debug)]
#[command(name = "bp")]
#[command(author, version, about = "Maintain a blueprint document set from model patches", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Blueprint directory to operate on.
    /// Can also be set via the BP_DIR environment variable.
    #[arg(
        short = 'C',
        long = "dir",
        global = true,
        env = "BP_DIR",
        default_value = "blueprint"
    )]
    pub dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold the document set from a full model (replaces existing content)
    Generate {
        /// Model file (.yaml, .yml, or .json)
        input: PathBuf,

        /// Compute the report and changed-file list without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Merge a model patch into the existing document set
    Append {
        /// Patch file (.yaml, .yml, or .json)
        input: PathBuf,

        /// Default disposition for conflicts without an explicit resolution
        #[arg(long, value_enum, default_value_t = Policy::KeepOld)]
        policy: Policy,

        /// Resolutions file mapping entity_type:id:field to an action
        #[arg(long)]
        resolutions: Option<PathBuf>,

        /// Inline resolution, e.g. story:US-1:title=use_new or
        /// capability:C-9:title=manual:Invoicing (repeatable)
        #[arg(long = "resolve", value_name = "SPEC")]
        resolve: Vec<String>,

        /// Compute the report and changed-file list without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the model assembled from the current document set
    Model {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Assemble the document set and report warnings without writing
    Check,
}
