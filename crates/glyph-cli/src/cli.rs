//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Glyph mapping pipeline - validate, synchronize, and minify mapping files
#[derive(Parser, Debug)]
#[command(name = "glyphmap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root directory of the mapping repository
    #[arg(short = 'd', long, env = "GLYPHMAP_DIR", default_value = ".")]
    pub mappings_dir: PathBuf,

    /// Restrict the run to one domain (repeatable)
    #[arg(long = "domain", value_name = "DOMAIN")]
    pub domains: Vec<String>,

    /// JSON file of extra domain configs, merged over the built-ins
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Compute everything but write nothing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the full pipeline: validate, clean, synchronize, minify
    Run,

    /// Validate and normalize mapping files without touching the network
    Validate,

    /// Synchronize hash tables without writing minified copies
    Sync,
}
