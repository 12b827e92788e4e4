use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dropforge")]
#[command(author, version, about = "Local batch file converter")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert one or more files to a target format
    Convert {
        /// Input files to convert
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Target format (e.g. jpg, mp3); auto-selected when omitted
        #[arg(short, long)]
        format: Option<String>,

        /// Directory for converted files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Show recognized input kinds and their legal output formats
    Formats {
        /// Optional file names to classify
        files: Vec<String>,
    },

    /// Verify that the transcoding engine can be loaded
    CheckEngine,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
