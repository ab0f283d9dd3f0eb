//! quickmov CLI - MOV/MP4 container inspector
//!
//! Command-line front end over the quickmov demuxer: show container and
//! stream facts, dump the merged sample index, exercise keyframe seeking.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// quickmov - MOV/QuickTime/MP4 container inspector
#[derive(Parser, Debug)]
#[command(name = "quickmov")]
#[command(about = "Inspect MOV/MP4 containers: streams, samples, keyframe seeking", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show container, stream, frame-rate and bit-rate information
    Info {
        /// Movie file path
        #[arg(short, long)]
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short = 'F', long, default_value = "text")]
        format: String,
    },

    /// List the merged sample index
    Samples {
        /// Movie file path
        #[arg(short, long)]
        file: PathBuf,

        /// Maximum number of samples to list
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,

        /// Only show samples of one stream id
        #[arg(short, long)]
        stream: Option<u32>,

        /// Output format (text, json)
        #[arg(short = 'F', long, default_value = "text")]
        format: String,
    },

    /// Seek to a timestamp and show where the cursor lands
    Seek {
        /// Movie file path
        #[arg(short, long)]
        file: PathBuf,

        /// Target timestamp in microseconds
        #[arg(short, long)]
        at: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level.parse().unwrap_or(tracing::Level::WARN))
        .init();

    match cli.command {
        Commands::Info { file, format } => {
            commands::info::run(file, &format)?;
        }
        Commands::Samples {
            file,
            limit,
            stream,
            format,
        } => {
            commands::samples::run(file, limit, stream, &format)?;
        }
        Commands::Seek { file, at } => {
            commands::seek::run(file, at)?;
        }
    }

    Ok(())
}
