//! CLI for the MDL media download manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use mdl_core::config;
use std::path::PathBuf;

use commands::{run_completions, run_get, GetOptions};

/// Top-level CLI for the MDL media download manager.
#[derive(Debug, Parser)]
#[command(name = "mdl")]
#[command(about = "MDL: parallel downloader for media files and HLS playlists", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs with live progress.
    Get {
        /// URLs to download. `.m3u8` playlists are fetched segment by segment and merged.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Output file (single URL) or directory (default: current directory).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Replace destination files that already exist instead of skipping them.
        #[arg(long)]
        overwrite: bool,

        /// Files downloaded at once (overrides config).
        #[arg(long, value_name = "N")]
        concurrent_files: Option<usize>,

        /// Range or segment workers per file (overrides config).
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
    },

    /// Print a shell completion script to stdout.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Get {
                urls,
                output,
                overwrite,
                concurrent_files,
                threads,
            } => {
                let mut cfg = config::load_or_init()?;
                if let Some(n) = concurrent_files {
                    cfg.concurrent_files = n;
                }
                if let Some(n) = threads {
                    cfg.per_file_threads = n;
                }
                tracing::debug!("loaded config: {:?}", cfg);
                let opts = GetOptions {
                    urls,
                    output,
                    overwrite,
                };
                run_get(cfg.normalized(), opts).await?;
            }
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}
