//! Clearfile command-line interface
//!
//! Index directories, author capture patterns, and copy files under names
//! built from the metadata the patterns extract.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clearfile_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

use cli::apply::{ApplyArgs, ReapplyArgs};
use cli::files::FilesAction;
use cli::index::IndexArgs;
use cli::pattern::PatternAction;
use cli::rename::{RenameArgs, RequestAction};
use cli::CliContext;

#[derive(Parser, Debug)]
#[command(name = "clearfile", version, about = "Infer metadata from file paths and rename files from it")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.clearfile/config.toml)
    #[arg(long, global = true, env = "CLEARFILE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add every file under a directory to the index
    Index {
        dir: PathBuf,
        /// Re-score all files once indexing finishes
        #[arg(long)]
        reapply: bool,
        #[arg(long)]
        json: bool,
    },
    /// Browse indexed files
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },
    /// Manage capture patterns
    Pattern {
        #[command(subcommand)]
        action: PatternAction,
    },
    /// Run every pattern against one file
    Apply {
        file_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Re-score files against patterns, page by page
    Reapply {
        /// "all" or comma-separated file ids
        #[arg(long, default_value = "all")]
        files: String,
        /// Comma-separated ids of confirmed patterns to apply instead of all patterns
        #[arg(long)]
        patterns: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Copy a pattern's files under names rendered from their extracted info
    Rename {
        pattern_id: String,
        /// Rename template such as "{year}_{filename}"; every key must exist
        template: String,
        destination: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Recorded rename-and-copy runs
    Request {
        #[command(subcommand)]
        action: RequestAction,
    },
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Index { json, .. }
        | Commands::Apply { json, .. }
        | Commands::Reapply { json, .. }
        | Commands::Rename { json, .. } => *json,
        Commands::Files { action } => match action {
            FilesAction::List { json, .. } | FilesAction::Show { json, .. } => *json,
        },
        Commands::Pattern { action } => match action {
            PatternAction::List { json } | PatternAction::Test { json, .. } => *json,
            _ => false,
        },
        Commands::Request { action } => match action {
            RequestAction::Create { json, .. }
            | RequestAction::List { json, .. }
            | RequestAction::Show { json, .. } => *json,
        },
    }
}

async fn run_command(cli: Cli) -> Result<()> {
    let ctx = CliContext::open(cli.config.as_deref()).await?;

    let result = match cli.command {
        Commands::Index { dir, reapply, json } => {
            cli::index::run(&ctx, IndexArgs { dir, reapply, json }).await
        }
        Commands::Files { action } => cli::files::run(&ctx, action).await,
        Commands::Pattern { action } => cli::pattern::run(&ctx, action).await,
        Commands::Apply { file_id, json } => {
            cli::apply::run_apply(&ctx, ApplyArgs { file_id, json }).await
        }
        Commands::Reapply {
            files,
            patterns,
            json,
        } => {
            cli::apply::run_reapply(
                &ctx,
                ReapplyArgs {
                    files,
                    patterns,
                    json,
                },
            )
            .await
        }
        Commands::Rename {
            pattern_id,
            template,
            destination,
            json,
        } => {
            cli::rename::run_rename(
                &ctx,
                RenameArgs {
                    pattern_id,
                    template,
                    destination,
                    json,
                },
            )
            .await
        }
        Commands::Request { action } => cli::rename::run_request(&ctx, action).await,
    };

    ctx.db.close().await;
    result
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    if let Err(e) = init_logging(LogConfig {
        app_name: "clearfile",
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", e);
    }

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
        .and_then(|runtime| runtime.block_on(run_command(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{}", err);
            }
            ExitCode::from(1)
        }
    }
}
