//! Apply and reapply commands - run patterns against indexed files

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_values, print_json, print_table};
use crate::cli::{parse_id, CliContext};
use clearfile::{ExtractionSync, FileSelection, ReapplyCancelToken, ReapplySummary, Reapplier};
use clearfile_ids::{FileId, PatternId};
use tracing::warn;

#[derive(Debug)]
pub struct ApplyArgs {
    pub file_id: String,
    pub json: bool,
}

#[derive(Debug)]
pub struct ReapplyArgs {
    /// `all` or comma-separated file ids
    pub files: String,
    /// Comma-separated confirmed pattern ids; every pattern when absent
    pub patterns: Option<String>,
    pub json: bool,
}

pub async fn run_apply(ctx: &CliContext, args: ApplyArgs) -> anyhow::Result<()> {
    let id: FileId = parse_id("file", &args.file_id)?;
    let file = ExtractionSync::new(ctx.db.clone())
        .apply_to_file(id)
        .await
        .map_err(HelpfulError::from)?;

    if args.json {
        return print_json(&file);
    }
    println!("{}: {}", file.full_path, format_values(&file.extracted_info));
    Ok(())
}

pub async fn run_reapply(ctx: &CliContext, args: ReapplyArgs) -> anyhow::Result<()> {
    let selection = FileSelection::parse(&args.files).map_err(|e| {
        HelpfulError::new(format!("Invalid file selection: {}", e))
            .with_suggestion("TRY: --files all, or --files 3,7,12")
    })?;

    let token = ReapplyCancelToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current page");
            ctrl_c.cancel();
        }
    });

    let reapplier = Reapplier::new(ctx.db.clone(), ctx.reapply_config()).with_cancel_token(token);
    let summary = match &args.patterns {
        Some(list) => {
            let ids = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_id::<PatternId>("pattern", s))
                .collect::<Result<Vec<_>, _>>()?;
            reapplier.apply_saved_patterns(&ids, &selection).await
        }
        None => reapplier.reapply_subset(&selection).await,
    }
    .map_err(HelpfulError::from)?;

    if args.json {
        return print_json(&summary);
    }
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &ReapplySummary) {
    print_table(
        &["", "Files"],
        vec![
            vec!["Seen".to_string(), summary.files_seen.to_string()],
            vec!["Extracted".to_string(), summary.files_extracted.to_string()],
            vec!["No match".to_string(), summary.files_failed.to_string()],
            vec!["Errors".to_string(), summary.errors.to_string()],
        ],
    );
    if summary.cancelled {
        println!("Cancelled after {} pages", summary.pages);
    }
}
