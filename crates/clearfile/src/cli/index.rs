//! Index command - add a directory tree to the database

use crate::cli::error::HelpfulError;
use crate::cli::output::{print_json, print_table};
use crate::cli::CliContext;
use clearfile::{Indexer, Reapplier};
use std::path::PathBuf;

#[derive(Debug)]
pub struct IndexArgs {
    pub dir: PathBuf,
    /// Re-score every file once indexing is done
    pub reapply: bool,
    pub json: bool,
}

pub async fn run(ctx: &CliContext, args: IndexArgs) -> anyhow::Result<()> {
    if !args.dir.exists() {
        return Err(HelpfulError::new(format!("Path not found: {}", args.dir.display()))
            .with_suggestion("TRY: Check for typos in the path")
            .into());
    }

    let indexer = Indexer::new(ctx.db.clone(), ctx.config.index_batch_size);
    let summary = indexer
        .index_directory(&args.dir)
        .await
        .map_err(HelpfulError::from)?;

    let reapplied = if args.reapply {
        Some(
            Reapplier::new(ctx.db.clone(), ctx.reapply_config())
                .reapply_all()
                .await
                .map_err(HelpfulError::from)?,
        )
    } else {
        None
    };

    if args.json {
        return print_json(&serde_json::json!({ "index": summary, "reapply": reapplied }));
    }

    let mut rows = vec![
        vec!["Found".to_string(), summary.files_found.to_string()],
        vec!["Added".to_string(), summary.files_added.to_string()],
        vec!["Already indexed".to_string(), summary.already_indexed.to_string()],
        vec!["Skipped".to_string(), summary.skipped.to_string()],
    ];
    if let Some(r) = reapplied {
        rows.push(vec!["Extracted".to_string(), r.files_extracted.to_string()]);
        rows.push(vec!["No match".to_string(), r.files_failed.to_string()]);
    }
    print_table(&["", "Files"], rows);
    Ok(())
}
