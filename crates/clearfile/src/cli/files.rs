//! Files command - browse indexed files and their extracted info

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_size, format_timestamp, format_values, print_json, print_table};
use crate::cli::{parse_id, CliContext};
use clap::Subcommand;
use clearfile_db::{FileQuery, FileSortField, SortOrder};
use clearfile_ids::FileId;

#[derive(Subcommand, Debug, Clone)]
pub enum FilesAction {
    /// List indexed files, one page at a time
    List {
        /// Only files whose name contains this text
        #[arg(long)]
        filename: Option<String>,
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u64,
        #[arg(long, default_value = "50")]
        per_page: u64,
        /// Sort column: id, filename, extension, directory, size, created_at
        #[arg(long, default_value = "id")]
        sort: String,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show one file with its extraction state
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(ctx: &CliContext, action: FilesAction) -> anyhow::Result<()> {
    match action {
        FilesAction::List {
            filename,
            page,
            per_page,
            sort,
            desc,
            json,
        } => {
            let sort = FileSortField::parse(&sort).ok_or_else(|| {
                HelpfulError::new(format!("Unknown sort column: {}", sort))
                    .with_suggestion("TRY: id, filename, extension, directory, size, created_at")
            })?;
            let per_page = per_page.max(1);
            let query = FileQuery {
                skip: page.saturating_sub(1) * per_page,
                limit: per_page,
                sort,
                order: if desc { SortOrder::Desc } else { SortOrder::Asc },
                filename: filename.clone(),
            };

            let files = ctx.db.list_files(&query).await?;
            let total = ctx.db.count_files(filename.as_deref()).await?;

            if json {
                return print_json(&serde_json::json!({ "total": total, "files": files }));
            }

            let rows = files
                .iter()
                .map(|f| {
                    vec![
                        f.id.to_string(),
                        f.full_path.clone(),
                        format_size(f.size),
                        if f.extraction_failed {
                            "failed".to_string()
                        } else {
                            format_values(&f.extracted_info)
                        },
                    ]
                })
                .collect();
            print_table(&["ID", "Path", "Size", "Extracted"], rows);
            println!("Page {} ({} of {} files)", page.max(1), files.len(), total);
            Ok(())
        }
        FilesAction::Show { id, json } => {
            let id: FileId = parse_id("file", &id)?;
            let file = ctx
                .db
                .get_file(id)
                .await?
                .ok_or_else(|| HelpfulError::from(clearfile::ClearfileError::FileNotFound(id)))?;
            let extractions = ctx.db.extractions_for_file(id).await?;

            if json {
                return print_json(&serde_json::json!({ "file": file, "extractions": extractions }));
            }

            let pattern = extractions
                .first()
                .map(|e| e.pattern_id.to_string())
                .unwrap_or_else(|| "-".to_string());
            print_table(
                &["Field", "Value"],
                vec![
                    vec!["ID".to_string(), file.id.to_string()],
                    vec!["Path".to_string(), file.full_path.clone()],
                    vec!["Size".to_string(), format_size(file.size)],
                    vec!["Pattern".to_string(), pattern],
                    vec!["Extracted".to_string(), format_values(&file.extracted_info)],
                    vec![
                        "Failure".to_string(),
                        file.extraction_failure_reason.clone().unwrap_or_else(|| "-".to_string()),
                    ],
                    vec!["Updated".to_string(), format_timestamp(file.updated_at)],
                ],
            );
            Ok(())
        }
    }
}
