//! Rename and request commands - copy matched files under rendered names

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_timestamp, print_json, print_table};
use crate::cli::{parse_id, CliContext};
use clap::Subcommand;
use clearfile::{ChangeService, OutcomeStatus};
use clearfile_db::{ChangeRequest, TargetStatus};
use clearfile_ids::{ChangeRequestId, PatternId};
use std::path::PathBuf;

#[derive(Debug)]
pub struct RenameArgs {
    pub pattern_id: String,
    pub template: String,
    pub destination: PathBuf,
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RequestAction {
    /// Copy a pattern's files and record the run
    Create {
        pattern_id: String,
        /// Rename template such as "{year}_{filename}"
        template: String,
        destination: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List recorded change requests, newest first
    List {
        #[arg(long, default_value = "1")]
        page: u64,
        #[arg(long, default_value = "20")]
        per_page: u64,
        #[arg(long)]
        json: bool,
    },
    /// Show one change request with its per-file targets
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
}

fn service(ctx: &CliContext) -> ChangeService {
    ChangeService::new(ctx.db.clone(), ctx.config.missing_placeholder.clone())
}

pub async fn run_rename(ctx: &CliContext, args: RenameArgs) -> anyhow::Result<()> {
    let pattern_id: PatternId = parse_id("pattern", &args.pattern_id)?;
    let report = service(ctx)
        .rename_and_copy(pattern_id, &args.template, &args.destination)
        .await
        .map_err(HelpfulError::from)?;

    if args.json {
        return print_json(&report);
    }

    let rows = report
        .details
        .iter()
        .map(|d| {
            vec![
                d.original_path.clone().unwrap_or_else(|| format!("file {}", d.file_id)),
                d.new_path.clone().unwrap_or_else(|| "-".to_string()),
                match d.status {
                    OutcomeStatus::Success => "copied".to_string(),
                    OutcomeStatus::Failed => d.reason.clone().unwrap_or_else(|| "failed".to_string()),
                },
            ]
        })
        .collect();
    print_table(&["Source", "Target", "Result"], rows);
    println!("{} copied, {} failed", report.success_count, report.failed_count);
    Ok(())
}

pub async fn run_request(ctx: &CliContext, action: RequestAction) -> anyhow::Result<()> {
    let service = service(ctx);

    match action {
        RequestAction::Create {
            pattern_id,
            template,
            destination,
            json,
        } => {
            let pattern_id: PatternId = parse_id("pattern", &pattern_id)?;
            let request = service
                .create_change_request(pattern_id, &template, &destination)
                .await
                .map_err(HelpfulError::from)?;
            if json {
                return print_json(&request);
            }
            print_request(&request);
            Ok(())
        }
        RequestAction::List {
            page,
            per_page,
            json,
        } => {
            let per_page = per_page.max(1);
            let requests = service
                .list_change_requests(page.saturating_sub(1) * per_page, per_page)
                .await
                .map_err(HelpfulError::from)?;
            if json {
                return print_json(&requests);
            }
            let rows = requests
                .iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        r.pattern_id.to_string(),
                        r.rename_template.clone(),
                        r.destination_path.clone(),
                        format!("{}/{}", r.success_count, r.success_count + r.failed_count),
                        format_timestamp(r.created_at),
                    ]
                })
                .collect();
            print_table(&["ID", "Pattern", "Template", "Destination", "Copied", "Created"], rows);
            let total = service.count_change_requests().await.map_err(HelpfulError::from)?;
            println!("Page {} ({} requests total)", page.max(1), total);
            Ok(())
        }
        RequestAction::Show { id, json } => {
            let id: ChangeRequestId = parse_id("change request", &id)?;
            let request = service
                .get_change_request(id)
                .await
                .map_err(HelpfulError::from)?
                .ok_or_else(|| {
                    HelpfulError::new(format!("Change request not found: {}", id))
                        .with_suggestion("TRY: clearfile request list")
                })?;
            if json {
                return print_json(&request);
            }
            print_request(&request);
            Ok(())
        }
    }
}

fn print_request(request: &ChangeRequest) {
    let rows = request
        .targets
        .iter()
        .map(|t| {
            vec![
                t.original_file_id.to_string(),
                t.new_filename.clone(),
                match t.status {
                    TargetStatus::Copied => "copied".to_string(),
                    TargetStatus::Failed => "failed".to_string(),
                },
                t.message.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["File", "New name", "Status", "Message"], rows);
    println!(
        "Request {}: {} copied, {} failed into {}",
        request.id, request.success_count, request.failed_count, request.destination_path
    );
}
