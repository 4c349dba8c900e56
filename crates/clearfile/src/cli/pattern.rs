//! Pattern command - manage capture patterns
//!
//! Every mutating action re-scores the whole corpus before returning.

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_timestamp, format_values, print_json, print_table};
use crate::cli::{parse_id, CliContext};
use clap::Subcommand;
use clearfile::{capture_variables, template_keys, PatternChange, PatternService, PatternUpdate};
use clearfile_db::Pattern;
use clearfile_ids::{FileId, PatternId};

#[derive(Subcommand, Debug, Clone)]
pub enum PatternAction {
    /// List all patterns
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add an unconfirmed pattern
    Add {
        name: String,
        /// Regular expression searched in each file's full path
        capture: String,
        /// JSON object mapping output keys to "$<group>:<s|d>$" specs
        #[arg(long)]
        template: Option<String>,
    },
    /// Change fields of an existing pattern
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        capture: Option<String>,
        #[arg(long, conflicts_with = "clear_template")]
        template: Option<String>,
        #[arg(long)]
        clear_template: bool,
        #[arg(long)]
        confirmed: Option<bool>,
    },
    /// Save a pattern as confirmed, replacing one with the same name
    Confirm {
        name: String,
        capture: String,
        #[arg(long)]
        template: Option<String>,
    },
    /// Remove a pattern and its extractions
    Remove { id: String },
    /// List the named groups of a capture pattern
    Vars { capture: String },
    /// List the {key} names a rename template uses
    Keys { rename_template: String },
    /// Dry-run a capture pattern against files
    Test {
        /// Comma-separated file ids
        files: String,
        capture: String,
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(ctx: &CliContext, action: PatternAction) -> anyhow::Result<()> {
    let service = PatternService::new(ctx.db.clone(), ctx.reapply_config());

    match action {
        PatternAction::List { json } => {
            let patterns = service.list().await.map_err(HelpfulError::from)?;
            if json {
                return print_json(&patterns);
            }
            print_patterns(&patterns);
            Ok(())
        }
        PatternAction::Add {
            name,
            capture,
            template,
        } => {
            let change = service
                .create(&name, &capture, template.as_deref())
                .await
                .map_err(HelpfulError::from)?;
            report_change("Created", &change);
            Ok(())
        }
        PatternAction::Update {
            id,
            name,
            capture,
            template,
            clear_template,
            confirmed,
        } => {
            let id: PatternId = parse_id("pattern", &id)?;
            let update = PatternUpdate {
                name,
                capture_pattern: capture,
                template: if clear_template { Some(None) } else { template.map(Some) },
                confirmed,
            };
            let change = service.update(id, update).await.map_err(HelpfulError::from)?;
            report_change("Updated", &change);
            Ok(())
        }
        PatternAction::Confirm {
            name,
            capture,
            template,
        } => {
            let change = service
                .confirm(&name, &capture, template.as_deref())
                .await
                .map_err(HelpfulError::from)?;
            report_change("Confirmed", &change);
            Ok(())
        }
        PatternAction::Remove { id } => {
            let id: PatternId = parse_id("pattern", &id)?;
            let summary = service.delete(id).await.map_err(HelpfulError::from)?;
            println!(
                "Removed pattern {} ({} files re-scored, {} without a match)",
                id, summary.files_seen, summary.files_failed
            );
            Ok(())
        }
        PatternAction::Vars { capture } => {
            for name in capture_variables(&capture).map_err(HelpfulError::from)? {
                println!("{}", name);
            }
            Ok(())
        }
        PatternAction::Keys { rename_template } => {
            for key in template_keys(&rename_template) {
                println!("{}", key);
            }
            Ok(())
        }
        PatternAction::Test {
            files,
            capture,
            template,
            json,
        } => {
            let ids = files
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_id::<FileId>("file", s))
                .collect::<Result<Vec<_>, _>>()?;
            let results = service
                .test_pattern(&ids, &capture, template.as_deref())
                .await
                .map_err(HelpfulError::from)?;

            if json {
                return print_json(&results);
            }
            let rows = results
                .iter()
                .map(|(id, values)| {
                    vec![
                        id.to_string(),
                        values
                            .as_ref()
                            .map(format_values)
                            .unwrap_or_else(|| "no match".to_string()),
                    ]
                })
                .collect();
            print_table(&["File", "Extracted"], rows);
            Ok(())
        }
    }
}

fn print_patterns(patterns: &[Pattern]) {
    if patterns.is_empty() {
        println!("No patterns yet. Add one with: clearfile pattern add <name> <capture>");
        return;
    }
    let rows = patterns
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.name.clone(),
                p.capture_pattern.clone(),
                p.template.clone().unwrap_or_else(|| "-".to_string()),
                if p.confirmed { "yes" } else { "no" }.to_string(),
                format_timestamp(p.updated_at),
            ]
        })
        .collect();
    print_table(&["ID", "Name", "Capture", "Template", "Confirmed", "Updated"], rows);
}

fn report_change(verb: &str, change: &PatternChange) {
    println!(
        "{} pattern {} '{}': {} files re-scored, {} extracted, {} without a match",
        verb,
        change.pattern.id,
        change.pattern.name,
        change.reapplied.files_seen,
        change.reapplied.files_extracted,
        change.reapplied.files_failed
    );
}
