use anyhow::Result;
use anyhow::bail;
use chrono::Utc;
use clap::Args;
use clap::Subcommand;
use extracts_workflow::ClientConfig;
use extracts_workflow::DateWindow;
use extracts_workflow::DeleteOutcome;
use extracts_workflow::ExportFormat;
use extracts_workflow::ExportView;
use extracts_workflow::HttpBackend;
use extracts_workflow::SessionLayout;
use extracts_workflow::WorkflowBackend;
use extracts_workflow::WorkflowFilter;
use extracts_workflow::WorkflowId;
use extracts_workflow::WorkflowRecord;
use extracts_workflow::WorkflowStatus;
use extracts_workflow::bulk_file_name;
use extracts_workflow::deputation_counts;
use extracts_workflow::officer_rollup;
use extracts_workflow::status_counts;
use extracts_workflow::summarize;
use extracts_workflow::workflow_file_name;
use extracts_workflow::workflow_json;
use extracts_workflow::write_export;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum AdminSubcommand {
    /// List stored workflows.
    List(ListArgs),
    /// Counts by status and deputation.
    Analytics,
    /// Every officer across all workflows.
    Officers,
    /// Aggregate counters reported by the backend.
    Stats,
    /// Download all workflows as CSV or JSON.
    Export(ExportArgs),
    /// Save one workflow as a JSON document.
    ExportOne(ExportOneArgs),
    /// Delete a stored workflow.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Match initiator, id, officer name or IC number.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// initiated, in_progress or closed.
    #[arg(long, value_name = "STATUS")]
    pub status: Option<WorkflowStatus>,

    /// all, today, week or month.
    #[arg(long, value_name = "WINDOW", default_value = "all")]
    pub since: DateWindow,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(long, value_name = "FORMAT", default_value = "csv")]
    pub format: ExportFormat,

    /// Output directory; defaults to the session's exports directory.
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Name the file the way the full list view does.
    #[arg(long = "all-view")]
    pub all_view: bool,
}

#[derive(Debug, Args)]
pub struct ExportOneArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    /// Confirm the deletion.
    #[arg(long)]
    pub yes: bool,
}

pub async fn execute(command: AdminSubcommand, config: &ClientConfig) -> Result<()> {
    let layout = SessionLayout::new(config.session_dir.clone());
    // Refuse before touching the network.
    if let AdminSubcommand::Delete(args) = &command {
        if !args.yes {
            bail!("refusing to delete workflow {} without --yes", args.id);
        }
    }

    let backend = HttpBackend::from_config(config)?;
    match command {
        AdminSubcommand::List(args) => {
            let records = backend.list().await?;
            let filter = WorkflowFilter {
                search: args.search,
                status: args.status,
                since: args.since,
            };
            print_list(&records, &filter);
        }
        AdminSubcommand::Analytics => {
            let records = backend.list().await?;
            println!("By status:");
            for (status, count) in status_counts(&records) {
                println!("  {:<12} {count}", status.label());
            }
            println!("By deputation:");
            for (deputation, count) in deputation_counts(&records) {
                println!("  {deputation:<20} {count}");
            }
        }
        AdminSubcommand::Officers => {
            let records = backend.list().await?;
            for entry in officer_rollup(&records) {
                println!(
                    "{:<6} {:<20} {:<12} {:<20} {}",
                    entry.workflow_id.as_str(),
                    entry.initiator,
                    entry.officer.ic_no,
                    entry.officer.name,
                    entry.officer.deputation,
                );
            }
        }
        AdminSubcommand::Stats => {
            let stats = backend.stats().await?;
            println!("Total workflows: {}", stats.total_workflows);
            println!("In progress:     {}", stats.in_progress_workflows);
            println!("Closed:          {}", stats.closed_workflows);
            println!("Total officers:  {}", stats.total_officers);
        }
        AdminSubcommand::Export(args) => {
            let contents = backend.export(args.format).await?;
            let view = if args.all_view {
                ExportView::List
            } else {
                ExportView::Dashboard
            };
            let name = bulk_file_name(view, args.format, Utc::now().date_naive());
            let dir = match args.out {
                Some(dir) => dir,
                None => layout.ensure_exports_dir()?,
            };
            let path = write_export(&dir, &name, &contents)?;
            info!(path = %path.display(), "bulk export written");
            println!("Exported to {}", path.display());
        }
        AdminSubcommand::ExportOne(args) => {
            let records = backend.list().await?;
            let Some(record) = records.iter().find(|record| record.id.as_str() == args.id) else {
                bail!("workflow {} not found", args.id);
            };
            let dir = match args.out {
                Some(dir) => dir,
                None => layout.ensure_exports_dir()?,
            };
            let path = write_export(&dir, &workflow_file_name(record), &workflow_json(record)?)?;
            println!("Exported to {}", path.display());
        }
        AdminSubcommand::Delete(args) => {
            let id = WorkflowId::new(args.id);
            match backend.delete(&id).await? {
                DeleteOutcome::Deleted => println!("Workflow {id} deleted successfully"),
                DeleteOutcome::NotFound => println!("Workflow {id} not found"),
            }
        }
    }
    Ok(())
}

fn print_list(records: &[WorkflowRecord], filter: &WorkflowFilter) {
    let summary = summarize(records);
    println!(
        "{} workflows, {} closed, {} in progress",
        summary.total, summary.closed, summary.in_progress
    );
    let shown = filter.apply(records, Utc::now());
    if shown.is_empty() {
        println!("No workflows match.");
        return;
    }
    for record in shown {
        let status = record
            .status()
            .map_or_else(|| "-".to_string(), |status| status.label());
        let created = record
            .created_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d").to_string());
        println!(
            "{:<6} {:<20} {:<12} {:>3}%  {:>2} officer(s)  {created}",
            record.id.as_str(),
            record.initiator,
            status,
            record.timeline.progress_percent(),
            record.officers.len(),
        );
    }
}
