use anyhow::Result;
use clap::Args;
use clap::Subcommand;
use extracts_workflow::ApprovalAuthority;
use extracts_workflow::ClientConfig;
use extracts_workflow::ForwardStep;
use extracts_workflow::HttpBackend;
use extracts_workflow::Milestone;
use extracts_workflow::OfficerField;
use extracts_workflow::OfficerId;
use extracts_workflow::PendingState;
use extracts_workflow::ProgressionEngine;
use extracts_workflow::SessionLayout;
use extracts_workflow::SessionState;
use extracts_workflow::iso_timestamp;
use std::sync::Arc;

#[derive(Debug, Subcommand)]
pub enum WorkflowSubcommand {
    /// Start a new workflow draft, discarding the current one.
    New(NewArgs),
    /// Set the initiator of the current draft.
    Initiator(InitiatorArgs),
    /// Edit the officers table.
    Officer(OfficerCli),
    /// Submit the draft to the backend (step 1).
    Initiate,
    /// Advance the workflow to the next milestone (steps 3-6).
    Forward(ForwardArgs),
    /// Replay transitions that were only committed locally.
    Sync,
    /// Show the current draft and its timeline.
    Status,
}

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Initiator of the new workflow.
    #[arg(long, value_name = "NAME")]
    pub initiator: Option<String>,
}

#[derive(Debug, Args)]
pub struct InitiatorArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct OfficerCli {
    #[command(subcommand)]
    pub action: OfficerAction,
}

#[derive(Debug, Subcommand)]
pub enum OfficerAction {
    /// Append a blank officer row.
    Add,
    /// Remove an officer row. The last row is always kept.
    Remove {
        #[arg(value_name = "ID")]
        id: OfficerId,
    },
    /// Set one field, e.g. `set 2 icNo S1234567A` or `set 2 brigBApproval approved`.
    Set {
        #[arg(value_name = "ID")]
        id: OfficerId,
        #[arg(value_name = "FIELD")]
        field: OfficerField,
        #[arg(value_name = "VALUE", default_value = "")]
        value: String,
    },
}

#[derive(Debug, Args)]
pub struct ForwardArgs {
    /// Step number: 3 colonel, 4 library, 5 MS 3, 6 close.
    #[arg(value_name = "STEP")]
    pub step: ForwardStep,
}

pub async fn execute(command: WorkflowSubcommand, config: &ClientConfig) -> Result<()> {
    let layout = SessionLayout::new(config.session_dir.clone());
    let session_path = layout.session_file();
    let session = SessionState::load_or_default(&session_path)?;

    if let WorkflowSubcommand::Status = command {
        print_status(&session);
        return Ok(());
    }

    let backend = HttpBackend::from_config(config)?;
    let engine = ProgressionEngine::new(Arc::new(backend), config.fallback)
        .with_state(session.draft, session.pending);

    let result = run(command, &engine).await;

    let (draft, pending) = engine.into_parts();
    layout.ensure_root()?;
    SessionState::new(draft, pending).save(&session_path)?;
    result
}

async fn run(command: WorkflowSubcommand, engine: &ProgressionEngine) -> Result<()> {
    match command {
        WorkflowSubcommand::New(args) => {
            engine.reset(args.initiator.as_deref()).await?;
            println!("Started a new workflow draft.");
        }
        WorkflowSubcommand::Initiator(args) => {
            engine.set_initiator(&args.name).await?;
            println!("Initiator set to {}.", args.name);
        }
        WorkflowSubcommand::Officer(cli) => edit_officers(cli.action, engine).await?,
        WorkflowSubcommand::Initiate => {
            let outcome = engine.initiate().await?;
            println!("{}", outcome.notice());
        }
        WorkflowSubcommand::Forward(args) => {
            let outcome = engine.forward(args.step).await?;
            println!("{}", outcome.notice());
        }
        WorkflowSubcommand::Sync => {
            let report = engine.reconcile().await?;
            for milestone in &report.confirmed {
                println!("Confirmed {}", milestone.title());
            }
            if let Some((milestone, message)) = &report.rejected {
                println!("Rejected {}: {message}", milestone.title());
            }
            println!("{} transition(s) still unconfirmed.", report.remaining);
        }
        WorkflowSubcommand::Status => {}
    }
    Ok(())
}

async fn edit_officers(action: OfficerAction, engine: &ProgressionEngine) -> Result<()> {
    match action {
        OfficerAction::Add => {
            let draft = engine.edit_officers(|draft| draft.add_officer()).await?;
            if let Some(officer) = draft.officers.last() {
                println!("Added officer {}.", officer.id);
            }
        }
        OfficerAction::Remove { id } => {
            let before = engine.snapshot().await;
            let draft = engine
                .edit_officers(|draft| Ok(draft.remove_officer(id)))
                .await?;
            if draft.officers.len() < before.officers.len() {
                println!("Removed officer {id}.");
            } else if before.officers.len() == 1 {
                println!("The last officer row cannot be removed.");
            } else {
                println!("No officer with id {id}.");
            }
        }
        OfficerAction::Set { id, field, value } => {
            let draft = engine
                .edit_officers(|draft| draft.update_officer_field(id, field, &value))
                .await?;
            if draft.officer(id).is_some() {
                println!("Officer {id}: {field} updated.");
            } else {
                println!("No officer with id {id}.");
            }
        }
    }
    Ok(())
}

fn print_status(session: &SessionState) {
    let draft = &session.draft;
    let initiator = if draft.initiator.trim().is_empty() {
        "(not set)"
    } else {
        draft.initiator.as_str()
    };
    let status = draft
        .status()
        .map_or_else(|| "NOT STARTED".to_string(), |status| status.label());
    println!("Initiator: {initiator}");
    println!(
        "Status: {status} ({}% complete)",
        draft.timeline.progress_percent()
    );

    println!("Officers:");
    for (serial, officer) in draft.officers.iter().enumerate() {
        let approvals = ApprovalAuthority::ALL
            .into_iter()
            .map(|authority| {
                format!(
                    "{} {}",
                    authority.label(),
                    officer.approval(authority).symbol()
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {:>2}. [id {}] {:<12} {:<20} {:<16} {approvals}",
            serial + 1,
            officer.id,
            officer.ic_no,
            officer.name,
            officer.deputation,
        );
    }

    println!("Timeline:");
    for milestone in Milestone::ALL {
        let recorded = draft
            .timeline
            .get(milestone)
            .map_or_else(|| "pending".to_string(), |at| iso_timestamp(&at));
        println!(
            "  Step {}: {:<26} {recorded}",
            milestone.step_number(),
            milestone.title()
        );
    }

    if !session.pending.is_empty() {
        println!("Not yet confirmed by the backend:");
        for entry in &session.pending {
            let state = match entry.state {
                PendingState::Unconfirmed => "unconfirmed",
                PendingState::Rejected => "rejected",
            };
            println!(
                "  {} at {} ({state}, {} attempt(s)): {}",
                entry.milestone.title(),
                iso_timestamp(&entry.timestamp),
                entry.attempts,
                entry
                    .last_error
                    .as_deref()
                    .unwrap_or("No error recorded yet."),
            );
        }
    }
}
