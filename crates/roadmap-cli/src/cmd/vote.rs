//! `rmap vote`: toggle this client's vote on a live roadmap item.

use crate::output::{CliError, OutputMode, render_error, render_mode};
use crate::project::Project;
use anyhow::Result;
use clap::Args;
use roadmap_core::controller::VoteButtonState;
use roadmap_core::error::ErrorCode;
use roadmap_core::ledger::VoteDelta;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

#[derive(Args, Debug)]
pub struct VoteArgs {
    /// Item ID to vote for. Voting again withdraws the vote.
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct VoteOutput {
    pub item_id: String,
    pub title: String,
    pub delta: VoteDelta,
    pub votes: u32,
    pub state: VoteButtonState,
    /// Whether the vote record survives this process.
    pub persistent: bool,
}

/// Execute `rmap vote <id>`.
///
/// # Errors
///
/// Returns an error if the project cannot be loaded, the id is not a live
/// item, or the updated catalog cannot be written.
pub fn run_vote(args: &VoteArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let mut ctl = project.controller(output)?;

    let catalog = ctl.catalog();
    let shipped = catalog.shipped().iter().any(|item| item.id == args.id);
    match catalog.get(&args.id) {
        None => {
            render_error(
                output,
                &CliError::from_code(
                    ErrorCode::ItemNotFound,
                    format!("item '{}' not found", args.id),
                ),
            )?;
            anyhow::bail!("item '{}' not found", args.id);
        }
        Some(_) if shipped => {
            render_error(
                output,
                &CliError::with_details(
                    format!("item '{}' has shipped and no longer takes votes", args.id),
                    "Vote on an in-progress, up-next or future item instead.",
                    ErrorCode::InvalidItem.code(),
                ),
            )?;
            anyhow::bail!("item '{}' has shipped", args.id);
        }
        Some(_) => {}
    }

    let outcome = ctl.toggle_vote(&args.id);
    let Some(votes) = outcome.votes else {
        anyhow::bail!("item '{}' is not a live roadmap item", args.id);
    };

    // Counts on disk move only together with a durable vote record.
    let persistent = ctl.ledger().is_persistent();
    if persistent {
        project.save_catalog(ctl.catalog())?;
    } else if !output.is_json() {
        eprintln!("note: the vote record is not durable; this vote counts for this run only");
    }
    info!(item_id = %outcome.item_id, delta = %outcome.delta, votes, persistent, "vote toggled");

    let title = ctl
        .catalog()
        .get(&args.id)
        .map(|item| item.title.clone())
        .unwrap_or_default();
    let result = VoteOutput {
        item_id: outcome.item_id,
        title,
        delta: outcome.delta,
        votes,
        state: outcome.state,
        persistent,
    };
    render_mode(output, &result, render_text, render_pretty)
}

fn render_text(result: &VoteOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}",
        result.item_id, result.delta, result.votes, result.state
    )
}

fn render_pretty(result: &VoteOutput, w: &mut dyn Write) -> io::Result<()> {
    match result.state {
        VoteButtonState::Voted => writeln!(
            w,
            "★ Voted for {} ({} votes)",
            result.title, result.votes
        ),
        VoteButtonState::Unvoted => writeln!(
            w,
            "Vote withdrawn from {} ({} votes)",
            result.title, result.votes
        ),
    }
}
