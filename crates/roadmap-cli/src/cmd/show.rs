//! `rmap show`: one roadmap item with this client's vote state.

use crate::cmd::list::ItemView;
use crate::output::{CliError, OutputMode, pretty_kv, pretty_rule, render_error, render_mode};
use crate::project::Project;
use clap::Args;
use roadmap_core::controller::VoteButtonState;
use roadmap_core::error::ErrorCode;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Item ID to display.
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ShowOutput {
    #[serde(flatten)]
    pub item: ItemView,
    pub button: VoteButtonState,
    /// 1-based position within its bucket's display order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
}

/// Execute `rmap show <id>`.
///
/// # Errors
///
/// Returns an error if the project cannot be loaded or the item is unknown.
pub fn run_show(
    args: &ShowArgs,
    output: OutputMode,
    project_root: &std::path::Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let ctl = project.controller(output)?;

    let Some(item) = ctl.catalog().get(&args.id) else {
        render_error(
            output,
            &CliError::from_code(
                ErrorCode::ItemNotFound,
                format!("item '{}' not found", args.id),
            ),
        )?;
        anyhow::bail!("item '{}' not found", args.id);
    };

    let groups = ctl.groups();
    let rank = [
        groups.in_progress.as_slice(),
        groups.up_next.as_slice(),
        groups.future.all(),
        groups.shipped.as_slice(),
    ]
    .into_iter()
    .find_map(|bucket| bucket.iter().position(|shown| shown.id == item.id))
    .map(|pos| pos + 1);

    let shown = ShowOutput {
        item: ItemView::new(item, ctl.ledger().has_voted(&item.id)),
        button: ctl.button_state(&item.id),
        rank,
    };
    render_mode(output, &shown, render_text, render_pretty)
}

fn render_text(shown: &ShowOutput, w: &mut dyn Write) -> io::Result<()> {
    let item = &shown.item;
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{}",
        item.id, item.priority, item.status, item.votes, shown.button, item.title
    )
}

fn render_pretty(shown: &ShowOutput, w: &mut dyn Write) -> io::Result<()> {
    let item = &shown.item;
    writeln!(w, "{}", item.title)?;
    pretty_rule(w)?;
    pretty_kv(w, "id", &item.id)?;
    pretty_kv(w, "priority", &item.priority)?;
    pretty_kv(w, "status", &item.status)?;
    pretty_kv(w, "votes", item.votes.to_string())?;
    if let Some(rank) = shown.rank {
        pretty_kv(w, "rank", format!("#{rank}"))?;
    }
    if let Some(ref completed) = item.completed_at {
        pretty_kv(w, "shipped", completed)?;
    } else {
        let button = match shown.button {
            VoteButtonState::Voted => "voted (run `rmap vote` again to withdraw)",
            VoteButtonState::Unvoted => "not voted",
        };
        pretty_kv(w, "your vote", button)?;
    }
    if !item.description.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", item.description)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadmap_core::catalog::ItemStore;

    fn shown(id: &str, voted: bool) -> ShowOutput {
        let catalog = ItemStore::seeded().expect("seed");
        let item = catalog.get(id).expect("seed item");
        ShowOutput {
            item: ItemView::new(item, voted),
            button: VoteButtonState::from_voted(voted),
            rank: Some(1),
        }
    }

    #[test]
    fn json_flattens_item_fields() {
        let value = serde_json::to_value(shown("mobile-app", true)).expect("serialize");
        assert_eq!(value["id"], "mobile-app");
        assert_eq!(value["priority"], "future");
        assert_eq!(value["votes"], 58);
        assert_eq!(value["button"], "voted");
        assert_eq!(value["rank"], 1);
    }

    #[test]
    fn pretty_shows_shipped_date_instead_of_vote() {
        let mut buf = Vec::new();
        render_pretty(&shown("dark-mode", false), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("2026-09-14"));
        assert!(!text.contains("your vote"));
    }

    #[test]
    fn text_is_one_row() {
        let mut buf = Vec::new();
        render_text(&shown("sso", false), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text, "sso\tfuture\tplanned\t23\tunvoted\tSingle sign-on\n");
    }
}
