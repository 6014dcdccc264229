//! `rmap list`: the roadmap in four buckets.
//!
//! In progress and up next keep curator order; future is ordered by votes and
//! paged; shipped is most recent first.

use crate::output::{CliError, OutputMode, pretty_section, render_error, render_mode};
use crate::project::Project;
use clap::Args;
use roadmap_core::controller::RoadmapController;
use roadmap_core::error::ErrorCode;
use roadmap_core::model::{Priority, RoadmapItem};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Extra pages of future items to show beyond the first.
    #[arg(long, default_value_t = 0)]
    pub more: usize,

    /// Show every future item.
    #[arg(long, conflicts_with = "more")]
    pub all: bool,

    /// Only show one tier: in-progress, up-next or future.
    #[arg(long)]
    pub tier: Option<String>,
}

/// One item row, as rendered by `list` and `show`.
#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub priority: String,
    pub status: String,
    pub votes: u32,
    pub voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl ItemView {
    pub fn new(item: &RoadmapItem, voted: bool) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            priority: item.priority.to_string(),
            status: item.status.to_string(),
            votes: item.votes,
            voted,
            completed_at: item.completed_at.map(|at| at.format("%Y-%m-%d").to_string()),
        }
    }

    fn marker(&self) -> &'static str {
        if self.voted { "★" } else { " " }
    }
}

#[derive(Debug, Serialize)]
pub struct ListOutput {
    pub in_progress: Vec<ItemView>,
    pub up_next: Vec<ItemView>,
    pub future: Vec<ItemView>,
    /// Future items beyond the shown window.
    pub future_remaining: usize,
    pub shipped: Vec<ItemView>,
}

impl ListOutput {
    fn from_controller(ctl: &RoadmapController) -> Self {
        let view = |items: &[RoadmapItem]| -> Vec<ItemView> {
            items
                .iter()
                .map(|item| ItemView::new(item, ctl.ledger().has_voted(&item.id)))
                .collect()
        };
        Self {
            in_progress: view(ctl.in_progress()),
            up_next: view(ctl.up_next()),
            future: view(ctl.future()),
            future_remaining: ctl.future_bucket().remaining(),
            shipped: view(ctl.shipped()),
        }
    }

    /// Keep only the bucket for `tier`.
    fn only(mut self, tier: Priority) -> Self {
        if tier != Priority::InProgress {
            self.in_progress.clear();
        }
        if tier != Priority::UpNext {
            self.up_next.clear();
        }
        if tier != Priority::Future {
            self.future.clear();
            self.future_remaining = 0;
        }
        self.shipped.clear();
        self
    }

    fn buckets(&self) -> [(&'static str, &[ItemView]); 4] {
        [
            ("in-progress", self.in_progress.as_slice()),
            ("up-next", self.up_next.as_slice()),
            ("future", self.future.as_slice()),
            ("shipped", self.shipped.as_slice()),
        ]
    }
}

/// Execute `rmap list`.
///
/// # Errors
///
/// Returns an error if the project or catalog cannot be loaded.
pub fn run_list(
    args: &ListArgs,
    output: OutputMode,
    project_root: &std::path::Path,
) -> anyhow::Result<()> {
    let tier = match args.tier.as_deref().map(str::parse::<Priority>).transpose() {
        Ok(tier) => tier,
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(ErrorCode::InvalidEnumValue, err.to_string()),
            )?;
            return Err(err.into());
        }
    };

    let project = Project::discover(project_root, output)?;
    let mut ctl = project.controller(output)?;

    if args.all {
        while ctl.future_bucket().has_more() {
            ctl.show_more_future();
        }
    } else {
        for _ in 0..args.more {
            ctl.show_more_future();
        }
    }

    let mut listing = ListOutput::from_controller(&ctl);
    if let Some(tier) = tier {
        listing = listing.only(tier);
    }
    render_mode(output, &listing, render_text, render_pretty)
}

fn render_text(listing: &ListOutput, w: &mut dyn Write) -> io::Result<()> {
    for (bucket, items) in listing.buckets() {
        for item in items {
            writeln!(
                w,
                "{bucket}\t{}\t{}\t{}\t{}",
                item.id,
                item.votes,
                if item.voted { "voted" } else { "-" },
                item.title
            )?;
        }
    }
    Ok(())
}

fn render_pretty(listing: &ListOutput, w: &mut dyn Write) -> io::Result<()> {
    let headings = ["In progress", "Up next", "Future", "Recently shipped"];
    for ((bucket, items), heading) in listing.buckets().into_iter().zip(headings) {
        pretty_section(w, heading)?;
        if items.is_empty() {
            writeln!(w, "  (nothing here yet)")?;
        }
        for item in items {
            if bucket == "shipped" {
                let date = item.completed_at.as_deref().unwrap_or("");
                writeln!(w, "  {date:<10}  {:<22} {}", item.id, item.title)?;
            } else {
                writeln!(
                    w,
                    "{} {:>4}  {:<22} {}",
                    item.marker(),
                    item.votes,
                    item.id,
                    item.title
                )?;
            }
        }
        if bucket == "future" && listing.future_remaining > 0 {
            writeln!(
                w,
                "  … {} more (rmap list --more 1)",
                listing.future_remaining
            )?;
        }
        writeln!(w)?;
    }
    writeln!(w, "★ = you voted")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use roadmap_core::catalog::ItemStore;
    use roadmap_core::ledger::VoteLedger;
    use roadmap_core::subscribe::SubscriptionGateway;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn list_args_defaults() {
        let w = Wrapper::parse_from(["test"]);
        assert_eq!(w.args.more, 0);
        assert!(!w.args.all);
        assert!(w.args.tier.is_none());
    }

    #[test]
    fn more_and_all_conflict() {
        assert!(Wrapper::try_parse_from(["test", "--more", "1", "--all"]).is_err());
    }

    fn seeded_controller() -> RoadmapController {
        RoadmapController::new(
            ItemStore::seeded().expect("seed"),
            VoteLedger::in_memory(),
            SubscriptionGateway::disabled(),
            5,
        )
    }

    #[test]
    fn listing_marks_voted_items_and_pages_future() {
        let mut ctl = seeded_controller();
        ctl.toggle_vote("webhooks");

        let listing = ListOutput::from_controller(&ctl);
        assert_eq!(listing.in_progress.len(), 2);
        assert_eq!(listing.up_next.len(), 2);
        assert_eq!(listing.future.len(), 5);
        assert_eq!(listing.future_remaining, 2);
        assert_eq!(listing.shipped.len(), 3);

        let ids: Vec<_> = listing.future.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["mobile-app", "webhooks", "sso", "bulk-import", "custom-themes"]
        );
        assert!(listing.future[1].voted);
        assert_eq!(listing.future[1].votes, 24);
        assert_eq!(listing.shipped[0].id, "dark-mode");
    }

    #[test]
    fn tier_filter_keeps_one_bucket() {
        let listing = ListOutput::from_controller(&seeded_controller()).only(Priority::UpNext);
        assert_eq!(listing.up_next.len(), 2);
        assert!(listing.in_progress.is_empty());
        assert!(listing.future.is_empty());
        assert_eq!(listing.future_remaining, 0);
        assert!(listing.shipped.is_empty());
    }

    #[test]
    fn pretty_and_text_render_every_bucket() {
        let listing = ListOutput::from_controller(&seeded_controller());

        let mut text = Vec::new();
        render_text(&listing, &mut text).expect("text");
        let text = String::from_utf8(text).expect("utf8");
        assert!(text.lines().any(|l| l.starts_with("in-progress\toffline-sync\t42\t-")));
        assert!(text.lines().any(|l| l.starts_with("shipped\tdark-mode")));

        let mut pretty = Vec::new();
        render_pretty(&listing, &mut pretty).expect("pretty");
        let pretty = String::from_utf8(pretty).expect("utf8");
        assert!(pretty.contains("Recently shipped"));
        assert!(pretty.contains("2 more"));
    }
}
