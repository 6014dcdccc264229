//! `rmap subscribe`: join the list for "this shipped" emails.

use crate::output::{CliError, OutputMode, render_error, render_mode};
use crate::project::Project;
use anyhow::{Context as _, Result};
use clap::Args;
use roadmap_core::controller::{Notification, NotificationLevel};
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct SubscribeArgs {
    /// Email address to notify when roadmap items ship.
    pub email: String,
}

/// Execute `rmap subscribe <email>`.
///
/// Successful and already-subscribed outcomes print the notification to
/// stdout. Failures print it as an error and exit non-zero.
///
/// # Errors
///
/// Returns an error if the project cannot be loaded or the subscription
/// does not go through.
pub fn run_subscribe(args: &SubscribeArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let ctl = project.controller(output)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let notification = runtime.block_on(ctl.subscribe(&args.email));

    if let Some(code) = notification.code.filter(|_| notification.is_error()) {
        let mut error = CliError::from_code(code, notification.message.clone());
        if let Some(ref url) = notification.fallback_url {
            error.suggestion = Some(format!("Subscribe another way: {url}"));
        }
        render_error(output, &error)?;
        anyhow::bail!("{}: {}", notification.title, notification.message);
    }

    render_mode(output, &notification, render_text, render_pretty)
}

fn render_text(notification: &Notification, w: &mut dyn Write) -> io::Result<()> {
    let status = match notification.level {
        NotificationLevel::Success => "subscribed",
        NotificationLevel::Info => "already_subscribed",
        NotificationLevel::Error => "error",
    };
    writeln!(w, "{status}\t{}", notification.message)
}

fn render_pretty(notification: &Notification, w: &mut dyn Write) -> io::Result<()> {
    let icon = match notification.level {
        NotificationLevel::Success => "✓",
        NotificationLevel::Info => "•",
        NotificationLevel::Error => "✗",
    };
    writeln!(w, "{icon} {}", notification.title)?;
    writeln!(w, "  {}", notification.message)
}
