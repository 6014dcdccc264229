#![forbid(unsafe_code)]

mod cmd;
mod output;
mod project;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "rmap: public roadmap with voting and ship notifications",
    long_about = None
)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides `--json`, `FORMAT` and the user config).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Settle the output mode from flags, `FORMAT`, and the user config.
    fn output_mode(&self) -> OutputMode {
        let user_output = roadmap_core::config::load_user_config()
            .ok()
            .and_then(|user| user.output);
        output::resolve_output_mode(self.format, self.json, user_output.as_deref())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a roadmap project",
        long_about = "Create .roadmap/ with a default config, the seed catalog and the local database.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    rmap init\n\n    # Start over with the seed catalog\n    rmap init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Read",
        about = "List the roadmap",
        long_about = "List roadmap items grouped into in progress, up next, future and recently shipped. Future items are ordered by votes.",
        after_help = "EXAMPLES:\n    # Show the roadmap\n    rmap list\n\n    # Show one more page of future items\n    rmap list --more 1\n\n    # Emit machine-readable output\n    rmap list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one roadmap item",
        long_about = "Show full details for a single roadmap item, including your vote.",
        after_help = "EXAMPLES:\n    # Show an item\n    rmap show mobile-app\n\n    # Emit machine-readable output\n    rmap show mobile-app --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Engage",
        about = "Vote for an item, or withdraw your vote",
        long_about = "Toggle your vote on a roadmap item. Voting twice withdraws the vote.",
        after_help = "EXAMPLES:\n    # Vote for an item\n    rmap vote mobile-app\n\n    # Withdraw the vote\n    rmap vote mobile-app\n\n    # Emit machine-readable output\n    rmap vote mobile-app --json"
    )]
    Vote(cmd::vote::VoteArgs),

    #[command(
        next_help_heading = "Engage",
        about = "Get an email when items ship",
        long_about = "Add an email address to the roadmap update list.",
        after_help = "EXAMPLES:\n    # Subscribe\n    rmap subscribe you@example.com\n\n    # Emit machine-readable output\n    rmap subscribe you@example.com --json"
    )]
    Subscribe(cmd::subscribe::SubscribeArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Show or change configuration",
        long_about = "Show the resolved configuration, or set and unset project and user keys.",
        after_help = "EXAMPLES:\n    # Show resolved config\n    rmap config show\n\n    # Send subscriptions to a list service\n    rmap config set subscribe.backend http\n    rmap config set subscribe.endpoint https://lists.example.com/api\n\n    # Prefer JSON output everywhere\n    rmap config set --scope user user.output json"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    rmap completions bash\n\n    # Generate zsh completions\n    rmap completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Filter used when `ROADMAP_LOG` is unset.
const fn default_filter(quiet: bool, verbose: bool, debug_env: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose || debug_env {
        "roadmap=debug,info"
    } else {
        "roadmap=info,warn"
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_env("ROADMAP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_filter(quiet, verbose, env::var("DEBUG").is_ok()))
    });

    let format = env::var("ROADMAP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);
    roadmap_core::init();

    if cli.verbose {
        debug!("verbose logging enabled");
    }

    let project_root = env::current_dir()?;
    let output = cli.output_mode();
    debug!(?output, "output mode resolved");

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, &project_root),
        Commands::List(ref args) => cmd::list::run_list(args, output, &project_root),
        Commands::Show(ref args) => cmd::show::run_show(args, output, &project_root),
        Commands::Vote(ref args) => cmd::vote::run_vote(args, output, &project_root),
        Commands::Subscribe(ref args) => {
            cmd::subscribe::run_subscribe(args, output, &project_root)
        }
        Commands::Config(ref args) => cmd::config::run_config(args, &project_root, output),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_parses_before_and_after_subcommand() {
        let cli = Cli::parse_from(["rmap", "--json", "list"]);
        assert!(cli.json);
        let cli = Cli::parse_from(["rmap", "list", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn format_flag_parsed() {
        let cli = Cli::parse_from(["rmap", "--format", "text", "list"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
        assert!(Cli::try_parse_from(["rmap", "--format", "yaml", "list"]).is_err());
    }

    #[test]
    fn quiet_flag_parsed() {
        let cli = Cli::parse_from(["rmap", "-q", "list"]);
        assert!(cli.quiet);
    }

    #[test]
    fn verbose_raises_default_filter_to_debug() {
        let cli = Cli::parse_from(["rmap", "list", "-v"]);
        assert!(cli.verbose);
        assert_eq!(default_filter(false, true, false), "roadmap=debug,info");
        assert_eq!(default_filter(false, false, true), "roadmap=debug,info");
        assert_eq!(default_filter(false, false, false), "roadmap=info,warn");
        assert_eq!(default_filter(true, false, true), "error");
        assert!(Cli::try_parse_from(["rmap", "-q", "-v", "list"]).is_err());
    }

    #[test]
    fn vote_requires_an_id() {
        assert!(Cli::try_parse_from(["rmap", "vote"]).is_err());
        let cli = Cli::parse_from(["rmap", "vote", "mobile-app"]);
        assert!(matches!(cli.command, Commands::Vote(ref args) if args.id == "mobile-app"));
    }

    #[test]
    fn subscribe_takes_email() {
        let cli = Cli::parse_from(["rmap", "subscribe", "you@example.com"]);
        assert!(
            matches!(cli.command, Commands::Subscribe(ref args) if args.email == "you@example.com")
        );
    }

    #[test]
    fn list_paging_flags() {
        let cli = Cli::parse_from(["rmap", "list", "--more", "2"]);
        assert!(matches!(cli.command, Commands::List(ref args) if args.more == 2 && !args.all));
    }
}
