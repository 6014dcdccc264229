use crate::project::KV_DIR;
use anyhow::{Context as _, Result};
use clap::Args;
use roadmap_core::catalog::{CATALOG_FILE, SEED_CATALOG};
use roadmap_core::config::{CONFIG_FILE, ROADMAP_DIR};
use roadmap_core::db::{self, DB_FILE};
use roadmap_core::ledger::VOTES_KEY;
use std::path::Path;
use tracing::info;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.roadmap/` config and catalog (resets vote counts and this client's votes).
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[votes]\n\
    # sqlite | file | memory\n\
    store = \"sqlite\"\n\
    prune_stale = false\n\
    \n\
    [subscribe]\n\
    # sqlite | http | disabled\n\
    backend = \"sqlite\"\n\
    timeout_ms = 10000\n\
    source = \"roadmap\"\n\
    # endpoint = \"https://lists.example.com/api\"\n\
    # fallback_url = \"mailto:roadmap@example.com\"\n\
    \n\
    [display]\n\
    future_page_size = 5\n";

const GITIGNORE: &str = "roadmap.db\nroadmap.db-wal\nroadmap.db-shm\nkv/\n";

/// Execute `rmap init`. Creates the project skeleton:
///
/// ```text
/// .roadmap/
///   config.toml   (default project config)
///   catalog.toml  (seed roadmap items)
///   roadmap.db    (vote record and subscriber list)
///   .gitignore    (roadmap.db*, kv/)
/// ```
///
/// # Errors
///
/// Returns an error if `.roadmap/` already exists and `--force` is not set,
/// or if any filesystem or database step fails.
pub fn run_init(args: &InitArgs, project_root: &Path) -> Result<()> {
    let roadmap_dir = project_root.join(ROADMAP_DIR);

    if roadmap_dir.exists() && !args.force {
        anyhow::bail!(".roadmap/ already exists. Use `rmap init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&roadmap_dir).with_context(|| {
        format!(
            "Failed to create roadmap directory: {}",
            roadmap_dir.display()
        )
    })?;

    let config_path = roadmap_dir.join(CONFIG_FILE);
    std::fs::write(&config_path, CONFIG_TOML)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let catalog_path = roadmap_dir.join(CATALOG_FILE);
    std::fs::write(&catalog_path, SEED_CATALOG)
        .with_context(|| format!("Failed to write catalog: {}", catalog_path.display()))?;

    let gitignore_path = roadmap_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let conn =
        db::open_db(&roadmap_dir.join(DB_FILE)).context("Failed to create roadmap database")?;
    if args.force {
        reset_vote_record(&conn, &roadmap_dir)?;
    }

    info!(path = %roadmap_dir.display(), "initialized roadmap project");

    println!("✓ Initialized .roadmap/ project structure.");
    println!();
    println!("  Config:   .roadmap/config.toml");
    println!("  Catalog:  .roadmap/catalog.toml");
    println!();
    println!("Next steps:");
    println!("  See what's planned:");
    println!("    rmap list");
    println!();
    println!("  Vote for a feature:");
    println!("    rmap vote mobile-app");

    Ok(())
}

/// Forget this client's votes so they match the freshly seeded counts.
fn reset_vote_record(conn: &rusqlite::Connection, roadmap_dir: &Path) -> Result<()> {
    let removed = conn
        .execute("DELETE FROM kv_store WHERE key = ?1", [VOTES_KEY])
        .context("Failed to clear vote record")?;

    let kv_dir = roadmap_dir.join(KV_DIR);
    if kv_dir.exists() {
        std::fs::remove_dir_all(&kv_dir)
            .with_context(|| format!("Failed to clear {}", kv_dir.display()))?;
    }
    info!(removed, "cleared vote record");
    Ok(())
}
