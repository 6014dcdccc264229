//! Locating a `.roadmap/` project and wiring its stores into a controller.

use crate::output::{CliError, OutputMode, render_error};
use anyhow::{Context as _, Result};
use roadmap_core::catalog::{CATALOG_FILE, ItemStore};
use roadmap_core::config::{BackendKind, ProjectConfig, ROADMAP_DIR, VoteStoreKind};
use roadmap_core::controller::RoadmapController;
use roadmap_core::db::DB_FILE;
use roadmap_core::error::ErrorCode;
use roadmap_core::kv::{FileStore, KeyValueStore, KvError, SqliteStore};
use roadmap_core::ledger::VoteLedger;
use roadmap_core::subscribe::{
    HttpBackend, SqliteBackend, SubscriberBackend, SubscriptionGateway,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Directory under `.roadmap/` used by the `file` vote store.
pub const KV_DIR: &str = "kv";

/// Walk up from `start` to the nearest directory containing `.roadmap/`.
pub fn find_roadmap_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(ROADMAP_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// An initialized roadmap project.
#[derive(Debug)]
pub struct Project {
    pub dir: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Find the project enclosing `start` and load its config.
    ///
    /// Renders a not-initialized error in `output` mode when there is none.
    pub fn discover(start: &Path, output: OutputMode) -> Result<Self> {
        let Some(dir) = find_roadmap_dir(start) else {
            render_error(
                output,
                &CliError::from_code(
                    ErrorCode::NotInitialized,
                    "no .roadmap/ directory found in this directory or any parent",
                ),
            )?;
            anyhow::bail!("not a roadmap project (run `rmap init`)");
        };
        let root = dir
            .parent()
            .map_or_else(|| start.to_path_buf(), Path::to_path_buf);

        let config = match roadmap_core::config::load_project_config(&root) {
            Ok(config) => config,
            Err(err) => {
                render_error(
                    output,
                    &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
                )?;
                return Err(err);
            }
        };

        Ok(Self { dir, config })
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.dir.join(CATALOG_FILE)
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.join(DB_FILE)
    }

    /// Load the catalog, rendering catalog errors in `output` mode.
    pub fn load_catalog(&self, output: OutputMode) -> Result<ItemStore> {
        let path = self.catalog_path();
        match ItemStore::load(&path) {
            Ok(catalog) => Ok(catalog),
            Err(err) => {
                render_error(output, &CliError::from_code(err.code(), err.to_string()))?;
                Err(err).with_context(|| format!("Failed to load catalog {}", path.display()))
            }
        }
    }

    /// Persist vote counts after a toggle.
    pub fn save_catalog(&self, catalog: &ItemStore) -> Result<()> {
        let path = self.catalog_path();
        catalog
            .save(&path)
            .with_context(|| format!("Failed to write catalog {}", path.display()))
    }

    /// Open the configured vote store. A store that cannot be opened leaves
    /// the ledger in memory for this run.
    pub fn open_ledger(&self) -> VoteLedger {
        let store: Result<Box<dyn KeyValueStore>, KvError> = match self.config.votes.store {
            VoteStoreKind::Memory => return VoteLedger::in_memory(),
            VoteStoreKind::Sqlite => {
                SqliteStore::open(&self.db_path()).map(|s| Box::new(s) as Box<dyn KeyValueStore>)
            }
            VoteStoreKind::File => FileStore::open(&self.dir.join(KV_DIR))
                .map(|s| Box::new(s) as Box<dyn KeyValueStore>),
        };

        match store {
            Ok(store) => VoteLedger::open(store),
            Err(err) => {
                warn!(error = %err, code = %err.code(), "vote store unavailable; votes will not persist");
                VoteLedger::in_memory()
            }
        }
    }

    /// Build the subscription gateway from `[subscribe]`.
    pub fn open_gateway(&self) -> Result<SubscriptionGateway> {
        let cfg = &self.config.subscribe;
        let backend: Option<Arc<dyn SubscriberBackend>> = match cfg.backend {
            BackendKind::Disabled => None,
            BackendKind::Sqlite => match SqliteBackend::open(&self.db_path()) {
                Ok(backend) => Some(Arc::new(backend)),
                Err(err) => {
                    warn!(error = %err, "subscriber database unavailable");
                    None
                }
            },
            BackendKind::Http => {
                let endpoint = cfg.require_endpoint()?;
                Some(Arc::new(HttpBackend::new(endpoint, cfg.timeout())))
            }
        };

        let gateway = backend.map_or_else(SubscriptionGateway::disabled, SubscriptionGateway::new);
        debug!(?gateway, "subscription gateway ready");
        Ok(gateway
            .with_timeout(cfg.timeout())
            .with_source(cfg.source.clone()))
    }

    /// Assemble a controller over this project's catalog and stores.
    pub fn controller(&self, output: OutputMode) -> Result<RoadmapController> {
        let catalog = self.load_catalog(output)?;
        let ledger = self.open_ledger();
        let gateway = self.open_gateway()?;

        let mut controller = RoadmapController::new(
            catalog,
            ledger,
            gateway,
            self.config.display.future_page_size,
        )
        .with_fallback_url(self.config.subscribe.fallback_url.clone());

        if self.config.votes.prune_stale {
            controller.prune_stale_votes();
        }
        Ok(controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_roadmap_dir_in_ancestor() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join(".roadmap")).expect("create .roadmap");
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).expect("create nested");

        assert_eq!(
            find_roadmap_dir(&nested),
            Some(dir.path().join(".roadmap"))
        );
    }

    fn project_with(config: ProjectConfig) -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().expect("temp dir");
        let roadmap = dir.path().join(".roadmap");
        std::fs::create_dir_all(&roadmap).expect("create .roadmap");
        let project = Project {
            dir: roadmap,
            config,
        };
        (dir, project)
    }

    #[test]
    fn file_store_ledger_is_persistent() {
        let mut config = ProjectConfig::default();
        config.votes.store = VoteStoreKind::File;
        let (_dir, project) = project_with(config);

        let mut ledger = project.open_ledger();
        assert!(ledger.is_persistent());
        ledger.toggle("x");
        assert!(project.dir.join(KV_DIR).join("roadmap.votes").is_file());
    }

    #[test]
    fn memory_store_ledger_is_not_persistent() {
        let mut config = ProjectConfig::default();
        config.votes.store = VoteStoreKind::Memory;
        let (_dir, project) = project_with(config);
        assert!(!project.open_ledger().is_persistent());
    }

    #[test]
    fn gateway_follows_backend_kind() {
        let mut config = ProjectConfig::default();
        config.subscribe.backend = BackendKind::Disabled;
        config.subscribe.timeout_ms = 1500;
        let (_dir, project) = project_with(config);

        let gateway = project.open_gateway().expect("gateway");
        assert!(!gateway.is_enabled());
        assert_eq!(gateway.timeout().as_millis(), 1500);

        let (_dir, project) = project_with(ProjectConfig::default());
        assert!(project.open_gateway().expect("gateway").is_enabled());
    }

    #[test]
    fn http_backend_requires_endpoint() {
        let mut config = ProjectConfig::default();
        config.subscribe.backend = BackendKind::Http;
        let (_dir, project) = project_with(config);
        assert!(project.open_gateway().is_err());
    }
}
