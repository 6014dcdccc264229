//! The roadmap catalog: the authoritative in-memory list of items.
//!
//! A catalog holds two sets. The *live* set carries the items users can vote
//! on, in curator order. The *shipped* set holds recently completed items and
//! is archival: it is never touched by votes.
//!
//! On disk the catalog is a TOML file with `[[items]]` and `[[shipped]]`
//! tables. Loading validates every item and rejects duplicate ids across both
//! sets.

use crate::model::{ItemValidationError, RoadmapItem, Status};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Catalog file name inside the `.roadmap/` directory.
pub const CATALOG_FILE: &str = "catalog.toml";

/// Built-in catalog written by `rmap init`.
pub const SEED_CATALOG: &str = r#"[[items]]
id = "offline-sync"
title = "Offline sync"
description = "Keep working without a connection and reconcile when back online."
priority = "in-progress"
status = "active"
votes = 42

[[items]]
id = "team-workspaces"
title = "Team workspaces"
description = "Shared spaces with per-member roles."
priority = "in-progress"
status = "active"
votes = 31

[[items]]
id = "public-api"
title = "Public API"
description = "Versioned REST API with personal access tokens."
priority = "up-next"
status = "planned"
votes = 27

[[items]]
id = "calendar-view"
title = "Calendar view"
description = "See scheduled work on a month grid."
priority = "up-next"
status = "planned"
votes = 19

[[items]]
id = "mobile-app"
title = "Mobile app"
description = "Native iOS and Android clients."
priority = "future"
status = "planned"
votes = 58

[[items]]
id = "custom-themes"
title = "Custom themes"
description = "Bring your own colors and fonts."
priority = "future"
status = "planned"
votes = 12

[[items]]
id = "webhooks"
title = "Webhooks"
description = "Push events to your own endpoints."
priority = "future"
status = "planned"
votes = 23

[[items]]
id = "sso"
title = "Single sign-on"
description = "SAML and OIDC login."
priority = "future"
status = "planned"
votes = 23

[[items]]
id = "audit-log"
title = "Audit log"
description = "Searchable history of administrative changes."
priority = "future"
status = "planned"
votes = 8

[[items]]
id = "bulk-import"
title = "Bulk import"
description = "CSV and JSON import with a dry-run preview."
priority = "future"
status = "planned"
votes = 15

[[items]]
id = "keyboard-shortcuts"
title = "Keyboard shortcuts"
description = "Navigate everything without a mouse."
priority = "future"
status = "planned"
votes = 5

[[shipped]]
id = "dark-mode"
title = "Dark mode"
description = "System-aware dark theme."
priority = "up-next"
status = "completed"
votes = 64
completed_at = "2026-09-14T16:00:00Z"

[[shipped]]
id = "two-factor-auth"
title = "Two-factor authentication"
description = "TOTP and hardware keys."
priority = "in-progress"
status = "completed"
votes = 37
completed_at = "2026-08-02T09:30:00Z"

[[shipped]]
id = "csv-export"
title = "CSV export"
description = "Export any list view to CSV."
priority = "future"
status = "completed"
votes = 21
completed_at = "2026-07-21T13:15:00Z"
"#;

/// Errors that can occur while loading or saving a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// I/O error reading or writing the catalog file.
    #[error("catalog I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The catalog file is not valid TOML or does not match the schema.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    /// The catalog could not be encoded back to TOML.
    #[error("failed to encode catalog: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Two items share an id.
    #[error("duplicate item id '{0}' in catalog")]
    DuplicateId(String),

    /// An item breaks a data-model invariant.
    #[error(transparent)]
    InvalidItem(#[from] ItemValidationError),

    /// A shipped entry is not marked completed.
    #[error("shipped item '{0}' must have status = \"completed\"")]
    NotShipped(String),

    /// A completed entry sits among the live items.
    #[error("completed item '{0}' belongs under [[shipped]], not [[items]]")]
    CompletedInLive(String),
}

impl CatalogError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> crate::error::ErrorCode {
        use crate::error::ErrorCode;
        match self {
            Self::Io { .. } => ErrorCode::StorageUnavailable,
            Self::Parse(_) | Self::Encode(_) => ErrorCode::CatalogParseError,
            Self::DuplicateId(_)
            | Self::InvalidItem(_)
            | Self::NotShipped(_)
            | Self::CompletedInLive(_) => ErrorCode::InvalidItem,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<RoadmapItem>,
    #[serde(default)]
    shipped: Vec<RoadmapItem>,
}

/// Authoritative in-memory list of roadmap items.
///
/// Owned by the controller; each instance is independent so tests and
/// concurrent sessions never share vote counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemStore {
    live: Vec<RoadmapItem>,
    shipped: Vec<RoadmapItem>,
}

impl ItemStore {
    /// Build a catalog from explicit live and shipped sets.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when an item is invalid, a shipped entry is not
    /// completed, or an id appears twice.
    pub fn new(live: Vec<RoadmapItem>, shipped: Vec<RoadmapItem>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for item in live.iter().chain(shipped.iter()) {
            item.validate()?;
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
        }
        if let Some(item) = shipped.iter().find(|item| item.status != Status::Completed) {
            return Err(CatalogError::NotShipped(item.id.clone()));
        }
        if let Some(item) = live.iter().find(|item| item.status == Status::Completed) {
            return Err(CatalogError::CompletedInLive(item.id.clone()));
        }

        Ok(Self { live, shipped })
    }

    /// Parse a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed TOML, or a validation
    /// error from [`ItemStore::new`].
    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text)?;
        Self::new(file.items, file.shipped)
    }

    /// The built-in seed catalog.
    ///
    /// # Errors
    ///
    /// Only fails if [`SEED_CATALOG`] itself is malformed.
    pub fn seeded() -> Result<Self, CatalogError> {
        Self::from_toml(SEED_CATALOG)
    }

    /// Load a catalog file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise any
    /// parse or validation error.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_toml(&text)?;
        debug!(
            path = %path.display(),
            live = store.live.len(),
            shipped = store.shipped.len(),
            "loaded roadmap catalog"
        );
        Ok(store)
    }

    /// Encode the catalog as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Encode`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, CatalogError> {
        let file = CatalogFile {
            items: self.live.clone(),
            shipped: self.shipped.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Write the catalog to `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when encoding or any filesystem step fails.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let text = self.to_toml()?;
        let io_err = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, text).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    /// Live items in curator order.
    #[must_use]
    pub fn live(&self) -> &[RoadmapItem] {
        &self.live
    }

    /// Recently completed items, in file order.
    #[must_use]
    pub fn shipped(&self) -> &[RoadmapItem] {
        &self.shipped
    }

    /// Look up an item in either set.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RoadmapItem> {
        self.live
            .iter()
            .chain(self.shipped.iter())
            .find(|item| item.id == id)
    }

    /// Every id in the catalog, live and shipped.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.live
            .iter()
            .chain(self.shipped.iter())
            .map(|item| item.id.as_str())
    }

    /// Apply a vote delta to a live item. Returns the new count, or `None`
    /// when no live item has this id (shipped items do not take votes).
    pub fn apply_delta(&mut self, id: &str, delta: i64) -> Option<u32> {
        let item = self.live.iter_mut().find(|item| item.id == id)?;
        let before = item.votes;
        let after = item.apply_delta(delta);
        if i64::from(after) - i64::from(before) != delta {
            tracing::warn!(id, before, delta, "vote delta clamped at zero");
        }
        Some(after)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len() + self.shipped.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.shipped.is_empty()
    }
}
