use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The three live curation tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    InProgress,
    UpNext,
    Future,
}

impl Priority {
    const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::UpNext => "up-next",
            Self::Future => "future",
        }
    }
}

/// Delivery status of a roadmap item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Planned,
    Active,
    Completed,
}

impl Status {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

/// One entry on the public roadmap.
///
/// `votes` is unsigned so the non-negative invariant holds by construction;
/// [`RoadmapItem::apply_delta`] saturates at zero instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    #[serde(default)]
    pub votes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RoadmapItem {
    /// Build a not-yet-completed item with zero votes.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        priority: Priority,
        status: Status,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            priority,
            status,
            votes: 0,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn with_votes(mut self, votes: u32) -> Self {
        self.votes = votes;
        self
    }

    /// Mark the item completed at `at`, keeping status and timestamp in step.
    #[must_use]
    pub fn completed(mut self, at: DateTime<Utc>) -> Self {
        self.status = Status::Completed;
        self.completed_at = Some(at);
        self
    }

    /// Check the per-item invariants.
    ///
    /// # Errors
    ///
    /// Returns an [`ItemValidationError`] when the id is blank or when
    /// `completed_at` disagrees with `status`.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.id.trim().is_empty() {
            return Err(ItemValidationError {
                id: self.id.clone(),
                reason: "id must not be empty",
            });
        }

        match (self.status, self.completed_at) {
            (Status::Completed, None) => Err(ItemValidationError {
                id: self.id.clone(),
                reason: "completed items must set completed_at",
            }),
            (Status::Planned | Status::Active, Some(_)) => Err(ItemValidationError {
                id: self.id.clone(),
                reason: "completed_at is only allowed on completed items",
            }),
            _ => Ok(()),
        }
    }

    /// Apply a signed vote change, clamping at zero. Returns the new count.
    pub fn apply_delta(&mut self, delta: i64) -> u32 {
        let next = i64::from(self.votes).saturating_add(delta).max(0);
        self.votes = u32::try_from(next).unwrap_or(u32::MAX);
        self.votes
    }
}

/// Error returned when an item breaks a data-model invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid roadmap item '{id}': {reason}")]
pub struct ItemValidationError {
    pub id: String,
    pub reason: &'static str,
}

/// Error returned when parsing a priority tier from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('_', "-")
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "in-progress" => Ok(Self::InProgress),
            "up-next" => Ok(Self::UpNext),
            "future" => Ok(Self::Future),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}
