//! Orchestration of the roadmap view.
//!
//! [`RoadmapController`] owns the catalog, the vote ledger and the
//! subscription gateway. It exposes the four display lists plus the two
//! mutations (`toggle_vote` and `subscribe`) and turns their results into
//! what a front end renders: updated counts, button states, notifications.

use crate::catalog::ItemStore;
use crate::error::ErrorCode;
use crate::ledger::{VoteDelta, VoteLedger};
use crate::model::RoadmapItem;
use crate::sorter::{FutureBucket, RoadmapGroups, group_and_sort};
use crate::subscribe::{SubscribeOutcome, SubscriptionError, SubscriptionGateway};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Display state of one vote button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteButtonState {
    Unvoted,
    Voted,
}

impl VoteButtonState {
    #[must_use]
    pub const fn from_voted(voted: bool) -> Self {
        if voted { Self::Voted } else { Self::Unvoted }
    }
}

impl fmt::Display for VoteButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unvoted => f.write_str("unvoted"),
            Self::Voted => f.write_str("voted"),
        }
    }
}

/// Result of one vote toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub item_id: String,
    pub delta: VoteDelta,
    /// New displayed count; `None` when the id is not a live catalog item.
    pub votes: Option<u32>,
    pub state: VoteButtonState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// The single user-facing message produced by a subscribe attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    /// Alternate way to subscribe, offered when the list is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    /// Error code for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl Notification {
    fn new(level: NotificationLevel, title: &str, message: String) -> Self {
        Self {
            level,
            title: title.to_string(),
            message,
            fallback_url: None,
            code: None,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.level, NotificationLevel::Error)
    }
}

/// Owns roadmap state for one session.
#[derive(Debug)]
pub struct RoadmapController {
    catalog: ItemStore,
    ledger: VoteLedger,
    gateway: SubscriptionGateway,
    groups: RoadmapGroups,
    fallback_url: Option<String>,
}

impl RoadmapController {
    /// Build a controller, grouping `catalog` with a future page of `page_size`.
    #[must_use]
    pub fn new(
        catalog: ItemStore,
        ledger: VoteLedger,
        gateway: SubscriptionGateway,
        page_size: usize,
    ) -> Self {
        let groups = group_and_sort(catalog.live(), catalog.shipped(), page_size);
        Self {
            catalog,
            ledger,
            gateway,
            groups,
            fallback_url: None,
        }
    }

    /// Link offered in the notification when the subscriber list is down.
    #[must_use]
    pub fn with_fallback_url(mut self, url: Option<String>) -> Self {
        self.fallback_url = url;
        self
    }

    /// Forget ledger entries for ids that are not in the catalog.
    pub fn prune_stale_votes(&mut self) -> usize {
        let removed = self.ledger.prune(self.catalog.ids());
        if removed > 0 {
            info!(removed, "dropped votes for items no longer on the roadmap");
        }
        removed
    }

    #[must_use]
    pub fn in_progress(&self) -> &[RoadmapItem] {
        &self.groups.in_progress
    }

    #[must_use]
    pub fn up_next(&self) -> &[RoadmapItem] {
        &self.groups.up_next
    }

    /// Visible part of the vote-ordered tier.
    #[must_use]
    pub fn future(&self) -> &[RoadmapItem] {
        self.groups.future.visible()
    }

    #[must_use]
    pub const fn future_bucket(&self) -> &FutureBucket {
        &self.groups.future
    }

    #[must_use]
    pub fn shipped(&self) -> &[RoadmapItem] {
        &self.groups.shipped
    }

    #[must_use]
    pub const fn groups(&self) -> &RoadmapGroups {
        &self.groups
    }

    /// Extend the future window by one page. Returns the visible count.
    pub fn show_more_future(&mut self) -> usize {
        self.groups.future.show_more()
    }

    #[must_use]
    pub fn button_state(&self, item_id: &str) -> VoteButtonState {
        VoteButtonState::from_voted(self.ledger.has_voted(item_id))
    }

    /// Toggle this client's vote on `item_id` and update the displayed count.
    ///
    /// Never fails. Unknown ids still flip the ledger entry but change no
    /// count.
    pub fn toggle_vote(&mut self, item_id: &str) -> VoteOutcome {
        let delta = self.ledger.toggle(item_id);
        let votes = self.catalog.apply_delta(item_id, delta.as_i64());
        if votes.is_some() {
            self.groups.refresh_item(&self.catalog, item_id);
        } else {
            debug!(item_id, "vote recorded for an id with no live item");
        }

        VoteOutcome {
            item_id: item_id.to_string(),
            delta,
            votes,
            state: VoteButtonState::from_voted(delta.is_vote()),
        }
    }

    /// Subscribe `email` and describe the result for the user.
    ///
    /// Every path produces exactly one [`Notification`].
    pub async fn subscribe(&self, email: &str) -> Notification {
        match self.gateway.subscribe(email).await {
            Ok(SubscribeOutcome::Subscribed) => Notification::new(
                NotificationLevel::Success,
                "Subscribed",
                "Thanks! You'll get an email when roadmap items ship.".to_string(),
            ),
            Ok(SubscribeOutcome::AlreadySubscribed) => Notification::new(
                NotificationLevel::Info,
                "Already subscribed",
                "This address is already on the roadmap update list.".to_string(),
            ),
            Err(err) => self.failure(&err),
        }
    }

    fn failure(&self, err: &SubscriptionError) -> Notification {
        let (title, message) = match err {
            SubscriptionError::InvalidEmail { reason, .. } => (
                "Invalid email",
                format!("That doesn't look like an email address ({reason})."),
            ),
            SubscriptionError::BackendUnavailable(_) => (
                "Subscriptions unavailable",
                self.fallback_url.as_deref().map_or_else(
                    || "We can't take subscriptions right now. Please try again later.".to_string(),
                    |url| format!("We can't take subscriptions right now. You can still reach us at {url}."),
                ),
            ),
            SubscriptionError::Timeout(_) => (
                "Request timed out",
                "The subscription service took too long to answer. Please try again.".to_string(),
            ),
        };
        let mut notification = Notification::new(NotificationLevel::Error, title, message);
        notification.code = Some(err.code());
        if matches!(err, SubscriptionError::BackendUnavailable(_)) {
            notification.fallback_url.clone_from(&self.fallback_url);
        }
        notification
    }

    #[must_use]
    pub const fn catalog(&self) -> &ItemStore {
        &self.catalog
    }

    #[must_use]
    pub const fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    #[must_use]
    pub const fn gateway(&self) -> &SubscriptionGateway {
        &self.gateway
    }
}
