//! End-to-end behavior of the roadmap controller over real stores.
//!
//! Covers the vote round trip, sort stability under toggles, and every
//! subscription outcome including the disabled and slow backend paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use roadmap_core::catalog::ItemStore;
use roadmap_core::controller::{NotificationLevel, RoadmapController, VoteButtonState};
use roadmap_core::error::ErrorCode;
use roadmap_core::ledger::{VoteDelta, VoteLedger};
use roadmap_core::model::{Priority, RoadmapItem, Status, Subscriber};
use roadmap_core::subscribe::{
    BackendError, MemoryBackend, SqliteBackend, SubscribeOutcome, SubscriberBackend,
    SubscriptionError, SubscriptionGateway,
};

/// Backend that counts calls and delegates to an in-memory list.
#[derive(Default)]
struct CountingBackend {
    inner: MemoryBackend,
    exists_calls: AtomicUsize,
    insert_calls: AtomicUsize,
}

impl CountingBackend {
    fn calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst) + self.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriberBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn exists(&self, email: &str) -> Result<bool, BackendError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(email).await
    }

    async fn insert(&self, subscriber: &Subscriber) -> Result<(), BackendError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(subscriber).await
    }
}

/// Backend that never answers in time.
struct StalledBackend;

#[async_trait]
impl SubscriberBackend for StalledBackend {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn exists(&self, _email: &str) -> Result<bool, BackendError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(false)
    }

    async fn insert(&self, _subscriber: &Subscriber) -> Result<(), BackendError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

/// Backend whose `exists` misses but whose insert always collides, as when a
/// concurrent client wins the race.
struct RacingBackend;

#[async_trait]
impl SubscriberBackend for RacingBackend {
    fn name(&self) -> &'static str {
        "racing"
    }

    async fn exists(&self, _email: &str) -> Result<bool, BackendError> {
        Ok(false)
    }

    async fn insert(&self, _subscriber: &Subscriber) -> Result<(), BackendError> {
        Err(BackendError::Duplicate)
    }
}

fn future(id: &str, votes: u32) -> RoadmapItem {
    RoadmapItem::new(id, id, Priority::Future, Status::Planned).with_votes(votes)
}

fn controller_with(items: Vec<RoadmapItem>, gateway: SubscriptionGateway) -> RoadmapController {
    let catalog = ItemStore::new(items, vec![]).expect("valid catalog");
    RoadmapController::new(catalog, VoteLedger::in_memory(), gateway, 10)
}

fn ids(items: &[RoadmapItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

#[test]
fn single_item_vote_round_trip() {
    let mut ctl = controller_with(vec![future("x", 10)], SubscriptionGateway::disabled());

    let up = ctl.toggle_vote("x");
    assert_eq!(up.delta, VoteDelta::Up);
    assert_eq!(up.votes, Some(11));
    assert_eq!(ctl.button_state("x"), VoteButtonState::Voted);
    assert_eq!(ctl.future()[0].votes, 11);

    let down = ctl.toggle_vote("x");
    assert_eq!(down.delta, VoteDelta::Down);
    assert_eq!(down.votes, Some(10));
    assert_eq!(ctl.button_state("x"), VoteButtonState::Unvoted);
    assert_eq!(ctl.future()[0].votes, 10);
}

#[test]
fn future_tier_keeps_catalog_order_on_ties() {
    let ctl = controller_with(
        vec![future("a", 5), future("b", 5), future("c", 3)],
        SubscriptionGateway::disabled(),
    );
    assert_eq!(ids(ctl.future()), vec!["a", "b", "c"]);
}

#[test]
fn future_tier_reorders_after_votes() {
    let mut ctl = controller_with(
        vec![future("a", 5), future("b", 5), future("c", 5)],
        SubscriptionGateway::disabled(),
    );

    let outcome = ctl.toggle_vote("c");
    assert_eq!(outcome.votes, Some(6));
    assert_eq!(ids(ctl.future()), vec!["c", "a", "b"]);

    ctl.toggle_vote("c");
    assert_eq!(ids(ctl.future()), vec!["a", "b", "c"]);
}

#[test]
fn curated_tiers_ignore_vote_order() {
    let catalog = ItemStore::new(
        vec![
            RoadmapItem::new("slow", "slow", Priority::InProgress, Status::Active).with_votes(1),
            RoadmapItem::new("fast", "fast", Priority::InProgress, Status::Active).with_votes(2),
        ],
        vec![],
    )
    .expect("valid catalog");
    let mut ctl = RoadmapController::new(
        catalog,
        VoteLedger::in_memory(),
        SubscriptionGateway::disabled(),
        5,
    );

    ctl.toggle_vote("slow");
    ctl.toggle_vote("slow");
    ctl.toggle_vote("slow");
    assert_eq!(ids(ctl.in_progress()), vec!["slow", "fast"]);
    assert_eq!(ctl.in_progress()[0].votes, 2);
}

#[tokio::test]
async fn duplicate_subscription_creates_one_record() {
    let backend = Arc::new(MemoryBackend::new());
    let gateway = SubscriptionGateway::new(backend.clone());

    assert_eq!(
        gateway.subscribe("new@example.com").await,
        Ok(SubscribeOutcome::Subscribed)
    );
    assert_eq!(
        gateway.subscribe("new@example.com").await,
        Ok(SubscribeOutcome::AlreadySubscribed)
    );
    assert_eq!(backend.len(), 1);
}

#[tokio::test]
async fn duplicate_subscription_against_sqlite() {
    let dir = tempfile::tempdir().expect("temp dir");
    let backend = Arc::new(SqliteBackend::open(&dir.path().join("roadmap.db")).expect("open"));
    let gateway = SubscriptionGateway::new(backend.clone());

    assert_eq!(
        gateway.subscribe("New@Example.com").await,
        Ok(SubscribeOutcome::Subscribed)
    );
    assert_eq!(
        gateway.subscribe("new@example.com").await,
        Ok(SubscribeOutcome::AlreadySubscribed)
    );
    assert_eq!(backend.list().expect("list").len(), 1);
}

#[tokio::test]
async fn invalid_email_never_reaches_backend() {
    let backend = Arc::new(CountingBackend::default());
    let gateway = SubscriptionGateway::new(backend.clone());

    let err = gateway
        .subscribe("not-an-email")
        .await
        .expect_err("invalid address");
    assert!(matches!(err, SubscriptionError::InvalidEmail { .. }));
    assert_eq!(backend.calls(), 0);

    gateway
        .subscribe("valid@example.com")
        .await
        .expect("valid address");
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn missing_backend_reports_unavailable() {
    let gateway = SubscriptionGateway::disabled();
    let err = gateway
        .subscribe("valid@example.com")
        .await
        .expect_err("no backend");
    assert!(matches!(err, SubscriptionError::BackendUnavailable(_)));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let gateway = SubscriptionGateway::new(Arc::new(StalledBackend))
        .with_timeout(Duration::from_millis(50));
    let err = gateway
        .subscribe("valid@example.com")
        .await
        .expect_err("stalled backend");
    assert_eq!(err, SubscriptionError::Timeout(Duration::from_millis(50)));
}

#[tokio::test]
async fn lost_insert_race_counts_as_already_subscribed() {
    let gateway = SubscriptionGateway::new(Arc::new(RacingBackend));
    assert_eq!(
        gateway.subscribe("valid@example.com").await,
        Ok(SubscribeOutcome::AlreadySubscribed)
    );
}

#[tokio::test]
async fn every_subscription_outcome_resolves_to_one_notification() {
    let ctl = controller_with(
        vec![],
        SubscriptionGateway::new(Arc::new(StalledBackend)).with_timeout(Duration::from_millis(20)),
    );
    let timed_out = ctl.subscribe("valid@example.com").await;
    assert_eq!(timed_out.level, NotificationLevel::Error);
    assert_eq!(timed_out.code, Some(ErrorCode::SubscriptionTimeout));

    let down = controller_with(vec![], SubscriptionGateway::disabled())
        .subscribe("valid@example.com")
        .await;
    assert_eq!(down.code, Some(ErrorCode::BackendUnavailable));
    assert_ne!(down.message, timed_out.message);
}
