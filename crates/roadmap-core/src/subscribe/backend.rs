use crate::model::Subscriber;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Failures a subscriber store can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The store is disabled, unreachable, or failed the request.
    #[error("subscriber backend unavailable: {0}")]
    Unavailable(String),

    /// The insert lost to an existing record with the same email.
    #[error("subscriber already exists")]
    Duplicate,
}

/// The remote subscriber list.
///
/// Inserts are keyed by the normalized email; the store itself enforces
/// uniqueness and reports a collision as [`BackendError::Duplicate`].
#[async_trait]
pub trait SubscriberBackend: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Whether `email` is already on the list.
    async fn exists(&self, email: &str) -> Result<bool, BackendError>;

    /// Append one subscriber record.
    async fn insert(&self, subscriber: &Subscriber) -> Result<(), BackendError>;
}

/// In-process subscriber list.
///
/// Can be switched offline to stand in for a disabled remote store.
#[derive(Debug)]
pub struct MemoryBackend {
    subscribers: Mutex<BTreeMap<String, Subscriber>>,
    online: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(BTreeMap::new()),
            online: AtomicBool::new(true),
        }
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`BackendError::Unavailable`] (or recover).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Snapshot of stored subscribers, ordered by email.
    #[must_use]
    pub fn subscribers(&self) -> Vec<Subscriber> {
        self.subscribers
            .lock()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.lock().map(|map| map.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable("memory backend offline".to_string()))
        }
    }

    fn poisoned<T>(_: T) -> BackendError {
        BackendError::Unavailable("memory backend lock poisoned".to_string())
    }
}

#[async_trait]
impl SubscriberBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, email: &str) -> Result<bool, BackendError> {
        self.check_online()?;
        let map = self.subscribers.lock().map_err(Self::poisoned)?;
        Ok(map.contains_key(email))
    }

    async fn insert(&self, subscriber: &Subscriber) -> Result<(), BackendError> {
        self.check_online()?;
        let mut map = self.subscribers.lock().map_err(Self::poisoned)?;
        if map.contains_key(&subscriber.email) {
            return Err(BackendError::Duplicate);
        }
        map.insert(subscriber.email.clone(), subscriber.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_enforces_unique_email() {
        let backend = MemoryBackend::new();
        let sub = Subscriber::new("ada@example.com", "roadmap");

        assert!(!backend.exists("ada@example.com").await.expect("exists"));
        backend.insert(&sub).await.expect("first insert");
        assert!(backend.exists("ada@example.com").await.expect("exists"));
        assert_eq!(backend.insert(&sub).await, Err(BackendError::Duplicate));
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn offline_memory_backend_reports_unavailable() {
        let backend = MemoryBackend::new();
        backend.set_online(false);
        assert!(matches!(
            backend.exists("ada@example.com").await,
            Err(BackendError::Unavailable(_))
        ));
        backend.set_online(true);
        assert!(backend.exists("ada@example.com").await.is_ok());
    }
}
