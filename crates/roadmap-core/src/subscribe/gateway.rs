use super::backend::{BackendError, SubscriberBackend};
use super::email::normalize_email;
use crate::error::ErrorCode;
use crate::model::Subscriber;
use crate::model::subscriber::DEFAULT_SOURCE;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on one subscribe round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Successful results of [`SubscriptionGateway::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    /// A new subscriber record was created.
    Subscribed,
    /// The address was already on the list; nothing was written.
    AlreadySubscribed,
}

impl fmt::Display for SubscribeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribed => f.write_str("subscribed"),
            Self::AlreadySubscribed => f.write_str("already_subscribed"),
        }
    }
}

/// Failed results of [`SubscriptionGateway::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("invalid email address '{email}': {reason}")]
    InvalidEmail { email: String, reason: &'static str },

    #[error("subscriber list unavailable: {0}")]
    BackendUnavailable(String),

    #[error("subscription timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl SubscriptionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidEmail { .. } => ErrorCode::InvalidEmail,
            Self::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
            Self::Timeout(_) => ErrorCode::SubscriptionTimeout,
        }
    }
}

/// Validates addresses and submits them to the subscriber list.
///
/// The backend is optional: a gateway built with [`SubscriptionGateway::disabled`]
/// answers every valid address with [`SubscriptionError::BackendUnavailable`].
#[derive(Clone)]
pub struct SubscriptionGateway {
    backend: Option<Arc<dyn SubscriberBackend>>,
    timeout: Duration,
    source: String,
}

impl fmt::Debug for SubscriptionGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGateway")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("timeout", &self.timeout)
            .field("source", &self.source)
            .finish()
    }
}

impl Default for SubscriptionGateway {
    fn default() -> Self {
        Self::disabled()
    }
}

impl SubscriptionGateway {
    #[must_use]
    pub fn new(backend: Arc<dyn SubscriberBackend>) -> Self {
        Self {
            backend: Some(backend),
            timeout: DEFAULT_TIMEOUT,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// A gateway with no subscriber list behind it.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            backend: None,
            timeout: DEFAULT_TIMEOUT,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provenance tag written on new subscriber records.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Subscribe `email` to the list.
    ///
    /// Validation happens before any backend call. The `exists` check and the
    /// insert share one timeout; dropping the returned future abandons the
    /// request without retrying.
    ///
    /// # Errors
    ///
    /// - [`SubscriptionError::InvalidEmail`] if the address fails validation
    /// - [`SubscriptionError::BackendUnavailable`] if there is no backend or it fails
    /// - [`SubscriptionError::Timeout`] if the backend does not answer in time
    pub async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, SubscriptionError> {
        let normalized = normalize_email(email).map_err(|e| SubscriptionError::InvalidEmail {
            email: email.trim().to_string(),
            reason: e.reason,
        })?;

        let Some(backend) = self.backend.as_ref() else {
            warn!("subscribe requested with no subscriber backend configured");
            return Err(SubscriptionError::BackendUnavailable(
                "no subscriber backend configured".to_string(),
            ));
        };

        let round_trip = self.submit(backend.as_ref(), normalized);
        match tokio::time::timeout(self.timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    backend = backend.name(),
                    timeout_ms = self.timeout.as_millis(),
                    "subscribe timed out"
                );
                Err(SubscriptionError::Timeout(self.timeout))
            }
        }
    }

    async fn submit(
        &self,
        backend: &dyn SubscriberBackend,
        email: String,
    ) -> Result<SubscribeOutcome, SubscriptionError> {
        if backend.exists(&email).await.map_err(unavailable)? {
            debug!(backend = backend.name(), "address already subscribed");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        let subscriber = Subscriber::new(email, self.source.clone());
        match backend.insert(&subscriber).await {
            Ok(()) => {
                info!(backend = backend.name(), source = %subscriber.source, "new subscriber");
                Ok(SubscribeOutcome::Subscribed)
            }
            Err(BackendError::Duplicate) => {
                debug!(backend = backend.name(), "insert lost to a concurrent subscribe");
                Ok(SubscribeOutcome::AlreadySubscribed)
            }
            Err(err) => Err(unavailable(err)),
        }
    }
}

fn unavailable(err: BackendError) -> SubscriptionError {
    match err {
        BackendError::Unavailable(reason) => SubscriptionError::BackendUnavailable(reason),
        BackendError::Duplicate => {
            SubscriptionError::BackendUnavailable("unexpected duplicate response".to_string())
        }
    }
}
