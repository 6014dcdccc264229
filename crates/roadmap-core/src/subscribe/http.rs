use super::backend::{BackendError, SubscriberBackend};
use crate::model::Subscriber;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Subscriber list behind a small JSON/HTTP API.
///
/// - `GET {endpoint}/subscribers?email=<email>` returns a JSON array of
///   matching records (empty when unknown)
/// - `POST {endpoint}/subscribers` with a subscriber JSON body creates one;
///   `409 Conflict` means the address already exists
///
/// Requests use blocking `ureq` calls moved onto tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    /// Build a backend for `endpoint` with a per-request transport timeout.
    #[must_use]
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("roadmap/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/subscribers", self.endpoint)
    }

    async fn blocking<T, F>(f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, BackendError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| BackendError::Unavailable(format!("http task failed: {e}")))?
    }
}

fn transport_error(err: ureq::Error) -> BackendError {
    match err {
        ureq::Error::Status(code, _) => BackendError::Unavailable(format!("HTTP {code}")),
        ureq::Error::Transport(transport) => BackendError::Unavailable(transport.to_string()),
    }
}

#[async_trait]
impl SubscriberBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn exists(&self, email: &str) -> Result<bool, BackendError> {
        let request = self
            .agent
            .get(&self.collection_url())
            .query("email", email);
        Self::blocking(move || {
            let response = request.call().map_err(transport_error)?;
            let matches: Vec<serde_json::Value> = response
                .into_json()
                .map_err(|e| BackendError::Unavailable(format!("bad response body: {e}")))?;
            Ok(!matches.is_empty())
        })
        .await
    }

    async fn insert(&self, subscriber: &Subscriber) -> Result<(), BackendError> {
        let request = self.agent.post(&self.collection_url());
        let body = subscriber.clone();
        Self::blocking(move || match request.send_json(&body) {
            Ok(response) => {
                debug!(status = response.status(), "subscriber created");
                Ok(())
            }
            Err(ureq::Error::Status(409, _)) => Err(BackendError::Duplicate),
            Err(err) => Err(transport_error(err)),
        })
        .await
    }
}
