use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance tag used when the caller does not supply one.
pub const DEFAULT_SOURCE: &str = "roadmap";

/// A captured email subscription. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Normalized address; the unique key in every backend.
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    /// Which surface captured the address.
    pub source: String,
}

impl Subscriber {
    pub fn new(email: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            subscribed_at: Utc::now(),
            source: source.into(),
        }
    }
}
