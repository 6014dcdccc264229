//! Email subscription capture.
//!
//! [`SubscriptionGateway`] validates an address, then asks a
//! [`SubscriberBackend`] whether it is known and inserts it if not. Backends:
//!
//! - [`MemoryBackend`]: process-local, used in tests and for `memory` setups
//! - [`SqliteBackend`]: the `subscribers` table in `.roadmap/roadmap.db`
//! - [`HttpBackend`]: a remote JSON API
//!
//! With no backend configured the gateway reports
//! [`SubscriptionError::BackendUnavailable`] so callers can offer a fallback.

pub mod backend;
pub mod email;
pub mod gateway;
pub mod http;
pub mod sqlite;

pub use backend::{BackendError, MemoryBackend, SubscriberBackend};
pub use email::{EmailError, normalize_email};
pub use gateway::{DEFAULT_TIMEOUT, SubscribeOutcome, SubscriptionError, SubscriptionGateway};
pub use http::HttpBackend;
pub use sqlite::SqliteBackend;
