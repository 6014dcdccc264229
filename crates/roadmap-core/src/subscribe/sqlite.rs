use super::backend::{BackendError, SubscriberBackend};
use crate::model::Subscriber;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Subscriber list stored in the `subscribers` table of the roadmap database.
///
/// SQLite calls run on tokio's blocking pool; the table's primary key makes
/// concurrent inserts of the same address safe.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Wrap an already-migrated connection.
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open the roadmap database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] if the database cannot be opened
    /// or migrated.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let conn =
            crate::db::open_db(path).map_err(|e| BackendError::Unavailable(format!("{e:#}")))?;
        Ok(Self::new(conn))
    }

    /// All stored subscribers, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] on any SQLite failure.
    pub fn list(&self) -> Result<Vec<Subscriber>, BackendError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT email, subscribed_at, source FROM subscribers
                 ORDER BY subscribed_at ASC, email ASC",
            )
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(unavailable)?;

        let mut subscribers = Vec::new();
        for row in rows {
            let (email, subscribed_at, source) = row.map_err(unavailable)?;
            let subscribed_at = DateTime::parse_from_rfc3339(&subscribed_at)
                .map_err(|e| BackendError::Unavailable(format!("bad subscribed_at: {e}")))?
                .with_timezone(&Utc);
            subscribers.push(Subscriber {
                email,
                subscribed_at,
                source,
            });
        }
        Ok(subscribers)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, BackendError> {
        self.conn
            .lock()
            .map_err(|_| BackendError::Unavailable("sqlite backend lock poisoned".to_string()))
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, BackendError> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = this.lock()?;
            f(&conn)
        })
        .await
        .map_err(|e| BackendError::Unavailable(format!("sqlite task failed: {e}")))?
    }
}

fn unavailable(err: rusqlite::Error) -> BackendError {
    BackendError::Unavailable(err.to_string())
}

#[async_trait]
impl SubscriberBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn exists(&self, email: &str) -> Result<bool, BackendError> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT 1 FROM subscribers WHERE email = ?1",
                params![email],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
            .map_err(unavailable)
        })
        .await
    }

    async fn insert(&self, subscriber: &Subscriber) -> Result<(), BackendError> {
        let subscriber = subscriber.clone();
        self.with_conn(move |conn| {
            let result = conn.execute(
                "INSERT INTO subscribers (email, subscribed_at, source) VALUES (?1, ?2, ?3)",
                params![
                    subscriber.email,
                    subscriber.subscribed_at.to_rfc3339(),
                    subscriber.source
                ],
            );
            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation
                        && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
                {
                    Err(BackendError::Duplicate)
                }
                Err(err) => Err(unavailable(err)),
            }
        })
        .await
    }
}
