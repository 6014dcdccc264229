//! SQLite schema for the local roadmap database.
//!
//! - `kv_store` backs the client-local durable store used by the vote ledger
//! - `subscribers` is the append-only subscriber list, keyed by email
//! - `roadmap_meta` tracks the schema version for diagnostics

/// Migration v1: key-value table, subscriber list, metadata row.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY CHECK (length(key) > 0),
    value TEXT NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS subscribers (
    email TEXT PRIMARY KEY CHECK (email = lower(trim(email)) AND instr(email, '@') > 1),
    subscribed_at TEXT NOT NULL,
    source TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS roadmap_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL
);

INSERT OR IGNORE INTO roadmap_meta (id, schema_version, created_at_us)
VALUES (1, 1, CAST(strftime('%s', 'now') AS INTEGER) * 1000000);
";

/// Migration v2: lookup indexes for subscriber reporting.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_subscribers_source ON subscribers(source);
CREATE INDEX IF NOT EXISTS idx_subscribers_subscribed_at ON subscribers(subscribed_at);
";

/// Indexes expected after all migrations have run.
pub const REQUIRED_INDEXES: &[&str] = &["idx_subscribers_source", "idx_subscribers_subscribed_at"];
