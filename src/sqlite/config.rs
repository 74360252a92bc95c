use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::connection::SqliteDriver;

/// Options for a `SQLite` driver connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteOptions {
    /// Database file path, or `:memory:`.
    pub db_path: String,
    /// Switch the database to WAL journaling when the connection opens.
    pub wal: bool,
    pub busy_timeout: Option<Duration>,
    /// Statements run on every fresh connection before `open` reports success.
    #[serde(default)]
    pub init_sql: Option<String>,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            wal: false,
            busy_timeout: None,
            init_sql: None,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(":memory:".to_string())
    }

    #[must_use]
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn init_sql(mut self, sql: impl Into<String>) -> Self {
        self.opts.init_sql = Some(sql.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build an unopened driver connection from these options.
    #[must_use]
    pub fn build(self) -> SqliteDriver {
        SqliteDriver::new(self.finish())
    }
}

impl SqliteDriver {
    #[must_use]
    pub fn builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }
}
