//! Resources injected into assets and checks at execution time.

use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ResourceError;

/// Database value that opens an in-memory DuckDB.
pub const IN_MEMORY: &str = ":memory:";

/// Retry policy for opening a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 10000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries: fail on the first error.
    pub fn none() -> Self {
        Self::with_max_retries(0)
    }

    /// Default backoff with a different retry count.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero-based), capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let delay = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(delay as u64)
    }
}

/// DuckDB connection descriptor.
///
/// Holds configuration only. The database file is opened by
/// [`DuckDbResource::get_connection`], never at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuckDbResource {
    /// Path to the database file, or `:memory:`.
    pub database: String,
}

impl DuckDbResource {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    /// Open a connection, retrying with the default backoff.
    pub fn get_connection(&self) -> Result<Connection, ResourceError> {
        self.get_connection_with_retry(&RetryConfig::default())
    }

    /// Open a connection, retrying on failure per `retry`.
    ///
    /// DuckDB allows one writing process per file, so a concurrent run holding
    /// the lock shows up as an open error that clears once it finishes.
    pub fn get_connection_with_retry(
        &self,
        retry: &RetryConfig,
    ) -> Result<Connection, ResourceError> {
        let mut attempt = 0;
        loop {
            match self.open() {
                Ok(conn) => {
                    tracing::debug!(database = %self.database, attempt, "Opened DuckDB connection");
                    return Ok(conn);
                }
                Err(e) if attempt < retry.max_retries => {
                    let delay = retry.delay_for(attempt);
                    tracing::warn!(
                        database = %self.database,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Failed to open DuckDB connection, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ResourceError::Connection {
                        database: self.database.clone(),
                        source: e,
                    })
                }
            }
        }
    }

    fn open(&self) -> duckdb::Result<Connection> {
        if self.database == IN_MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(&self.database)
        }
    }
}

/// A resource handle registered under a string key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceDefinition {
    #[serde(rename = "duckdb")]
    DuckDb(DuckDbResource),
}

impl ResourceDefinition {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceDefinition::DuckDb(_) => "duckdb",
        }
    }

    pub fn as_duckdb(&self) -> &DuckDbResource {
        match self {
            ResourceDefinition::DuckDb(db) => db,
        }
    }
}

impl From<DuckDbResource> for ResourceDefinition {
    fn from(resource: DuckDbResource) -> Self {
        ResourceDefinition::DuckDb(resource)
    }
}
