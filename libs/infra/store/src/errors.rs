// [libs/infra/store/src/errors.rs]
use thiserror::Error;

/// Error catalog for the persistence layer. `StoreTransientError` is the one
/// the scheduler's retry-with-backoff logic matches on (§4.3, §7); every
/// other variant is either a caller bug or a genuine data problem.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("row decode failed: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient contention, retry: {0}")]
    Transient(String),
}

impl StoreError {
    /// SQLite/libSQL surface write-lock contention as a generic driver
    /// error string; this is the narrow heuristic the commit-retry loop in
    /// telemetry ingest (§4.3, §7) uses to decide whether to back off and
    /// retry rather than give up on the tick.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transient(_) => true,
            StoreError::Query(e) => {
                let msg = e.to_string().to_ascii_lowercase();
                msg.contains("locked") || msg.contains("busy")
            }
            _ => false,
        }
    }
}
