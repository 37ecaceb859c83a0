// [libs/infra/store/src/client.rs]
use crate::errors::StoreError;
use crate::schema::apply_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{info, instrument};

/// Thin handle over a libSQL database. Cheap to clone — every repository
/// holds one and opens its own `Connection` per call, matching the teacher's
/// `TursoClient` / `get_connection()` shape.
#[derive(Clone)]
pub struct Store {
    database: Arc<Database>,
    /// Keeps an in-memory database alive across connections; `None` for
    /// file-backed or remote targets.
    _memory_anchor: Option<Arc<Connection>>,
}

impl Store {
    /// `url` is either a local file path, `:memory:`, or a `libsql://` /
    /// `https://` remote endpoint (in which case `auth_token` is required).
    #[instrument(skip(auth_token))]
    pub async fn connect(url: &str, auth_token: Option<String>) -> Result<Self, StoreError> {
        if url.is_empty() {
            return Err(StoreError::Connection("database url is empty".into()));
        }

        let is_remote = url.starts_with("libsql://") || url.starts_with("https://");
        let is_memory = url == ":memory:" || url.contains("mode=memory");

        let database = if is_remote {
            let token = auth_token
                .ok_or_else(|| StoreError::Connection("remote store requires an auth token".into()))?;
            Builder::new_remote(url.to_string(), token)
                .build()
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?
        } else {
            Builder::new_local(url)
                .build()
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?
        };

        let database = Arc::new(database);
        let mut anchor = None;

        if is_memory {
            // An in-memory SQLite database is dropped the moment its last
            // connection closes; hold one open for the process lifetime so
            // the schema (and data) survive between repository calls.
            let conn = database
                .connect()
                .map_err(|e| StoreError::Connection(e.to_string()))?;
            apply_schema(&conn).await?;
            anchor = Some(Arc::new(conn));
        } else {
            let conn = database
                .connect()
                .map_err(|e| StoreError::Connection(e.to_string()))?;
            apply_schema(&conn).await?;
        }

        info!(%url, "store connected and schema applied");
        Ok(Self {
            database,
            _memory_anchor: anchor,
        })
    }

    pub fn connection(&self) -> Result<Connection, StoreError> {
        self.database
            .connect()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}
