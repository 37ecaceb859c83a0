// [libs/infra/store/src/repositories/pool.rs]
use crate::errors::StoreError;
use crate::Store;
use fleet_models::Pool;
use libsql::params;
use tracing::instrument;

pub struct PoolRepository {
    store: Store,
}

impl PoolRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn from_row(row: &libsql::Row) -> Result<Pool, StoreError> {
        Ok(Pool {
            id: row.get(0)?,
            name: row.get(1)?,
            host: row.get(2)?,
            port: row.get::<i64>(3)? as u16,
            user: row.get(4)?,
            password: row.get(5)?,
            enabled: row.get::<i64>(6)? != 0,
            priority: row.get::<i64>(7)? as i32,
            network_difficulty: row.get(8)?,
            network_difficulty_stale: row.get::<i64>(9)? != 0,
            best_share: row.get(10)?,
        })
    }

    const COLUMNS: &'static str =
        "id, name, host, port, user, password, enabled, priority, network_difficulty, \
         network_difficulty_stale, best_share";

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Pool>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!("SELECT {} FROM pools ORDER BY priority, id", Self::COLUMNS);
        let mut rows = conn.query(&sql, ()).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::from_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn list_enabled(&self) -> Result<Vec<Pool>, StoreError> {
        Ok(self.list_all().await?.into_iter().filter(|p| p.enabled).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Pool, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!("SELECT {} FROM pools WHERE id = ?1", Self::COLUMNS);
        let mut rows = conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(StoreError::NotFound(format!("pool {id}"))),
        }
    }

    /// Matches by normalised `host:port` — the only stable join key between
    /// a `Pool` row and whatever a fixed-slot family reports for its slots
    /// (§4.8); pool names and ports are operator-editable free text.
    #[instrument(skip(self))]
    pub async fn find_by_host_port(&self, host: &str, port: u16) -> Result<Option<Pool>, StoreError> {
        let normalized = fleet_models::pool::normalize_pool_url(&format!("{host}:{port}"));
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|p| p.normalized_url() == normalized))
    }

    #[instrument(skip(self, pool))]
    pub async fn create(&self, pool: &Pool) -> Result<i64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO pools (name, host, port, user, password, enabled, priority, \
             network_difficulty, network_difficulty_stale, best_share) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                pool.name.clone(),
                pool.host.clone(),
                pool.port as i64,
                pool.user.clone(),
                pool.password.clone(),
                pool.enabled as i64,
                pool.priority as i64,
                pool.network_difficulty,
                pool.network_difficulty_stale as i64,
                pool.best_share,
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    #[instrument(skip(self))]
    pub async fn update_network_difficulty(&self, id: i64, difficulty: f64) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE pools SET network_difficulty = ?2, network_difficulty_stale = 0 WHERE id = ?1",
            params![id, difficulty],
        )
        .await?;
        Ok(())
    }

    /// Called when a difficulty refresh fails, so stale data stays visible
    /// rather than silently disappearing (§4.4).
    #[instrument(skip(self))]
    pub async fn mark_stale(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE pools SET network_difficulty_stale = 1 WHERE id = ?1",
            params![id],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn update_best_share(&self, id: i64, best_share: f64) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE pools SET best_share = ?2 WHERE id = ?1 AND (best_share IS NULL OR best_share < ?2)",
            params![id, best_share],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute("DELETE FROM pools WHERE id = ?1", params![id]).await?;
        Ok(())
    }
}
