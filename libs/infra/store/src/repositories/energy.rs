// [libs/infra/store/src/repositories/energy.rs]
use super::decode::{fmt_ts, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use chrono::{DateTime, Utc};
use fleet_models::EnergyPrice;
use libsql::params;
use tracing::instrument;

pub struct EnergyPriceRepository {
    store: Store,
}

impl EnergyPriceRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn from_row(row: &libsql::Row) -> Result<EnergyPrice, StoreError> {
        let valid_from: String = row.get(1)?;
        let valid_to: String = row.get(2)?;
        Ok(EnergyPrice {
            region: row.get(0)?,
            valid_from: parse_ts(&valid_from)?,
            valid_to: parse_ts(&valid_to)?,
            price_pence: row.get(3)?,
        })
    }

    /// Dedup key is `(region, valid_from)` (§3, §8 invariant 1): a refetch of
    /// the same slot overwrites rather than duplicates.
    #[instrument(skip(self))]
    pub async fn upsert(&self, price: &EnergyPrice) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO energy_prices (region, valid_from, valid_to, price_pence) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (region, valid_from) DO UPDATE SET \
             valid_to = excluded.valid_to, price_pence = excluded.price_pence",
            params![
                price.region.clone(),
                fmt_ts(price.valid_from),
                fmt_ts(price.valid_to),
                price.price_pence,
            ],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_price_at(&self, region: &str, at: DateTime<Utc>) -> Result<Option<EnergyPrice>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT region, valid_from, valid_to, price_pence FROM energy_prices \
                 WHERE region = ?1 AND valid_from <= ?2 AND valid_to > ?2",
                params![region, fmt_ts(at)],
            )
            .await?;
        rows.next().await?.map(|r| Self::from_row(&r)).transpose()
    }

    #[instrument(skip(self))]
    pub async fn get_current_price(&self, region: &str) -> Result<Option<EnergyPrice>, StoreError> {
        self.get_price_at(region, Utc::now()).await
    }

    /// The look-ahead slot the Agile Solo hysteresis gate needs (§4.5): the
    /// slot starting strictly after the current one, if already fetched.
    #[instrument(skip(self))]
    pub async fn get_next_price(&self, region: &str, after: DateTime<Utc>) -> Result<Option<EnergyPrice>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT region, valid_from, valid_to, price_pence FROM energy_prices \
                 WHERE region = ?1 AND valid_from >= ?2 ORDER BY valid_from ASC LIMIT 1",
                params![region, fmt_ts(after)],
            )
            .await?;
        rows.next().await?.map(|r| Self::from_row(&r)).transpose()
    }

    #[instrument(skip(self))]
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "DELETE FROM energy_prices WHERE valid_to < ?1",
            params![fmt_ts(cutoff)],
        )
        .await
        .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use chrono::Duration;

    async fn repo() -> EnergyPriceRepository {
        let store = Store::connect(":memory:", None).await.unwrap();
        EnergyPriceRepository::new(store)
    }

    #[tokio::test]
    async fn adjacent_slots_never_both_match_a_lookup() {
        let repo = repo().await;
        let base = Utc::now();
        let slot_a_from = base;
        let slot_a_to = base + Duration::minutes(30);
        let slot_b_from = slot_a_to;
        let slot_b_to = slot_b_from + Duration::minutes(30);

        repo.upsert(&EnergyPrice {
            region: "H".into(),
            valid_from: slot_a_from,
            valid_to: slot_a_to,
            price_pence: 10.0,
        })
        .await
        .unwrap();
        repo.upsert(&EnergyPrice {
            region: "H".into(),
            valid_from: slot_b_from,
            valid_to: slot_b_to,
            price_pence: 20.0,
        })
        .await
        .unwrap();

        // Exactly on the boundary belongs to the second slot (valid_from is
        // inclusive, valid_to is exclusive) — never both, never neither.
        let at_boundary = repo.get_price_at("H", slot_b_from).await.unwrap().unwrap();
        assert_eq!(at_boundary.price_pence, 20.0);

        let just_before = repo.get_price_at("H", slot_a_to - Duration::seconds(1)).await.unwrap().unwrap();
        assert_eq!(just_before.price_pence, 10.0);
    }

    #[tokio::test]
    async fn refetching_the_same_slot_overwrites_not_duplicates() {
        let repo = repo().await;
        let from = Utc::now();
        let to = from + Duration::minutes(30);
        repo.upsert(&EnergyPrice { region: "H".into(), valid_from: from, valid_to: to, price_pence: 10.0 })
            .await
            .unwrap();
        repo.upsert(&EnergyPrice { region: "H".into(), valid_from: from, valid_to: to, price_pence: 15.0 })
            .await
            .unwrap();

        let price = repo.get_price_at("H", from).await.unwrap().unwrap();
        assert_eq!(price.price_pence, 15.0);
    }
}
