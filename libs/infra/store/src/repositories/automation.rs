// [libs/infra/store/src/repositories/automation.rs]
use super::decode::{enum_from_db, enum_to_db, fmt_ts, parse_json_map, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use fleet_models::{ActionType, AutomationRule, TriggerType};
use libsql::params;
use tracing::instrument;

pub struct AutomationRuleRepository {
    store: Store,
}

impl AutomationRuleRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    const COLUMNS: &'static str = "id, name, enabled, trigger_type, trigger_config, \
        action_type, action_config, priority, last_executed_at, last_execution_context";

    fn from_row(row: &libsql::Row) -> Result<AutomationRule, StoreError> {
        let trigger_type: String = row.get(3)?;
        let trigger_config: String = row.get(4)?;
        let action_type: String = row.get(5)?;
        let action_config: String = row.get(6)?;
        let last_executed_at: Option<String> = row.get(8)?;
        let last_execution_context: String = row.get(9)?;
        Ok(AutomationRule {
            id: row.get(0)?,
            name: row.get(1)?,
            enabled: row.get::<i64>(2)? != 0,
            trigger_type: enum_from_db::<TriggerType>(&trigger_type)?,
            trigger_config: serde_json::from_str(&trigger_config).unwrap_or(serde_json::Value::Null),
            action_type: enum_from_db::<ActionType>(&action_type)?,
            action_config: serde_json::from_str(&action_config).unwrap_or(serde_json::Value::Null),
            priority: row.get::<i64>(7)? as i32,
            last_executed_at: last_executed_at.map(|s| parse_ts(&s)).transpose()?,
            last_execution_context: parse_json_map(&last_execution_context),
        })
    }

    /// Ascending priority order is the evaluation order (§4.7): lower
    /// `priority` numbers run first.
    #[instrument(skip(self))]
    pub async fn list_enabled_ordered(&self) -> Result<Vec<AutomationRule>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!(
            "SELECT {} FROM automation_rules WHERE enabled = 1 ORDER BY priority, id",
            Self::COLUMNS
        );
        let mut rows = conn.query(&sql, ()).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::from_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<AutomationRule, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!("SELECT {} FROM automation_rules WHERE id = ?1", Self::COLUMNS);
        let mut rows = conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(StoreError::NotFound(format!("automation rule {id}"))),
        }
    }

    #[instrument(skip(self, rule))]
    pub async fn save(&self, rule: &AutomationRule) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        if rule.id == 0 {
            conn.execute(
                "INSERT INTO automation_rules (name, enabled, trigger_type, trigger_config, \
                 action_type, action_config, priority, last_executed_at, last_execution_context) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    rule.name.clone(),
                    rule.enabled as i64,
                    enum_to_db(&rule.trigger_type),
                    rule.trigger_config.to_string(),
                    enum_to_db(&rule.action_type),
                    rule.action_config.to_string(),
                    rule.priority as i64,
                    rule.last_executed_at.map(fmt_ts),
                    super::decode::to_json_string(&rule.last_execution_context),
                ],
            )
            .await?;
        } else {
            conn.execute(
                "UPDATE automation_rules SET name = ?2, enabled = ?3, trigger_type = ?4, \
                 trigger_config = ?5, action_type = ?6, action_config = ?7, priority = ?8, \
                 last_executed_at = ?9, last_execution_context = ?10 WHERE id = ?1",
                params![
                    rule.id,
                    rule.name.clone(),
                    rule.enabled as i64,
                    enum_to_db(&rule.trigger_type),
                    rule.trigger_config.to_string(),
                    enum_to_db(&rule.action_type),
                    rule.action_config.to_string(),
                    rule.priority as i64,
                    rule.last_executed_at.map(fmt_ts),
                    super::decode::to_json_string(&rule.last_execution_context),
                ],
            )
            .await?;
        }
        Ok(())
    }

    /// Records the idempotency marker and firing timestamp atomically with
    /// the rule's other fields so a crash mid-action can't cause a double
    /// fire on restart (§4.7, §7).
    #[instrument(skip(self, context))]
    pub async fn record_execution(
        &self,
        id: i64,
        at: chrono::DateTime<chrono::Utc>,
        context: &std::collections::HashMap<String, serde_json::Value>,
    ) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE automation_rules SET last_executed_at = ?2, last_execution_context = ?3 \
             WHERE id = ?1",
            params![id, fmt_ts(at), super::decode::to_json_string(context)],
        )
        .await?;
        Ok(())
    }
}
