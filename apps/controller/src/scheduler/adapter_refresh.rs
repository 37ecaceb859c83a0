// [apps/controller/src/scheduler/adapter_refresh.rs]
//! Periodic re-run of `adapters::refresh` (§4.1, §4.10) so a miner added,
//! edited, or disabled after process start eventually reaches the adapter
//! dispatch table and the passive registry without a restart.

use crate::app_state::AppState;
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    crate::adapters::refresh(&state).await
}
