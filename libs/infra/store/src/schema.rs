// [libs/infra/store/src/schema.rs]
//! Schema bootstrap. `apply_schema` is idempotent (`CREATE TABLE IF NOT
//! EXISTS` / `CREATE INDEX IF NOT EXISTS`) so it is safe to call on every
//! connect, the way the teacher's `client.rs` bootstraps on every connect.

use crate::errors::StoreError;
use libsql::Connection;

const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS miners (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        family TEXT NOT NULL,
        host TEXT NOT NULL,
        port INTEGER,
        current_mode TEXT,
        firmware_version TEXT,
        manual_power_watts REAL,
        enabled INTEGER NOT NULL DEFAULT 1,
        config TEXT NOT NULL DEFAULT '{}',
        last_mode_change TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS pools (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        host TEXT NOT NULL,
        port INTEGER NOT NULL,
        user TEXT NOT NULL,
        password TEXT NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        priority INTEGER NOT NULL DEFAULT 0,
        network_difficulty REAL,
        network_difficulty_stale INTEGER NOT NULL DEFAULT 0,
        best_share REAL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS miner_pool_slots (
        miner_id INTEGER NOT NULL,
        slot_number INTEGER NOT NULL,
        pool_id INTEGER,
        pool_url TEXT NOT NULL,
        pool_port INTEGER NOT NULL,
        pool_user TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 0,
        last_seen TEXT NOT NULL,
        PRIMARY KEY (miner_id, slot_number)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS telemetry (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        miner_id INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        hashrate REAL NOT NULL,
        hashrate_unit TEXT NOT NULL,
        temperature REAL,
        power_watts REAL,
        shares_accepted INTEGER,
        shares_rejected INTEGER,
        pool_in_use TEXT,
        data TEXT NOT NULL DEFAULT '{}'
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_telemetry_miner_ts ON telemetry (miner_id, timestamp)",
    r#"CREATE TABLE IF NOT EXISTS energy_prices (
        region TEXT NOT NULL,
        valid_from TEXT NOT NULL,
        valid_to TEXT NOT NULL,
        price_pence REAL NOT NULL,
        PRIMARY KEY (region, valid_from)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS agile_strategy (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        enabled INTEGER NOT NULL DEFAULT 0,
        current_price_band TEXT,
        hysteresis_counter INTEGER NOT NULL DEFAULT 0,
        last_action_time TEXT,
        last_price_checked REAL,
        state_data TEXT NOT NULL DEFAULT '{}'
    )"#,
    r#"CREATE TABLE IF NOT EXISTS agile_strategy_bands (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        strategy_id INTEGER NOT NULL,
        sort_order INTEGER NOT NULL,
        min_price REAL,
        max_price REAL,
        target_coin TEXT NOT NULL,
        avalon_nano_mode TEXT NOT NULL,
        bitaxe_mode TEXT NOT NULL,
        nerdqaxe_mode TEXT NOT NULL,
        UNIQUE (strategy_id, sort_order)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS miner_strategy (
        miner_id INTEGER PRIMARY KEY,
        strategy_enabled INTEGER NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS pool_strategies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        strategy_type TEXT NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        pool_ids TEXT NOT NULL DEFAULT '[]',
        miner_ids TEXT NOT NULL DEFAULT '[]',
        config TEXT NOT NULL DEFAULT '{}',
        current_pool_index INTEGER NOT NULL DEFAULT 0,
        last_switch TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS automation_rules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        trigger_type TEXT NOT NULL,
        trigger_config TEXT NOT NULL DEFAULT '{}',
        action_type TEXT NOT NULL,
        action_config TEXT NOT NULL DEFAULT '{}',
        priority INTEGER NOT NULL DEFAULT 100,
        last_executed_at TEXT,
        last_execution_context TEXT NOT NULL DEFAULT '{}'
    )"#,
    r#"CREATE TABLE IF NOT EXISTS high_diff_shares (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        miner_id INTEGER NOT NULL,
        coin TEXT NOT NULL,
        pool_name TEXT NOT NULL,
        difficulty REAL NOT NULL,
        network_difficulty REAL,
        hashrate REAL NOT NULL,
        mode TEXT,
        was_block_solve INTEGER NOT NULL DEFAULT 0,
        timestamp TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_high_diff_miner ON high_diff_shares (miner_id, difficulty)",
    r#"CREATE TABLE IF NOT EXISTS blocks_found (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        miner_id INTEGER NOT NULL,
        coin TEXT NOT NULL,
        pool_name TEXT NOT NULL,
        difficulty REAL NOT NULL,
        network_difficulty REAL NOT NULL,
        timestamp TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS pool_health (
        pool_id INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        is_reachable INTEGER NOT NULL,
        response_time_ms INTEGER,
        reject_rate REAL NOT NULL,
        shares_accepted INTEGER NOT NULL,
        shares_rejected INTEGER NOT NULL,
        health_score INTEGER NOT NULL,
        luck_percentage REAL,
        error_message TEXT
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_pool_health_pool_ts ON pool_health (pool_id, timestamp)",
    r#"CREATE TABLE IF NOT EXISTS health_scores (
        miner_id INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        overall_score INTEGER NOT NULL,
        sub_scores TEXT NOT NULL DEFAULT '{}'
    )"#,
    r#"CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        event_type TEXT NOT NULL,
        source TEXT NOT NULL,
        message TEXT NOT NULL,
        data TEXT
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_events_ts ON events (timestamp)",
    r#"CREATE TABLE IF NOT EXISTS daily_aggregates (
        miner_id INTEGER NOT NULL,
        day TEXT NOT NULL,
        avg_hashrate REAL NOT NULL,
        avg_temperature REAL,
        total_shares_accepted INTEGER NOT NULL,
        total_shares_rejected INTEGER NOT NULL,
        PRIMARY KEY (miner_id, day)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        actor TEXT NOT NULL,
        action TEXT NOT NULL,
        resource_type TEXT NOT NULL,
        resource_id INTEGER,
        resource_name TEXT,
        changes TEXT,
        status TEXT NOT NULL,
        error_message TEXT
    )"#,
];

pub async fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
    for stmt in STATEMENTS {
        conn.execute(stmt, ()).await?;
    }
    Ok(())
}
