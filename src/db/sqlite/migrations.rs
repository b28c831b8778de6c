//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Apply every migration not yet recorded in the `migrations` table
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_trades", CREATE_TRADES_TABLE)?;
    run_migration(conn, "002_ingestion_log", CREATE_INGESTION_LOG_TABLE)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_TRADES_TABLE: &str = r#"
CREATE TABLE trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_date TEXT,
    instrument_code TEXT NOT NULL,
    update_action TEXT NOT NULL,
    trade_price REAL NOT NULL,
    trade_quantity INTEGER NOT NULL,
    closing_time TEXT,
    trade_identifier_code TEXT NOT NULL,
    session_type TEXT NOT NULL,
    trade_date TEXT,
    buyer_participant_code TEXT NOT NULL,
    seller_participant_code TEXT NOT NULL
);
CREATE INDEX idx_trades_instrument_code ON trades(instrument_code);
CREATE INDEX idx_trades_trade_date ON trades(trade_date);
"#;

const CREATE_INGESTION_LOG_TABLE: &str = r#"
CREATE TABLE ingestion_log (
    file_date TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    row_count INTEGER NOT NULL,
    ingested_at TEXT NOT NULL
);
"#;
