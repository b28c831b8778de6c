//! Persistence contract consumed by the ingestion pipeline
//!
//! The parser and orchestrator never issue queries themselves; they only call
//! this trait, so the pipeline runs the same against SQLite or a test double.

use crate::db::sqlite::models::Trade;
use crate::error::Result;
use chrono::NaiveDate;

/// Trade persistence and per-day ingestion ledger.
///
/// Implementations are shared across worker threads and must tolerate
/// concurrent callers.
pub trait TradeStore: Send + Sync {
    /// Persist a batch of trades atomically: all rows become visible or none do
    fn insert_trades_batch(&self, trades: &[Trade]) -> Result<()>;

    /// Whether the ledger already records `day` as ingested
    fn has_ingestion_for_date(&self, day: NaiveDate) -> Result<bool>;

    /// Insert or overwrite the ledger entry for `day`, stamping the current time
    fn upsert_ingestion_log(&self, day: NaiveDate, filename: &str, row_count: usize) -> Result<()>;

    /// Remove every trade whose trade date is `day`
    fn delete_trades_by_date(&self, day: NaiveDate) -> Result<()>;
}
