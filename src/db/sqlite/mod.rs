//! SQLite database module

pub mod models;
mod connection;
mod ingestion_log;
mod migrations;
mod trades;

pub use connection::SqlitePool;

use crate::error::Result;
use crate::ingest::TradeStore;
use chrono::NaiveDate;
use models::*;
use std::path::Path;

/// Pooled SQLite store shared by ingestion workers and HTTP handlers
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and bring the schema up to date
    pub fn open(path: &Path, pool_size: u32) -> Result<Self> {
        let pool = connection::create_pool(path, pool_size)?;
        let store = Self { pool };
        store.run_migrations()?;

        tracing::info!("SQLite store opened at {:?}", path);
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.pool.get()?;
        migrations::run_migrations(&conn)
    }

    /// Cheap round trip used by readiness checks
    pub fn ping(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    // ========== Trade Methods ==========

    pub fn count_trades_for_date(&self, day: NaiveDate) -> Result<i64> {
        let conn = self.pool.get()?;
        trades::count_trades_for_date(&conn, day)
    }

    /// Price and volume extremes for a ticker in an inclusive date range
    pub fn aggregate_by_ticker(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Option<Aggregate>> {
        let conn = self.pool.get()?;
        trades::aggregate_by_ticker(&conn, ticker, start, end)
    }

    // ========== Ledger Methods ==========

    pub fn get_ingestion_entry(&self, day: NaiveDate) -> Result<Option<IngestionLogEntry>> {
        let conn = self.pool.get()?;
        ingestion_log::get_ingestion_entry(&conn, day)
    }

    pub fn list_ingestion_log(&self) -> Result<Vec<IngestionLogEntry>> {
        let conn = self.pool.get()?;
        ingestion_log::list_ingestion_log(&conn)
    }
}

impl TradeStore for SqliteStore {
    fn insert_trades_batch(&self, batch: &[Trade]) -> Result<()> {
        let mut conn = self.pool.get()?;
        trades::insert_trades(&mut conn, batch)
    }

    fn has_ingestion_for_date(&self, day: NaiveDate) -> Result<bool> {
        let conn = self.pool.get()?;
        ingestion_log::has_ingestion_for_date(&conn, day)
    }

    fn upsert_ingestion_log(&self, day: NaiveDate, filename: &str, row_count: usize) -> Result<()> {
        let conn = self.pool.get()?;
        ingestion_log::upsert_ingestion_log(&conn, day, filename, row_count)
    }

    fn delete_trades_by_date(&self, day: NaiveDate) -> Result<()> {
        let conn = self.pool.get()?;
        trades::delete_trades_by_date(&conn, day)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parser::EXPECTED_HEADER;
    use crate::ingest::{process_directory, IngestOptions};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_open_creates_parent_and_pings() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("nested/trades.db"), 2).unwrap();
        store.ping().unwrap();

        // reopening applies no migration twice
        let again = SqliteStore::open(&dir.path().join("nested/trades.db"), 2).unwrap();
        assert!(again.list_ingestion_log().unwrap().is_empty());
    }

    #[test]
    fn test_trade_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("trades.db"), 2).unwrap();
        let day = date(2024, 6, 10);

        store
            .insert_trades_batch(&[Trade {
                instrument_code: "PETR4".to_string(),
                trade_price: 38.5,
                trade_quantity: 10,
                trade_date: Some(day),
                ..Trade::default()
            }])
            .unwrap();
        store.upsert_ingestion_log(day, "10-06-2024_NEGOCIOSAVISTA.txt", 1).unwrap();

        assert!(store.has_ingestion_for_date(day).unwrap());
        assert_eq!(store.count_trades_for_date(day).unwrap(), 1);

        store.delete_trades_by_date(day).unwrap();
        assert_eq!(store.count_trades_for_date(day).unwrap(), 0);
        // the ledger is left alone by deletes
        assert!(store.get_ingestion_entry(day).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_ingestion_into_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        std::fs::create_dir_all(&input).unwrap();

        // Friday 14 June 2024 back to Monday 10 June
        let days = [
            date(2024, 6, 14),
            date(2024, 6, 13),
            date(2024, 6, 12),
            date(2024, 6, 11),
            date(2024, 6, 10),
        ];
        for (i, day) in days.iter().enumerate() {
            let mut content = EXPECTED_HEADER.join(";");
            content.push('\n');
            for q in 0..(i + 1) * 10 {
                content.push_str(&format!("{day};PETR4;0;{},5;{};100000;1;1;{day};1;2\n", 30 + i, q + 1));
            }
            let name = format!("{}_NEGOCIOSAVISTA.txt", day.format("%d-%m-%Y"));
            std::fs::write(input.join(name), content).unwrap();
        }

        let store = Arc::new(SqliteStore::open(&dir.path().join("trades.db"), 4).unwrap());
        let options = IngestOptions {
            days: 5,
            parallelism: 4,
            force: false,
            batch_size: 7,
            as_of: Some(date(2024, 6, 14)),
        };

        let report = process_directory(&CancellationToken::new(), &input, store.clone(), &options)
            .await
            .unwrap();
        assert_eq!(report.rows(), 150);

        for (i, day) in days.iter().enumerate() {
            assert_eq!(store.count_trades_for_date(*day).unwrap(), ((i + 1) * 10) as i64);
            let entry = store.get_ingestion_entry(*day).unwrap().unwrap();
            assert_eq!(entry.row_count, ((i + 1) * 10) as i64);
        }

        let forced = IngestOptions { force: true, ..options };
        process_directory(&CancellationToken::new(), &input, store.clone(), &forced)
            .await
            .unwrap();
        assert_eq!(store.count_trades_for_date(days[0]).unwrap(), 10);

        let agg = store
            .aggregate_by_ticker("PETR4", Some(days[4]), Some(days[0]))
            .unwrap()
            .unwrap();
        assert_eq!(agg.max_range_value, 34.5);
        assert_eq!(agg.max_daily_volume, (1..=50).sum::<i64>());
    }
}
