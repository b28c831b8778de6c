//! In-memory [`TradeStore`] used by the ingestion tests

use super::store::TradeStore;
use crate::db::sqlite::models::Trade;
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Which store operation should fail
#[derive(Debug, Default, Clone)]
pub struct Failures {
    /// Fail the insert call with this 1-based index
    pub insert_call: Option<usize>,
    pub has_ingestion: bool,
    pub upsert: bool,
    pub delete: bool,
}

/// Recorded store operation, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Insert(usize),
    Delete(NaiveDate),
    Upsert(NaiveDate, usize),
}

#[derive(Default)]
pub struct MemoryStore {
    pub trades: Mutex<Vec<Trade>>,
    pub batches: Mutex<Vec<usize>>,
    pub ledger: Mutex<HashMap<NaiveDate, (String, usize)>>,
    pub ops: Mutex<Vec<Op>>,
    pub failures: Failures,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: Failures) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    /// Pre-populate the ledger and trades as if `day` had been ingested
    pub fn seed_day(&self, day: NaiveDate, rows: usize) {
        let mut trades = self.trades.lock();
        for _ in 0..rows {
            trades.push(Trade {
                trade_date: Some(day),
                ..Trade::default()
            });
        }
        self.ledger.lock().insert(day, ("seeded".to_string(), rows));
    }

    pub fn inserted_rows(&self) -> usize {
        self.batches.lock().iter().sum()
    }

    pub fn trades_on(&self, day: NaiveDate) -> usize {
        self.trades
            .lock()
            .iter()
            .filter(|t| t.trade_date == Some(day))
            .count()
    }

    pub fn ops_for_delete_or_upsert(&self) -> Vec<Op> {
        self.ops
            .lock()
            .iter()
            .filter(|op| !matches!(op, Op::Insert(_)))
            .cloned()
            .collect()
    }
}

impl TradeStore for MemoryStore {
    fn insert_trades_batch(&self, trades: &[Trade]) -> Result<()> {
        let mut batches = self.batches.lock();
        if self.failures.insert_call == Some(batches.len() + 1) {
            return Err(AppError::Internal("insert failed".to_string()));
        }
        batches.push(trades.len());
        self.trades.lock().extend_from_slice(trades);
        self.ops.lock().push(Op::Insert(trades.len()));
        Ok(())
    }

    fn has_ingestion_for_date(&self, day: NaiveDate) -> Result<bool> {
        if self.failures.has_ingestion {
            return Err(AppError::Internal("ledger unavailable".to_string()));
        }
        Ok(self.ledger.lock().contains_key(&day))
    }

    fn upsert_ingestion_log(&self, day: NaiveDate, filename: &str, row_count: usize) -> Result<()> {
        if self.failures.upsert {
            return Err(AppError::Internal("upsert failed".to_string()));
        }
        self.ledger
            .lock()
            .insert(day, (filename.to_string(), row_count));
        self.ops.lock().push(Op::Upsert(day, row_count));
        Ok(())
    }

    fn delete_trades_by_date(&self, day: NaiveDate) -> Result<()> {
        if self.failures.delete {
            return Err(AppError::Internal("delete failed".to_string()));
        }
        self.trades.lock().retain(|t| t.trade_date != Some(day));
        self.ops.lock().push(Op::Delete(day));
        Ok(())
    }
}
