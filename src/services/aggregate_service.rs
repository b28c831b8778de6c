//! Aggregate Service
//!
//! Price and volume extremes for one ticker over a trade-date window.
//! Called by the REST API handlers.

use crate::db::sqlite::models::Aggregate;
use crate::db::sqlite::SqliteStore;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

/// Days covered by the default window, ending yesterday
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Inclusive trade-date window; an open end means "no upper bound"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Window for the requested bounds, as seen on `today`.
    ///
    /// Without a start date the window is the seven days ending yesterday.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self> {
        let window = match start {
            Some(start) => DateWindow { start, end },
            None => {
                let yesterday = today - Duration::days(1);
                DateWindow {
                    start: yesterday - Duration::days(DEFAULT_WINDOW_DAYS - 1),
                    end: Some(end.unwrap_or(yesterday)),
                }
            }
        };

        if let Some(end) = window.end {
            if end < window.start {
                return Err(AppError::Validation(format!(
                    "end_date {} is before start_date {}",
                    end, window.start
                )));
            }
        }
        Ok(window)
    }

    /// [`DateWindow::resolve`] against the current UTC date
    pub fn current(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        Self::resolve(start, end, Utc::now().date_naive())
    }
}

/// Read side consumed by the HTTP layer
#[async_trait]
pub trait AggregateService: Send + Sync {
    /// Extremes for `ticker` in `window`; `None` when no trade matches
    async fn aggregate(&self, ticker: &str, window: DateWindow) -> Result<Option<Aggregate>>;

    /// Whether the backing store can answer queries
    async fn ready(&self) -> Result<()>;
}

/// [`AggregateService`] over the SQLite store
pub struct TradeAggregateService {
    store: Arc<SqliteStore>,
}

impl TradeAggregateService {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AggregateService for TradeAggregateService {
    async fn aggregate(&self, ticker: &str, window: DateWindow) -> Result<Option<Aggregate>> {
        info!("AggregateService::aggregate - {} {:?}", ticker, window);

        let store = self.store.clone();
        let ticker = ticker.to_string();
        tokio::task::spawn_blocking(move || {
            store.aggregate_by_ticker(&ticker, Some(window.start), window.end)
        })
        .await
        .map_err(|e| AppError::Internal(format!("aggregate query aborted: {}", e)))?
    }

    async fn ready(&self) -> Result<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.ping())
            .await
            .map_err(|e| AppError::Internal(format!("ping aborted: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::models::Trade;
    use crate::ingest::TradeStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_window_ends_yesterday() {
        let window = DateWindow::resolve(None, None, date(2024, 6, 15)).unwrap();
        assert_eq!(
            window,
            DateWindow {
                start: date(2024, 6, 8),
                end: Some(date(2024, 6, 14)),
            }
        );
    }

    #[test]
    fn test_explicit_window() {
        let window = DateWindow::resolve(Some(date(2024, 6, 1)), None, date(2024, 6, 15)).unwrap();
        assert_eq!(window.start, date(2024, 6, 1));
        assert_eq!(window.end, None);

        let err = DateWindow::resolve(Some(date(2024, 6, 10)), Some(date(2024, 6, 9)), date(2024, 6, 15))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_aggregate_over_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("trades.db"), 2).unwrap());
        let day = date(2024, 6, 10);
        store
            .insert_trades_batch(&[
                Trade {
                    instrument_code: "PETR4".to_string(),
                    trade_price: 38.0,
                    trade_quantity: 100,
                    trade_date: Some(day),
                    ..Trade::default()
                },
                Trade {
                    instrument_code: "PETR4".to_string(),
                    trade_price: 39.0,
                    trade_quantity: 50,
                    trade_date: Some(day),
                    ..Trade::default()
                },
            ])
            .unwrap();

        let service = TradeAggregateService::new(store);
        service.ready().await.unwrap();

        let window = DateWindow { start: day, end: Some(day) };
        let agg = service.aggregate("PETR4", window).await.unwrap().unwrap();
        assert_eq!(agg.max_range_value, 39.0);
        assert_eq!(agg.max_daily_volume, 150);

        assert!(service.aggregate("VALE3", window).await.unwrap().is_none());
    }
}
