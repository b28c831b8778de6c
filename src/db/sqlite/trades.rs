//! Trade rows: batch insert, per-day deletion and aggregates

use super::models::{Aggregate, Trade};
use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, TransactionBehavior};

/// Insert `trades` in one transaction; either every row lands or none does
pub fn insert_trades(conn: &mut Connection, trades: &[Trade]) -> Result<()> {
    if trades.is_empty() {
        return Ok(());
    }

    // IMMEDIATE takes the write lock up front so concurrent writers queue on
    // the busy timeout instead of failing at commit
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut stmt = tx.prepare(
        "INSERT INTO trades (
            reference_date, instrument_code, update_action, trade_price, trade_quantity,
            closing_time, trade_identifier_code, session_type, trade_date,
            buyer_participant_code, seller_participant_code
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;

    for trade in trades {
        stmt.execute(params![
            trade.reference_date,
            trade.instrument_code,
            trade.update_action,
            trade.trade_price,
            trade.trade_quantity,
            trade.closing_time,
            trade.trade_identifier_code,
            trade.session_type,
            trade.trade_date,
            trade.buyer_participant_code,
            trade.seller_participant_code,
        ])?;
    }

    drop(stmt);
    tx.commit()?;

    tracing::debug!("Inserted {} trades", trades.len());
    Ok(())
}

/// Delete every trade dated `day`, returning the number removed
pub fn delete_trades_by_date(conn: &Connection, day: NaiveDate) -> Result<usize> {
    let removed = conn.execute("DELETE FROM trades WHERE trade_date = ?1", params![day])?;
    tracing::info!("Deleted {} trades for {}", removed, day);
    Ok(removed)
}

pub fn count_trades_for_date(conn: &Connection, day: NaiveDate) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM trades WHERE trade_date = ?1",
        params![day],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Highest price and largest per-day volume for `ticker` between `start` and
/// `end` inclusive. Either bound may be open. `None` when nothing matches.
pub fn aggregate_by_ticker(
    conn: &Connection,
    ticker: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Option<Aggregate>> {
    let (max_price, max_volume): (Option<f64>, Option<i64>) = conn.query_row(
        "WITH filtered AS (
            SELECT trade_date, trade_price, trade_quantity
            FROM trades
            WHERE instrument_code = ?1
              AND (?2 IS NULL OR trade_date >= ?2)
              AND (?3 IS NULL OR trade_date <= ?3)
         ),
         daily AS (
            SELECT trade_date, SUM(trade_quantity) AS daily_volume
            FROM filtered
            GROUP BY trade_date
         )
         SELECT (SELECT MAX(trade_price) FROM filtered),
                (SELECT MAX(daily_volume) FROM daily)",
        params![ticker, start, end],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    match (max_price, max_volume) {
        (None, None) => Ok(None),
        (price, volume) => Ok(Some(Aggregate {
            ticker: ticker.to_string(),
            max_range_value: price.unwrap_or(0.0),
            max_daily_volume: volume.unwrap_or(0),
        })),
    }
}
