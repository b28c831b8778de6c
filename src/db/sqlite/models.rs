//! SQLite database models

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// One traded transaction from an end-of-day file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub reference_date: Option<NaiveDate>,
    pub instrument_code: String,
    pub update_action: String,
    pub trade_price: f64,
    pub trade_quantity: i64,
    pub closing_time: Option<NaiveTime>,
    pub trade_identifier_code: String,
    pub session_type: String,
    /// Authoritative business day of the trade
    pub trade_date: Option<NaiveDate>,
    pub buyer_participant_code: String,
    pub seller_participant_code: String,
}

/// Ledger row recording a successfully ingested business day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionLogEntry {
    pub file_date: NaiveDate,
    pub filename: String,
    pub row_count: i64,
    pub ingested_at: DateTime<Utc>,
}

/// Price/volume extremes for one ticker over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub ticker: String,
    /// Highest trade price in the range
    pub max_range_value: f64,
    /// Largest single-day summed quantity in the range
    pub max_daily_volume: i64,
}
