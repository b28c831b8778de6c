//! EOD Ingest - End-of-day equity trade ingestion
//!
//! Loads the exchange's daily trade files for the most recent business days
//! into SQLite, concurrently and idempotently, and serves per-ticker
//! aggregates over HTTP.

pub mod api;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod services;
pub mod state;

pub use error::{AppError, Result};
