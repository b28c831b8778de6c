//! Services Layer
//!
//! Query logic shared by the REST API handlers and the CLI.
//!
//! # Services
//!
//! - `AggregateService` - Per-ticker price and volume extremes

pub mod aggregate_service;

pub use aggregate_service::{AggregateService, DateWindow, TradeAggregateService};
