//! Database layer

pub mod sqlite;
