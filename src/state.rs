//! Application state management

use crate::api::ApiState;
use crate::config::AppConfig;
use crate::db::sqlite::SqliteStore;
use crate::error::Result;
use crate::ingest::TradeStore;
use crate::services::TradeAggregateService;
use std::sync::Arc;

/// Long-lived handles shared by the CLI commands
pub struct AppState {
    pub config: AppConfig,
    /// SQLite store used for both ingestion and queries
    pub store: Arc<SqliteStore>,
}

impl AppState {
    /// Open the configured database, applying migrations
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.database_path, config.db_pool_size)?;
        tracing::info!("Application state initialized");
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    /// Store handle for the ingestion pipeline
    pub fn trade_store(&self) -> Arc<dyn TradeStore> {
        self.store.clone()
    }

    /// State injected into the HTTP handlers
    pub fn api_state(&self) -> Arc<ApiState> {
        Arc::new(ApiState::new(Arc::new(TradeAggregateService::new(
            self.store.clone(),
        ))))
    }
}
