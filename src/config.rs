//! Runtime configuration
//!
//! Read from the process environment, after loading an optional `.env` file.
//! Every bad key is reported at once rather than stopping at the first.

use crate::error::{AppError, Result};
use crate::ingest::DEFAULT_BATCH_SIZE;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub db_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub rate_limit_per_minute: u32,
    pub ingest_batch_size: usize,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/trades.db"),
            db_pool_size: 8,
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            rate_limit_per_minute: 60,
            ingest_batch_size: DEFAULT_BATCH_SIZE,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("loaded environment from {:?}", path),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(AppError::Config(format!("failed to load .env: {}", e))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut errors = Vec::new();

        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        let database_path = match get("DATABASE_PATH") {
            Some(v) if v.is_empty() => {
                errors.push("DATABASE_PATH must not be empty".to_string());
                defaults.database_path.clone()
            }
            Some(v) => PathBuf::from(v),
            None => defaults.database_path.clone(),
        };

        let server_host = match get("SERVER_HOST") {
            Some(v) if v.is_empty() => {
                errors.push("SERVER_HOST must not be empty".to_string());
                defaults.server_host.clone()
            }
            Some(v) => v,
            None => defaults.server_host.clone(),
        };

        let config = Self {
            database_path,
            db_pool_size: positive(&get, "DB_POOL_SIZE", defaults.db_pool_size, &mut errors),
            server_host,
            server_port: positive(&get, "SERVER_PORT", defaults.server_port, &mut errors),
            rate_limit_per_minute: positive(
                &get,
                "RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
                &mut errors,
            ),
            ingest_batch_size: positive(
                &get,
                "INGEST_BATCH_SIZE",
                defaults.ingest_batch_size,
                &mut errors,
            ),
            log_format: match get("LOG_FORMAT") {
                Some(v) => v.parse().unwrap_or_else(|e: String| {
                    errors.push(format!("LOG_FORMAT: {}", e));
                    defaults.log_format
                }),
                None => defaults.log_format,
            },
        };

        if !errors.is_empty() {
            return Err(AppError::Config(errors.join("; ")));
        }
        Ok(config)
    }

    /// Listen address for host and port. The host may be an IP literal or a
    /// name; names resolve to their first address.
    pub async fn server_addr(&self) -> Result<SocketAddr> {
        let host = self.server_host.as_str();
        tokio::net::lookup_host((host, self.server_port))
            .await
            .map_err(|e| AppError::Config(format!("cannot resolve SERVER_HOST {:?}: {}", host, e)))?
            .next()
            .ok_or_else(|| AppError::Config(format!("SERVER_HOST {:?} has no addresses", host)))
    }
}

/// Parse a strictly positive number, recording a message on failure
fn positive<T, G>(get: &G, key: &str, default: T, errors: &mut Vec<String>) -> T
where
    T: FromStr + PartialEq + Default + Copy,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => match raw.parse::<T>() {
            Ok(v) if v != T::default() => v,
            Ok(_) => {
                errors.push(format!("{} must be greater than zero", key));
                default
            }
            Err(_) => {
                errors.push(format!("{} is not a valid number: {:?}", key, raw));
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[tokio::test]
    async fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./data/trades.db"));
        assert_eq!(config.db_pool_size, 8);
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.rate_limit_per_minute, 60);
        assert_eq!(config.ingest_batch_size, 5000);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.server_addr().await.unwrap().port(), 8080);
    }

    #[tokio::test]
    async fn test_overrides() {
        let config = from_pairs(&[
            ("DATABASE_PATH", "/tmp/x.db"),
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", " 9090 "),
            ("LOG_FORMAT", "JSON"),
            ("INGEST_BATCH_SIZE", "250"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.server_addr().await.unwrap().to_string(), "127.0.0.1:9090");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.ingest_batch_size, 250);
    }

    #[tokio::test]
    async fn test_host_names_resolve() {
        let config = from_pairs(&[("SERVER_HOST", "localhost"), ("SERVER_PORT", "9090")]).unwrap();
        let addr = config.server_addr().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9090);

        let config = from_pairs(&[("SERVER_HOST", "::1")]).unwrap();
        assert_eq!(config.server_addr().await.unwrap().to_string(), "[::1]:8080");
    }

    #[test]
    fn test_all_errors_reported_together() {
        let err = from_pairs(&[
            ("DB_POOL_SIZE", "zero"),
            ("SERVER_PORT", "0"),
            ("LOG_FORMAT", "xml"),
            ("DATABASE_PATH", ""),
        ])
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("DB_POOL_SIZE"));
        assert!(msg.contains("SERVER_PORT"));
        assert!(msg.contains("LOG_FORMAT"));
        assert!(msg.contains("DATABASE_PATH"));
    }
}
