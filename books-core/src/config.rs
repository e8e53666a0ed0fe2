//! Configuration for the bookkeeping core

use crate::types::CompanyInfo;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Contents of a brand-new snapshot
    #[serde(default)]
    pub seed: SeedConfig,

    /// Report thresholds
    #[serde(default)]
    pub reporting: ReportingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `file`, `memory` or `rocksdb`
    pub backend: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// Snapshot file name (file backend)
    pub state_file: String,

    /// Snapshot key (rocksdb backend)
    pub state_key: String,

    /// Directory for exported backups
    pub backup_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            data_dir: PathBuf::from("./data/books"),
            state_file: "books.json".to_string(),
            state_key: "books_db_stable_v1".to_string(),
            backup_dir: PathBuf::from("./backups"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `pretty` or `json`
    pub format: String,

    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
            level: "info".to_string(),
        }
    }
}

/// Seed data for an empty store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Admin login name
    pub admin_username: String,

    /// Admin password, hashed before it is stored
    pub admin_password: String,

    /// Party categories
    pub categories: Vec<String>,

    /// Company letterhead
    pub company: CompanyInfo,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: "123".to_string(),
            categories: vec![
                "عملاء جملة".to_string(),
                "عملاء قطاعي".to_string(),
                "موردين".to_string(),
            ],
            company: CompanyInfo {
                name: "مؤسسة أركان التجارية".to_string(),
                phone: "01000000000".to_string(),
                whatsapp: "01000000000".to_string(),
                address: "القاهرة، مصر".to_string(),
                commercial_register: "123456".to_string(),
                tax_card: "987-654-321".to_string(),
                logo: None,
            },
        }
    }
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Products below this quantity count as low stock
    pub low_stock_threshold: i64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `BOOKS_*` environment variables
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Ok(data_dir) = std::env::var("BOOKS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(file) = std::env::var("BOOKS_STATE_FILE") {
            self.storage.state_file = file;
        }

        if let Ok(backend) = std::env::var("BOOKS_STORAGE_BACKEND") {
            self.storage.backend = backend;
        }

        if let Ok(format) = std::env::var("BOOKS_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(threshold) = std::env::var("BOOKS_LOW_STOCK") {
            self.reporting.low_stock_threshold = threshold.parse().map_err(|e| {
                crate::Error::Config(format!("BOOKS_LOW_STOCK must be an integer: {}", e))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.backend, "file");
        assert_eq!(config.storage.state_file, "books.json");
        assert_eq!(config.reporting.low_stock_threshold, 5);
        assert_eq!(config.seed.categories.len(), 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/books"

            [reporting]
            low_stock_threshold = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/books"));
        assert_eq!(config.storage.state_file, "books.json");
        assert_eq!(config.reporting.low_stock_threshold, 2);
        assert_eq!(config.logging.format, "pretty");
    }
}
