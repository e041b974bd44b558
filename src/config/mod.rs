use crate::trending::HistoryFallback;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// CSV import configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// CSV files whose name starts with this hold investor rows.
    #[serde(default = "default_investors_prefix")]
    pub investors_prefix: String,
}

/// Scoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub history_fallback: HistoryFallback,

    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_db_path() -> PathBuf {
    PathBuf::from("data/trending.duckdb")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_investors_prefix() -> String {
    "investors".to_string()
}
fn default_true() -> bool {
    true
}
fn default_limit() -> usize {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            run_migrations: true,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            investors_prefix: default_investors_prefix(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            history_fallback: HistoryFallback::default(),
            default_limit: default_limit(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    /// (`TRENDING__SCORING__HISTORY_FALLBACK=none`, ...).
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("TRENDING").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.storage.db_path, PathBuf::from("data/trending.duckdb"));
        assert_eq!(cfg.loader.investors_prefix, "investors");
        assert_eq!(cfg.scoring.history_fallback, HistoryFallback::Simulate);
        assert_eq!(cfg.scoring.default_limit, 10);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[scoring]\nhistory_fallback = \"none\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.scoring.history_fallback, HistoryFallback::None);
        assert_eq!(cfg.scoring.default_limit, 10);
        assert!(cfg.storage.run_migrations);
    }
}
