//! Configuration file support for staticroutemgrd
//!
//! Loads and validates staticroutemgrd configuration from TOML files.
//! Default location: /etc/sonic/staticroutemgrd.conf

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sonic_bgpcfgd_common::{BgpCfgError, BgpCfgResult, DbId, RedisConfig};
use tracing::warn;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sonic/staticroutemgrd.conf";

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Redis host
    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    /// Redis port
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    /// Redis database number for CONFIG_DB
    #[serde(default = "default_config_db_number")]
    pub config_db_number: i64,

    /// Redis database number for APPL_DB
    #[serde(default = "default_appl_db_number")]
    pub appl_db_number: i64,
}

/// FRR access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrrConfig {
    /// vtysh binary used to load command batches
    #[serde(default = "default_vtysh_path")]
    pub vtysh_path: String,

    /// Interval between batch commits in milliseconds
    #[serde(default = "default_commit_interval")]
    pub commit_interval_ms: u64,
}

/// Which tables are reconciled and how often they are read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Reconcile CONFIG_DB STATIC_ROUTE
    #[serde(default = "default_true")]
    pub watch_config_db: bool,

    /// Reconcile APPL_DB STATIC_ROUTE_TABLE
    #[serde(default = "default_true")]
    pub watch_appl_db: bool,

    /// Table poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// Complete staticroutemgrd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticRouteMgrdConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub frr: FrrConfig,

    #[serde(default)]
    pub manager: ManagerConfig,
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_config_db_number() -> i64 {
    DbId::ConfigDb.id()
}

fn default_appl_db_number() -> i64 {
    DbId::ApplDb.id()
}

fn default_vtysh_path() -> String {
    sonic_bgpcfgd_common::shell::VTYSH_CMD.to_string()
}

fn default_commit_interval() -> u64 {
    1000
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            config_db_number: default_config_db_number(),
            appl_db_number: default_appl_db_number(),
        }
    }
}

impl Default for FrrConfig {
    fn default() -> Self {
        Self {
            vtysh_path: default_vtysh_path(),
            commit_interval_ms: default_commit_interval(),
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            watch_config_db: true,
            watch_appl_db: true,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl StaticRouteMgrdConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> BgpCfgResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                BgpCfgError::invalid_config(
                    path.display().to_string(),
                    format!("failed to parse: {}", e),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(BgpCfgError::invalid_config(
                path.display().to_string(),
                format!("failed to read: {}", e),
            )),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> BgpCfgResult<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    pub fn commit_interval(&self) -> Duration {
        Duration::from_millis(self.frr.commit_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.manager.poll_interval_ms)
    }

    pub fn config_db(&self) -> RedisConfig {
        RedisConfig::new(
            self.database.redis_host.clone(),
            self.database.redis_port,
            self.database.config_db_number,
        )
    }

    pub fn appl_db(&self) -> RedisConfig {
        RedisConfig::new(
            self.database.redis_host.clone(),
            self.database.redis_port,
            self.database.appl_db_number,
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> BgpCfgResult<()> {
        if self.database.redis_port == 0 {
            return Err(BgpCfgError::invalid_config("redis_port", "must be > 0"));
        }
        if self.database.redis_host.trim().is_empty() {
            return Err(BgpCfgError::invalid_config("redis_host", "must not be empty"));
        }
        if self.frr.vtysh_path.trim().is_empty() {
            return Err(BgpCfgError::invalid_config("vtysh_path", "must not be empty"));
        }
        if self.frr.commit_interval_ms == 0 {
            return Err(BgpCfgError::invalid_config(
                "commit_interval_ms",
                "must be > 0",
            ));
        }
        if self.manager.poll_interval_ms == 0 {
            return Err(BgpCfgError::invalid_config("poll_interval_ms", "must be > 0"));
        }
        if !self.manager.watch_config_db && !self.manager.watch_appl_db {
            return Err(BgpCfgError::invalid_config(
                "manager",
                "at least one of watch_config_db/watch_appl_db must be set",
            ));
        }
        Ok(())
    }
}
