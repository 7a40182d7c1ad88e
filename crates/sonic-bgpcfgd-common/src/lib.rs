//! Common infrastructure for SONiC bgpcfgd managers.
//!
//! bgpcfgd watches CONFIG_DB/APPL_DB tables and turns them into FRR
//! configuration text. This crate holds the pieces shared by every
//! manager:
//!
//! - [`Manager`]: per-table handler trait (set/del dispatch)
//! - [`Directory`]: facts learned by one manager and read by others
//!   (for example the BGP ASN from `DEVICE_METADATA`)
//! - [`cfg_mgr`]: the command channel that batches and commits lines to vtysh
//! - [`config_db`]: point reads against CONFIG_DB
//! - [`table_watcher`]: table snapshots turned into set/del events
//! - [`shell`]: shell command execution with proper quoting
//! - [`error`]: error types
//!
//! # Example
//!
//! ```ignore
//! use sonic_bgpcfgd_common::{cfg_mgr::ConfigMgr, Manager};
//!
//! async fn apply(mgr: &mut impl Manager, key: &str, fvs: &FieldValues) {
//!     if let Err(e) = mgr.set_handler(key, fvs).await {
//!         tracing::error!("{}: failed to handle {}: {}", mgr.name(), key, e);
//!     }
//! }
//! ```

pub mod cfg_mgr;
pub mod config_db;
pub mod directory;
pub mod error;
pub mod manager;
pub mod shell;
pub mod table_watcher;

// Re-export commonly used items at crate root
pub use cfg_mgr::{ConfigMgr, SharedConfigMgr, VtyshConfigMgr};
pub use config_db::{ConfigDbConnector, ConfigDbReader, RedisConfig, RedisConfigDbConnector};
pub use directory::Directory;
pub use error::{BgpCfgError, BgpCfgResult};
pub use manager::{
    DbId, FieldValue, FieldValues, FieldValuesExt, KeyOpFieldsValues, Manager, Operation,
};
pub use table_watcher::TableWatcher;
