//! Guard against APPL_DB deletions that CONFIG_DB still disagrees with
//!
//! When BFD is enabled on a route, the BFD-aware agent writes it into
//! APPL_DB and the APPL_DB manager installs it. If BFD is later turned
//! off, the APPL_DB row goes away while CONFIG_DB still holds the route,
//! and the CONFIG_DB manager takes over. The APPL_DB manager must not
//! uninstall it in between.

use std::sync::Arc;

use sonic_bgpcfgd_common::{BgpCfgResult, ConfigDbConnector, ConfigDbReader, DbId};
use tracing::debug;

use crate::nexthop::bfd_covers_row;
use crate::tables::{fields, CFG_STATIC_ROUTE_TABLE_NAME};
use crate::types::RouteKey;

/// What to do with a delete event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDecision {
    /// Uninstall the route as usual
    Proceed,
    /// Ignore the delete; the BFD-aware agent owns the route
    Skip,
    /// Ignore the delete but forget the cached state
    SkipAndPurge,
}

/// CONFIG_DB lookup used by the APPL_DB manager before honoring deletes
pub struct RaceGuard {
    connector: Option<Arc<dyn ConfigDbConnector>>,
    reader: Option<Box<dyn ConfigDbReader>>,
}

impl RaceGuard {
    /// Guard for a manager reading CONFIG_DB itself: never skips
    pub fn disabled() -> Self {
        Self {
            connector: None,
            reader: None,
        }
    }

    /// Guard for a manager on `db`; only APPL_DB managers consult CONFIG_DB
    pub fn new(db: DbId, connector: Arc<dyn ConfigDbConnector>) -> Self {
        match db {
            DbId::ConfigDb => Self::disabled(),
            _ => Self {
                connector: Some(connector),
                reader: None,
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.connector.is_some()
    }

    /// CONFIG_DB keys that may hold `key`, in probe order.
    ///
    /// Default-VRF routes may be stored under the bare prefix; the
    /// VRF-qualified form is always tried first.
    pub fn config_db_keys(key: &RouteKey) -> Vec<String> {
        let mut keys = vec![format!(
            "{}|{}|{}",
            CFG_STATIC_ROUTE_TABLE_NAME,
            key.vrf(),
            key.prefix()
        )];
        if key.is_default_vrf() {
            keys.push(format!("{}|{}", CFG_STATIC_ROUTE_TABLE_NAME, key.prefix()));
        }
        keys
    }

    async fn reader(&mut self) -> BgpCfgResult<Option<&mut Box<dyn ConfigDbReader>>> {
        let Some(connector) = &self.connector else {
            return Ok(None);
        };
        if self.reader.is_none() {
            debug!("Opening CONFIG_DB connection for APPL_DB delete checks");
            self.reader = Some(connector.connect().await?);
        }
        Ok(self.reader.as_mut())
    }

    /// Decides whether a delete of `key` should be honored.
    pub async fn check_delete(&mut self, key: &RouteKey) -> BgpCfgResult<DeleteDecision> {
        let Some(reader) = self.reader().await? else {
            return Ok(DeleteDecision::Proceed);
        };

        for cfg_key in Self::config_db_keys(key) {
            let bfd = reader.hget(&cfg_key, fields::BFD).await?;
            let nexthop = reader.hget(&cfg_key, fields::NEXTHOP).await?;
            if bfd.is_none() && nexthop.is_none() {
                continue;
            }

            if bfd.as_deref().is_some_and(bfd_covers_row) {
                debug!("{}: {} has bfd enabled, skipping delete", key, cfg_key);
                return Ok(DeleteDecision::Skip);
            }
            if nexthop.is_some_and(|nh| !nh.is_empty()) {
                debug!("{}: {} still declares next-hops, skipping delete", key, cfg_key);
                return Ok(DeleteDecision::SkipAndPurge);
            }
            break;
        }

        Ok(DeleteDecision::Proceed)
    }
}
