//! Event dispatch between the watched tables and the managers

use sonic_bgpcfgd_common::{DbId, KeyOpFieldsValues, Manager, SharedConfigMgr};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::device_metadata_mgr::DeviceMetadataMgr;
use crate::static_route_mgr::StaticRouteMgr;

/// Owns every manager and routes table events to them
pub struct StaticRouteDaemon {
    device_metadata: DeviceMetadataMgr,
    asn_rx: watch::Receiver<Option<String>>,
    static_mgrs: Vec<StaticRouteMgr>,
    cfg_mgr: SharedConfigMgr,
}

impl StaticRouteDaemon {
    pub fn new(
        device_metadata: DeviceMetadataMgr,
        static_mgrs: Vec<StaticRouteMgr>,
        cfg_mgr: SharedConfigMgr,
    ) -> Self {
        let asn_rx = device_metadata.subscribe();
        Self {
            device_metadata,
            asn_rx,
            static_mgrs,
            cfg_mgr,
        }
    }

    pub fn static_mgrs(&self) -> &[StaticRouteMgr] {
        &self.static_mgrs
    }

    /// Hands `events` of `db`/`table` to the owning manager.
    ///
    /// A failed event is logged and the rest of the batch still runs.
    pub async fn dispatch(&mut self, db: DbId, table: &str, events: &[KeyOpFieldsValues]) {
        if events.is_empty() {
            return;
        }

        if db == self.device_metadata.db() && table == self.device_metadata.table_name() {
            for event in events {
                if let Err(e) = self.device_metadata.handle(event).await {
                    error!("DeviceMetadataMgr: failed to handle {}: {}", event.key, e);
                }
            }
            self.notify_asn_change().await;
            return;
        }

        let Some(mgr) = self
            .static_mgrs
            .iter_mut()
            .find(|mgr| mgr.db() == db && mgr.table_name() == table)
        else {
            warn!("No manager for {} {}, dropping {} events", db, table, events.len());
            return;
        };

        for event in events {
            if let Err(e) = mgr.handle(event).await {
                error!("{}: failed to handle {}: {}", mgr.name(), event.key, e);
            }
        }
    }

    async fn notify_asn_change(&mut self) {
        if !self.asn_rx.has_changed().unwrap_or(false) {
            return;
        }
        let asn = self.asn_rx.borrow_and_update().clone();
        debug!("BGP ASN changed to {:?}", asn);
        for mgr in &mut self.static_mgrs {
            mgr.on_bgp_asn_change().await;
        }
    }

    /// Flushes queued lines to FRR (the regular batching cadence).
    pub async fn commit(&self) {
        let mut cfg_mgr = self.cfg_mgr.lock().await;
        if cfg_mgr.pending().is_empty() {
            return;
        }
        match cfg_mgr.commit().await {
            Ok(true) => debug!("Committed configuration batch"),
            Ok(false) => error!("FRR rejected configuration batch"),
            Err(e) => error!("Failed to commit configuration batch: {}", e),
        }
    }

    /// Flushes what is queued, then removes every installed route.
    pub async fn shutdown(&mut self) {
        info!("Shutting down, removing installed static routes");
        self.commit().await;
        for mgr in &mut self.static_mgrs {
            mgr.cleanup_on_exit().await;
        }
    }
}
