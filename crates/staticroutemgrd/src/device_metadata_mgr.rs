//! Device Metadata Manager - publishes the BGP ASN
//!
//! Watches CONFIG_DB `DEVICE_METADATA|localhost` and keeps the
//! `localhost/bgp_asn` fact in the shared [`Directory`]. Changes are also
//! broadcast on a watch channel so the daemon can wake the static route
//! managers waiting on the ASN.

use std::sync::Arc;

use async_trait::async_trait;
use sonic_bgpcfgd_common::{
    BgpCfgResult, DbId, Directory, FieldValues, FieldValuesExt, Manager,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::tables::{
    fields, BGP_ASN_PATH, CFG_DEVICE_METADATA_TABLE_NAME, DEVICE_METADATA_LOCALHOST,
};

/// Device Metadata Manager
pub struct DeviceMetadataMgr {
    directory: Arc<Directory>,
    asn_tx: watch::Sender<Option<String>>,
}

impl DeviceMetadataMgr {
    pub fn new(directory: Arc<Directory>) -> Self {
        let current = directory.get(DbId::ConfigDb, CFG_DEVICE_METADATA_TABLE_NAME, BGP_ASN_PATH);
        let (asn_tx, _) = watch::channel(current);
        Self { directory, asn_tx }
    }

    /// Receiver notified whenever the published ASN changes
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.asn_tx.subscribe()
    }

    pub fn bgp_asn(&self) -> Option<String> {
        self.asn_tx.borrow().clone()
    }

    fn publish(&self, asn: Option<String>) {
        match &asn {
            Some(asn) => {
                self.directory.put(
                    DbId::ConfigDb,
                    CFG_DEVICE_METADATA_TABLE_NAME,
                    BGP_ASN_PATH,
                    asn.as_str(),
                );
            }
            None => {
                self.directory
                    .remove(DbId::ConfigDb, CFG_DEVICE_METADATA_TABLE_NAME, BGP_ASN_PATH);
            }
        }

        let changed = self.asn_tx.send_if_modified(|current| {
            if *current == asn {
                false
            } else {
                *current = asn.clone();
                true
            }
        });
        if changed {
            info!("BGP ASN is now {:?}", asn);
        }
    }
}

#[async_trait]
impl Manager for DeviceMetadataMgr {
    fn name(&self) -> &str {
        "DeviceMetadataMgr"
    }

    fn db(&self) -> DbId {
        DbId::ConfigDb
    }

    fn table_name(&self) -> &str {
        CFG_DEVICE_METADATA_TABLE_NAME
    }

    #[instrument(skip(self, fvs))]
    async fn set_handler(&mut self, key: &str, fvs: &FieldValues) -> BgpCfgResult<()> {
        if key != DEVICE_METADATA_LOCALHOST {
            debug!("Ignoring DEVICE_METADATA key {}", key);
            return Ok(());
        }

        let asn = fvs
            .get_field(fields::BGP_ASN)
            .map(str::trim)
            .filter(|asn| !asn.is_empty())
            .map(str::to_string);
        self.publish(asn);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn del_handler(&mut self, key: &str) -> BgpCfgResult<()> {
        if key == DEVICE_METADATA_LOCALHOST {
            self.publish(None);
        }
        Ok(())
    }
}
