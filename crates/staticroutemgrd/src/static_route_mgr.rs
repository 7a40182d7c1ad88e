//! Static Route Manager - reconciles STATIC_ROUTE rows into FRR
//!
//! One instance runs per source database. Each keeps its own view of
//! what it installed and emits the minimal set of `ip route` lines that
//! moves FRR from that view to the desired one.

use std::sync::Arc;

use async_trait::async_trait;
use sonic_bgpcfgd_common::{
    BgpCfgResult, ConfigDbConnector, DbId, Directory, FieldValues, FieldValuesExt, Manager,
    SharedConfigMgr,
};
use tracing::{debug, error, info, instrument, warn};

use crate::commands::static_route_commands;
use crate::nexthop::{Liveness, NextHopLists, NextHopSet};
use crate::race_guard::{DeleteDecision, RaceGuard};
use crate::redistribution::RedistributionController;
use crate::route_cache::{RouteCache, RouteState};
use crate::tables::{
    fields, APP_STATIC_ROUTE_TABLE_NAME, BGP_ASN_PATH, CFG_DEVICE_METADATA_TABLE_NAME,
    CFG_STATIC_ROUTE_TABLE_NAME,
};
use crate::types::{RouteKey, RouteTag};

/// Static Route Manager
pub struct StaticRouteMgr {
    name: String,
    db: DbId,
    table: String,

    /// Routes this instance installed
    cache: RouteCache,

    /// Per-VRF redistribution state
    redistribution: RedistributionController,

    race_guard: RaceGuard,
    directory: Arc<Directory>,
    cfg_mgr: SharedConfigMgr,
}

impl StaticRouteMgr {
    pub fn new(
        db: DbId,
        table: impl Into<String>,
        directory: Arc<Directory>,
        cfg_mgr: SharedConfigMgr,
        race_guard: RaceGuard,
    ) -> Self {
        let table = table.into();
        let name = format!("StaticRouteMgr({})", db);
        info!(
            "{} initialized for table {} (race guard {})",
            name,
            table,
            if race_guard.is_enabled() { "on" } else { "off" }
        );

        Self {
            name,
            db,
            table,
            cache: RouteCache::new(),
            redistribution: RedistributionController::new(),
            race_guard,
            directory,
            cfg_mgr,
        }
    }

    /// Manager for CONFIG_DB `STATIC_ROUTE`
    pub fn for_config_db(directory: Arc<Directory>, cfg_mgr: SharedConfigMgr) -> Self {
        Self::new(
            DbId::ConfigDb,
            CFG_STATIC_ROUTE_TABLE_NAME,
            directory,
            cfg_mgr,
            RaceGuard::disabled(),
        )
    }

    /// Manager for APPL_DB `STATIC_ROUTE_TABLE`, guarding deletes with
    /// CONFIG_DB lookups through `connector`
    pub fn for_appl_db(
        directory: Arc<Directory>,
        cfg_mgr: SharedConfigMgr,
        connector: Arc<dyn ConfigDbConnector>,
    ) -> Self {
        Self::new(
            DbId::ApplDb,
            APP_STATIC_ROUTE_TABLE_NAME,
            directory,
            cfg_mgr,
            RaceGuard::new(DbId::ApplDb, connector),
        )
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn redistribution(&self) -> &RedistributionController {
        &self.redistribution
    }

    fn bgp_asn(&self) -> Option<String> {
        self.directory
            .get(DbId::ConfigDb, CFG_DEVICE_METADATA_TABLE_NAME, BGP_ASN_PATH)
    }

    fn forget_if_vrf_empty(&mut self, vrf: &str) {
        if self.cache.vrf_route_count(vrf) == 0 {
            self.redistribution.on_routes_forgotten(vrf);
        }
    }

    fn parse_key(&self, key: &str) -> BgpCfgResult<RouteKey> {
        RouteKey::split(key).inspect_err(|e| error!("{}: ignoring row: {}", self.name, e))
    }

    async fn push(&self, cmds: Vec<String>) {
        if cmds.is_empty() {
            return;
        }
        debug!("{}: queueing {} lines: {:?}", self.name, cmds.len(), cmds);
        self.cfg_mgr.lock().await.push_list(cmds);
    }

    /// Enables redistribution for VRFs that were waiting on the BGP ASN.
    #[instrument(skip(self))]
    pub async fn on_bgp_asn_change(&mut self) {
        let Some(asn) = self.bgp_asn() else {
            debug!("BGP ASN not set, nothing to enable");
            return;
        };
        let cmds = self.redistribution.on_asn_known(&asn);
        self.push(cmds).await;
    }

    /// Uninstalls everything this instance installed and commits at once.
    ///
    /// Each VRF's route lines are followed by its redistribution disable
    /// sequence. Returns whether the commit succeeded.
    #[instrument(skip(self))]
    pub async fn cleanup_on_exit(&mut self) -> bool {
        let mut cmds = Vec::new();
        let mut routes_removed = 0;

        for (vrf, routes) in self.cache.drain() {
            for (route, state) in routes {
                cmds.extend(static_route_commands(
                    &route,
                    &NextHopSet::new(),
                    state.tag,
                    &state.next_hops,
                    state.tag,
                ));
                routes_removed += 1;
            }
            cmds.extend(self.redistribution.on_last_route_removed(&vrf));
        }
        // VRFs whose routes were all taken over but are still enabled
        cmds.extend(self.redistribution.reset());

        info!(
            "{}: removing {} static routes ({} lines) on exit",
            self.name,
            routes_removed,
            cmds.len()
        );

        let mut cfg_mgr = self.cfg_mgr.lock().await;
        cfg_mgr.push_list(cmds);
        match cfg_mgr.commit().await {
            Ok(true) => {
                info!("{}: cleanup committed", self.name);
                true
            }
            Ok(false) => {
                error!("{}: FRR rejected the cleanup batch", self.name);
                false
            }
            Err(e) => {
                error!("{}: failed to commit cleanup batch: {}", self.name, e);
                false
            }
        }
    }
}

#[async_trait]
impl Manager for StaticRouteMgr {
    fn name(&self) -> &str {
        &self.name
    }

    fn db(&self) -> DbId {
        self.db
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    #[instrument(skip(self, fvs))]
    async fn set_handler(&mut self, key: &str, fvs: &FieldValues) -> BgpCfgResult<()> {
        let route = self.parse_key(key)?;
        let lists = NextHopLists::from_fvs(fvs);

        let liveness = lists
            .count(&route)
            .and_then(|count| lists.liveness(&route, count))
            .inspect_err(|e| error!("{}: rejecting row: {}", self.name, e))?;

        if liveness == Liveness::Row {
            if self.cache.remove(&route).is_some() {
                info!(
                    vrf = %route.vrf(),
                    prefix = %route.prefix(),
                    "Route is now BFD-managed, forgetting it"
                );
                self.forget_if_vrf_empty(route.vrf());
            }
            return Ok(());
        }

        let next_hops = NextHopSet::from_lists(&route, &lists)?;
        let tag = RouteTag::from_advertise(fvs.get_field(fields::ADVERTISE));
        if next_hops.is_empty() {
            warn!("{}: {} has no usable next-hop", self.name, route);
        }

        let mut cmds = Vec::new();
        if self.cache.vrf_route_count(route.vrf()) == 0 {
            let asn = self.bgp_asn();
            cmds.extend(
                self.redistribution
                    .on_first_route(route.vrf(), asn.as_deref()),
            );
        }

        let (cur_hops, cur_tag) = match self.cache.get(&route) {
            Some(state) => (state.next_hops.clone(), state.tag),
            None => (NextHopSet::new(), tag),
        };
        cmds.extend(static_route_commands(
            &route, &next_hops, tag, &cur_hops, cur_tag,
        ));

        self.push(cmds).await;
        self.cache.insert(route, RouteState::new(next_hops, tag));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn del_handler(&mut self, key: &str) -> BgpCfgResult<()> {
        let route = self.parse_key(key)?;

        match self.race_guard.check_delete(&route).await? {
            DeleteDecision::Proceed => {}
            DeleteDecision::Skip => {
                info!("{}: {} is BFD-managed in CONFIG_DB, ignoring delete", self.name, route);
                return Ok(());
            }
            DeleteDecision::SkipAndPurge => {
                info!(
                    "{}: {} still configured in CONFIG_DB, keeping it installed",
                    self.name, route
                );
                if self.cache.remove(&route).is_some() {
                    self.forget_if_vrf_empty(route.vrf());
                }
                return Ok(());
            }
        }

        let Some(state) = self.cache.get(&route) else {
            debug!("{}: {} not installed, nothing to remove", self.name, route);
            return Ok(());
        };

        let mut cmds = static_route_commands(
            &route,
            &NextHopSet::new(),
            state.tag,
            &state.next_hops,
            state.tag,
        );
        if self.cache.is_last_in_vrf(&route) {
            cmds.extend(self.redistribution.on_last_route_removed(route.vrf()));
        }

        self.push(cmds).await;
        self.cache.remove(&route);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redistribution::RedistributionState;
    use pretty_assertions::assert_eq;
    use sonic_bgpcfgd_common::{field_values, ConfigMgr};
    use sonic_bgpcfgd_test::{MemoryConfigDbConnector, RecordingConfigMgr};
    use tokio::sync::Mutex;

    struct Harness {
        mgr: StaticRouteMgr,
        recorder: Arc<Mutex<RecordingConfigMgr>>,
        directory: Arc<Directory>,
    }

    impl Harness {
        fn config_db(asn: Option<&str>) -> Self {
            let directory = Arc::new(Directory::new());
            if let Some(asn) = asn {
                directory.put(
                    DbId::ConfigDb,
                    CFG_DEVICE_METADATA_TABLE_NAME,
                    BGP_ASN_PATH,
                    asn,
                );
            }
            let recorder = Arc::new(Mutex::new(RecordingConfigMgr::new()));
            let mgr = StaticRouteMgr::for_config_db(directory.clone(), recorder.clone());
            Self {
                mgr,
                recorder,
                directory,
            }
        }

        async fn take_lines(&self) -> Vec<String> {
            self.recorder.lock().await.take_pending()
        }
    }

    #[tokio::test]
    async fn test_first_route_enables_redistribution_before_install() {
        let mut h = Harness::config_db(Some("65100"));
        h.mgr
            .set_handler("default|10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();

        let lines = h.take_lines().await;
        assert_eq!(lines[0], "route-map STATIC_ROUTE_FILTER permit 10");
        assert_eq!(lines.last().unwrap(), "ip route 10.0.0.0/24 10.0.0.1 tag 1");
        assert_eq!(lines.len(), 11);

        // Second route in the same VRF: no second enable
        h.mgr
            .set_handler("default|10.1.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        assert_eq!(h.take_lines().await, vec!["ip route 10.1.0.0/24 10.0.0.1 tag 1"]);
    }

    #[tokio::test]
    async fn test_next_hop_change_is_minimal() {
        let mut h = Harness::config_db(Some("65100"));
        h.mgr
            .set_handler("10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        h.take_lines().await;

        h.mgr
            .set_handler("10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.2" })
            .await
            .unwrap();
        assert_eq!(
            h.take_lines().await,
            vec![
                "no ip route 10.0.0.0/24 10.0.0.1 tag 1",
                "ip route 10.0.0.0/24 10.0.0.2 tag 1",
            ]
        );

        // Same row again: nothing
        h.mgr
            .set_handler("10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.2" })
            .await
            .unwrap();
        assert!(h.take_lines().await.is_empty());
    }

    #[tokio::test]
    async fn test_advertise_flip_replaces_route() {
        let mut h = Harness::config_db(Some("65100"));
        h.mgr
            .set_handler("10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        h.take_lines().await;

        h.mgr
            .set_handler(
                "10.0.0.0/24",
                &field_values! { "nexthop" => "10.0.0.1", "advertise" => "false" },
            )
            .await
            .unwrap();
        assert_eq!(
            h.take_lines().await,
            vec![
                "no ip route 10.0.0.0/24 10.0.0.1 tag 1",
                "ip route 10.0.0.0/24 10.0.0.1 tag 2",
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_last_route_disables_redistribution() {
        let mut h = Harness::config_db(Some("65100"));
        h.mgr
            .set_handler("Vrf1|10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        h.take_lines().await;

        h.mgr.del_handler("Vrf1|10.0.0.0/24").await.unwrap();
        let lines = h.take_lines().await;
        assert_eq!(lines[0], "no ip route 10.0.0.0/24 10.0.0.1 vrf Vrf1 tag 1");
        assert_eq!(lines[1], "router bgp 65100 vrf Vrf1");
        assert_eq!(lines.last().unwrap(), "no route-map STATIC_ROUTE_FILTER");
        assert!(h.mgr.cache().is_empty());
        assert_eq!(h.mgr.redistribution().state("Vrf1"), None);
    }

    #[tokio::test]
    async fn test_delete_unknown_route_is_noop() {
        let mut h = Harness::config_db(Some("65100"));
        h.mgr.del_handler("10.0.0.0/24").await.unwrap();
        assert!(h.take_lines().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_row_rejected() {
        let mut h = Harness::config_db(Some("65100"));
        let result = h
            .mgr
            .set_handler(
                "10.0.0.0/24",
                &field_values! { "nexthop" => "10.0.0.1,10.0.0.2", "ifname" => "Ethernet0" },
            )
            .await;
        assert!(result.is_err());
        assert!(h.take_lines().await.is_empty());
        assert!(h.mgr.cache().is_empty());

        assert!(h
            .mgr
            .set_handler("not-a-prefix", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_pending_asn() {
        let mut h = Harness::config_db(None);
        h.mgr
            .set_handler("Vrf1|10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        assert_eq!(
            h.take_lines().await,
            vec!["ip route 10.0.0.0/24 10.0.0.1 vrf Vrf1 tag 1"]
        );
        assert_eq!(
            h.mgr.redistribution().state("Vrf1"),
            Some(&RedistributionState::Pending)
        );

        h.directory.put(
            DbId::ConfigDb,
            CFG_DEVICE_METADATA_TABLE_NAME,
            BGP_ASN_PATH,
            "65200",
        );
        h.mgr.on_bgp_asn_change().await;
        let lines = h.take_lines().await;
        assert!(lines.contains(&"router bgp 65200 vrf Vrf1".to_string()));

        h.mgr.on_bgp_asn_change().await;
        assert!(h.take_lines().await.is_empty());
    }

    #[tokio::test]
    async fn test_bfd_row_takeover() {
        let mut h = Harness::config_db(Some("65100"));
        h.mgr
            .set_handler("10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        h.take_lines().await;

        h.mgr
            .set_handler(
                "10.0.0.0/24",
                &field_values! { "nexthop" => "10.0.0.1", "bfd" => "true" },
            )
            .await
            .unwrap();
        assert!(h.take_lines().await.is_empty());
        assert!(h.mgr.cache().is_empty());
    }

    #[tokio::test]
    async fn test_bfd_takeover_of_last_route_drops_pending_vrf() {
        let mut h = Harness::config_db(None);
        h.mgr
            .set_handler("Vrf1|10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        h.mgr
            .set_handler(
                "Vrf1|10.0.0.0/24",
                &field_values! { "nexthop" => "10.0.0.1", "bfd" => "true" },
            )
            .await
            .unwrap();
        h.take_lines().await;
        assert_eq!(h.mgr.redistribution().state("Vrf1"), None);

        h.directory.put(
            DbId::ConfigDb,
            CFG_DEVICE_METADATA_TABLE_NAME,
            BGP_ASN_PATH,
            "65100",
        );
        h.mgr.on_bgp_asn_change().await;
        assert!(h.take_lines().await.is_empty());
    }

    #[tokio::test]
    async fn test_per_element_bfd() {
        let mut h = Harness::config_db(Some("65100"));
        h.mgr
            .set_handler(
                "10.0.0.0/24",
                &field_values! {
                    "nexthop" => "10.0.0.1,10.0.0.2",
                    "bfd" => "true,false",
                },
            )
            .await
            .unwrap();
        let lines = h.take_lines().await;
        assert_eq!(lines.last().unwrap(), "ip route 10.0.0.0/24 10.0.0.2 tag 1");
        assert!(!lines.iter().any(|l| l.contains("10.0.0.1")));
    }

    #[tokio::test]
    async fn test_cleanup_on_exit() {
        let mut h = Harness::config_db(Some("65100"));
        h.mgr
            .set_handler("Vrf1|10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        h.mgr
            .set_handler("10.0.0.0/24", &field_values! { "blackhole" => "true" })
            .await
            .unwrap();
        h.recorder.lock().await.commit().await.unwrap();

        assert!(h.mgr.cleanup_on_exit().await);
        let recorder = h.recorder.lock().await;
        let batch = recorder.commits().last().unwrap();
        assert!(batch.contains(&"no ip route 10.0.0.0/24 10.0.0.1 vrf Vrf1 tag 1".to_string()));
        assert!(batch.contains(&"no ip route 10.0.0.0/24 blackhole tag 1".to_string()));
        assert_eq!(
            batch.iter().filter(|l| l.starts_with("no route-map")).count(),
            2
        );
        assert!(h.mgr.cache().is_empty());
    }

    #[tokio::test]
    async fn test_appl_db_delete_skipped_for_bfd_route() {
        let directory = Arc::new(Directory::new());
        let recorder = Arc::new(Mutex::new(RecordingConfigMgr::new()));
        let connector = Arc::new(
            MemoryConfigDbConnector::new().with_field("STATIC_ROUTE|Vrf1|10.0.0.0/24", "bfd", "true"),
        );
        let mut mgr = StaticRouteMgr::for_appl_db(directory, recorder.clone(), connector);
        mgr.set_handler("Vrf1:10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        recorder.lock().await.take_pending();

        mgr.del_handler("Vrf1:10.0.0.0/24").await.unwrap();
        assert!(recorder.lock().await.take_pending().is_empty());
        assert_eq!(mgr.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_purged_last_route_drops_pending_vrf() {
        let directory = Arc::new(Directory::new());
        let recorder = Arc::new(Mutex::new(RecordingConfigMgr::new()));
        let connector = Arc::new(
            MemoryConfigDbConnector::new().with_field(
                "STATIC_ROUTE|Vrf1|10.0.0.0/24",
                "nexthop",
                "10.0.0.1",
            ),
        );
        let mut mgr = StaticRouteMgr::for_appl_db(directory.clone(), recorder.clone(), connector);
        mgr.set_handler("Vrf1:10.0.0.0/24", &field_values! { "nexthop" => "10.0.0.1" })
            .await
            .unwrap();
        assert_eq!(
            mgr.redistribution().state("Vrf1"),
            Some(&RedistributionState::Pending)
        );

        mgr.del_handler("Vrf1:10.0.0.0/24").await.unwrap();
        assert!(mgr.cache().is_empty());
        assert_eq!(mgr.redistribution().state("Vrf1"), None);
        recorder.lock().await.take_pending();

        directory.put(
            DbId::ConfigDb,
            CFG_DEVICE_METADATA_TABLE_NAME,
            BGP_ASN_PATH,
            "65100",
        );
        mgr.on_bgp_asn_change().await;
        assert!(recorder.lock().await.take_pending().is_empty());
    }
}
