//! End-to-end static route reconciliation through the manager API

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sonic_bgpcfgd_common::{ConfigMgr, DbId, Directory, Manager};
use sonic_bgpcfgd_test::{
    device_metadata_fixtures, static_route_fixtures, CommandVerifier, ConfigChange,
    MemoryConfigDbConnector, RecordingConfigMgr, TestScenario,
};
use sonic_staticroutemgrd::{
    DeviceMetadataMgr, StaticRouteDaemon, StaticRouteMgr, BGP_ASN_PATH,
    CFG_DEVICE_METADATA_TABLE_NAME,
};
use tokio::sync::Mutex;

struct Env {
    directory: Arc<Directory>,
    recorder: Arc<Mutex<RecordingConfigMgr>>,
    connector: Arc<MemoryConfigDbConnector>,
}

impl Env {
    fn new(asn: Option<&str>) -> Self {
        let directory = Arc::new(Directory::new());
        if let Some(asn) = asn {
            directory.put(
                DbId::ConfigDb,
                CFG_DEVICE_METADATA_TABLE_NAME,
                BGP_ASN_PATH,
                asn,
            );
        }
        Self {
            directory,
            recorder: Arc::new(Mutex::new(RecordingConfigMgr::new())),
            connector: Arc::new(MemoryConfigDbConnector::new()),
        }
    }

    fn config_mgr(&self) -> StaticRouteMgr {
        StaticRouteMgr::for_config_db(self.directory.clone(), self.recorder.clone())
    }

    fn appl_mgr(&self) -> StaticRouteMgr {
        StaticRouteMgr::for_appl_db(
            self.directory.clone(),
            self.recorder.clone(),
            self.connector.clone(),
        )
    }

    async fn lines(&self) -> CommandVerifier {
        CommandVerifier::new(self.recorder.lock().await.take_pending())
    }
}

async fn apply(mgr: &mut StaticRouteMgr, change: &ConfigChange) {
    mgr.handle(&change.to_event())
        .await
        .unwrap_or_else(|e| panic!("{} failed: {}", change.key, e));
}

#[tokio::test]
async fn test_install_change_flip_delete() {
    let env = Env::new(Some("65100"));
    let mut mgr = env.config_mgr();

    // First route of the VRF: enable precedes the install
    apply(&mut mgr, &static_route_fixtures::route("10.0.0.0/24", "10.0.0.1")).await;
    let v = env.lines().await;
    v.assert_before(
        " address-family ipv4",
        "ip route 10.0.0.0/24 10.0.0.1 tag 1",
    )
    .unwrap();
    v.assert_line("router bgp 65100").unwrap();

    // Gateway change
    apply(&mut mgr, &static_route_fixtures::route("10.0.0.0/24", "10.0.0.2")).await;
    let v = env.lines().await;
    assert_eq!(
        v.lines(),
        &[
            "no ip route 10.0.0.0/24 10.0.0.1 tag 1".to_string(),
            "ip route 10.0.0.0/24 10.0.0.2 tag 1".to_string(),
        ]
    );

    // Advertise flip re-issues the unchanged gateway under the new tag
    apply(
        &mut mgr,
        &static_route_fixtures::suppressed_route("10.0.0.0/24", "10.0.0.2"),
    )
    .await;
    let v = env.lines().await;
    assert_eq!(
        v.lines(),
        &[
            "no ip route 10.0.0.0/24 10.0.0.2 tag 1".to_string(),
            "ip route 10.0.0.0/24 10.0.0.2 tag 2".to_string(),
        ]
    );

    // Last route: uninstall then disable
    apply(&mut mgr, &static_route_fixtures::delete_route("10.0.0.0/24")).await;
    let v = env.lines().await;
    v.assert_before(
        "no ip route 10.0.0.0/24 10.0.0.2 tag 2",
        "no route-map STATIC_ROUTE_FILTER",
    )
    .unwrap();
    v.assert_line("  no redistribute static route-map STATIC_ROUTE_FILTER")
        .unwrap();
    assert!(mgr.cache().is_empty());
}

#[tokio::test]
async fn test_blackhole_and_interface_clauses() {
    let env = Env::new(Some("65100"));
    let mut mgr = env.config_mgr();

    apply(&mut mgr, &static_route_fixtures::blackhole_route("Vrf1|10.9.0.0/16", "5")).await;
    apply(
        &mut mgr,
        &static_route_fixtures::interface_route("Vrf1|10.8.0.0/16", "0.0.0.0", "Ethernet4"),
    )
    .await;
    apply(
        &mut mgr,
        &static_route_fixtures::interface_route("2001:db8::/64", "::", "Ethernet8"),
    )
    .await;

    let v = env.lines().await;
    v.assert_line("ip route 10.9.0.0/16 blackhole 5 vrf Vrf1 tag 1").unwrap();
    v.assert_line("ip route 10.8.0.0/16 Ethernet4 vrf Vrf1 tag 1").unwrap();
    v.assert_line("ipv6 route 2001:db8::/64 Ethernet8 tag 1").unwrap();
    v.assert_absent("0.0.0.0").unwrap();
    v.assert_absent(":: ").unwrap();
}

#[tokio::test]
async fn test_ecmp_scenario() {
    let env = Env::new(Some("65100"));
    let mut mgr = env.config_mgr();

    let scenario = TestScenario::new("ECMP member swap")
        .add_change(static_route_fixtures::route(
            "Vrf2|172.16.0.0/16",
            "10.0.0.1,10.0.0.2,10.0.0.3",
        ))
        .add_change(static_route_fixtures::route(
            "Vrf2|172.16.0.0/16",
            "10.0.0.2,10.0.0.3,10.0.0.4",
        ))
        .expect_line("no ip route 172.16.0.0/16 10.0.0.1 vrf Vrf2 tag 1")
        .expect_line("ip route 172.16.0.0/16 10.0.0.4 vrf Vrf2 tag 1");

    let (first, rest) = scenario.changes.split_first().unwrap();
    apply(&mut mgr, first).await;
    env.lines().await;
    for change in rest {
        apply(&mut mgr, change).await;
    }

    let v = env.lines().await;
    for line in &scenario.expected_lines {
        v.assert_line(line).unwrap();
    }
    v.assert_line_count(2).unwrap();
    v.assert_uninstalls_precede_installs().unwrap();
}

#[tokio::test]
async fn test_rejected_rows_leave_state_alone() {
    let env = Env::new(Some("65100"));
    let mut mgr = env.config_mgr();
    apply(&mut mgr, &static_route_fixtures::route("10.0.0.0/24", "10.0.0.1")).await;
    env.lines().await;

    let mismatched = static_route_fixtures::route("10.0.0.0/24", "10.0.0.2,10.0.0.3")
        .with_field("ifname", "Ethernet0");
    assert!(mgr.handle(&mismatched.to_event()).await.is_err());

    let bad_bfd = static_route_fixtures::route("10.0.0.0/24", "10.0.0.2,10.0.0.3")
        .with_field("bfd", "true,false,true");
    assert!(mgr.handle(&bad_bfd.to_event()).await.is_err());

    env.lines().await.assert_line_count(0).unwrap();
    assert_eq!(mgr.cache().len(), 1);
}

#[tokio::test]
async fn test_invalid_element_is_skipped() {
    let env = Env::new(Some("65100"));
    let mut mgr = env.config_mgr();
    apply(
        &mut mgr,
        &static_route_fixtures::route("10.0.0.0/24", "10.0.0.1,fc00::1,bogus"),
    )
    .await;

    let v = env.lines().await;
    v.assert_line("ip route 10.0.0.0/24 10.0.0.1 tag 1").unwrap();
    v.assert_absent("fc00::1").unwrap();
    v.assert_absent("bogus").unwrap();
}

#[tokio::test]
async fn test_redistribution_waits_for_asn() {
    let env = Env::new(None);
    let recorder = env.recorder.clone();
    let mut daemon = StaticRouteDaemon::new(
        DeviceMetadataMgr::new(env.directory.clone()),
        vec![env.config_mgr()],
        recorder.clone(),
    );

    let route = static_route_fixtures::route("Vrf1|10.0.0.0/24", "10.0.0.1");
    daemon
        .dispatch(route.db, &route.table, &[route.to_event()])
        .await;
    let v = env.lines().await;
    v.assert_line_count(1).unwrap();
    v.assert_absent("router bgp").unwrap();

    let asn = device_metadata_fixtures::localhost_with_asn("65200");
    daemon.dispatch(asn.db, &asn.table, &[asn.to_event()]).await;
    let v = env.lines().await;
    v.assert_line("route-map STATIC_ROUTE_FILTER permit 10").unwrap();
    v.assert_line("router bgp 65200 vrf Vrf1").unwrap();

    // Same ASN again: nothing new
    daemon.dispatch(asn.db, &asn.table, &[asn.to_event()]).await;
    env.lines().await.assert_line_count(0).unwrap();
}

#[tokio::test]
async fn test_appl_db_delete_guarded_by_config_db() {
    let env = Env::new(Some("65100"));
    let mut mgr = env.appl_mgr();

    apply(&mut mgr, &static_route_fixtures::appl_route("Vrf1:10.0.0.0/24", "10.0.0.1")).await;
    apply(&mut mgr, &static_route_fixtures::appl_route("10.1.0.0/24", "10.0.0.1")).await;
    apply(&mut mgr, &static_route_fixtures::appl_route("10.2.0.0/24", "10.0.0.1")).await;
    env.lines().await;

    // BFD still on in CONFIG_DB: ignore the delete entirely
    env.connector
        .set_field("STATIC_ROUTE|Vrf1|10.0.0.0/24", "bfd", "true");
    apply(&mut mgr, &static_route_fixtures::delete_appl_route("Vrf1:10.0.0.0/24")).await;
    env.lines().await.assert_line_count(0).unwrap();
    assert_eq!(mgr.cache().vrf_route_count("Vrf1"), 1);

    // CONFIG_DB still has next-hops under the bare key: keep installed, forget it
    env.connector
        .set_field("STATIC_ROUTE|10.1.0.0/24", "nexthop", "10.0.0.1");
    apply(&mut mgr, &static_route_fixtures::delete_appl_route("10.1.0.0/24")).await;
    env.lines().await.assert_line_count(0).unwrap();
    assert_eq!(mgr.cache().vrf_route_count("default"), 1);

    // Nothing in CONFIG_DB: regular delete
    apply(&mut mgr, &static_route_fixtures::delete_appl_route("10.2.0.0/24")).await;
    let v = env.lines().await;
    v.assert_line("no ip route 10.2.0.0/24 10.0.0.1 tag 1").unwrap();
    v.assert_line("router bgp 65100").unwrap();

    assert_eq!(env.connector.connect_count(), 1);
}

#[tokio::test]
async fn test_config_db_manager_ignores_config_db_state() {
    let env = Env::new(Some("65100"));
    env.connector
        .set_field("STATIC_ROUTE|10.0.0.0/24", "bfd", "true");
    let mut mgr = env.config_mgr();

    apply(&mut mgr, &static_route_fixtures::route("10.0.0.0/24", "10.0.0.1")).await;
    env.lines().await;
    apply(&mut mgr, &static_route_fixtures::delete_route("10.0.0.0/24")).await;
    env.lines()
        .await
        .assert_line("no ip route 10.0.0.0/24 10.0.0.1 tag 1")
        .unwrap();
    assert_eq!(env.connector.connect_count(), 0);
}

#[tokio::test]
async fn test_unreachable_config_db_fails_delete() {
    let env = Env::new(Some("65100"));
    let mut mgr = StaticRouteMgr::for_appl_db(
        env.directory.clone(),
        env.recorder.clone(),
        Arc::new(MemoryConfigDbConnector::unreachable()),
    );
    apply(&mut mgr, &static_route_fixtures::appl_route("10.0.0.0/24", "10.0.0.1")).await;
    env.lines().await;

    let delete = static_route_fixtures::delete_appl_route("10.0.0.0/24");
    assert!(mgr.handle(&delete.to_event()).await.is_err());
    env.lines().await.assert_line_count(0).unwrap();
    assert_eq!(mgr.cache().len(), 1);
}

#[tokio::test]
async fn test_shutdown_commits_teardown_immediately() {
    let env = Env::new(Some("65100"));
    let mut mgr = env.config_mgr();
    apply(&mut mgr, &static_route_fixtures::route("Vrf1|10.0.0.0/24", "10.0.0.1")).await;
    apply(&mut mgr, &static_route_fixtures::route("Vrf1|10.1.0.0/24", "10.0.0.1")).await;
    apply(&mut mgr, &static_route_fixtures::route("10.0.0.0/24", "10.0.0.1")).await;
    env.recorder.lock().await.commit().await.unwrap();

    assert!(mgr.cleanup_on_exit().await);

    let recorder = env.recorder.lock().await;
    assert_eq!(recorder.commits().len(), 2);
    let v = CommandVerifier::new(recorder.commits()[1].clone());
    v.assert_line("no ip route 10.0.0.0/24 10.0.0.1 vrf Vrf1 tag 1").unwrap();
    v.assert_line("no ip route 10.1.0.0/24 10.0.0.1 vrf Vrf1 tag 1").unwrap();
    v.assert_line("no ip route 10.0.0.0/24 10.0.0.1 tag 1").unwrap();
    v.assert_before(
        "no ip route 10.1.0.0/24 10.0.0.1 vrf Vrf1 tag 1",
        "router bgp 65100 vrf Vrf1",
    )
    .unwrap();
    v.assert_line("router bgp 65100").unwrap();
    assert!(recorder.pending().is_empty());
}

#[tokio::test]
async fn test_shutdown_reports_rejected_commit() {
    let env = Env::new(Some("65100"));
    let recorder = Arc::new(Mutex::new(RecordingConfigMgr::rejecting()));
    let mut mgr = StaticRouteMgr::for_config_db(env.directory.clone(), recorder.clone());
    apply(&mut mgr, &static_route_fixtures::route("10.0.0.0/24", "10.0.0.1")).await;

    assert!(!mgr.cleanup_on_exit().await);
    assert!(mgr.cache().is_empty());
}
