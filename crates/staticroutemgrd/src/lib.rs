//! Static route manager for SONiC bgpcfgd
//!
//! Reconciles `STATIC_ROUTE` rows from CONFIG_DB and `STATIC_ROUTE_TABLE`
//! rows from APPL_DB into FRR static route configuration, and switches
//! BGP redistribution of static routes on and off per VRF.

pub mod commands;
pub mod config;
pub mod daemon;
pub mod device_metadata_mgr;
pub mod nexthop;
pub mod race_guard;
pub mod redistribution;
pub mod route_cache;
pub mod static_route_mgr;
pub mod tables;
pub mod types;

pub use commands::*;
pub use config::StaticRouteMgrdConfig;
pub use daemon::StaticRouteDaemon;
pub use device_metadata_mgr::DeviceMetadataMgr;
pub use nexthop::{Gateway, Liveness, NextHop, NextHopError, NextHopLists, NextHopSet};
pub use race_guard::{DeleteDecision, RaceGuard};
pub use redistribution::{RedistributionController, RedistributionState};
pub use route_cache::{RouteCache, RouteState};
pub use static_route_mgr::StaticRouteMgr;
pub use tables::*;
pub use types::*;
