//! Test infrastructure for SONiC bgpcfgd managers
//!
//! Provides:
//! - Test fixtures for STATIC_ROUTE and DEVICE_METADATA rows
//! - A recording command channel standing in for vtysh
//! - An in-memory CONFIG_DB for race guard lookups
//! - Assertions over generated FRR command batches

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
