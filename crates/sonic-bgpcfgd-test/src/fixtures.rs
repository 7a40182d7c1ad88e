//! Test fixtures for bgpcfgd managers
//!
//! Provides reusable table events for static route testing

use std::collections::BTreeMap;

use sonic_bgpcfgd_common::{DbId, KeyOpFieldsValues, Operation};

/// Represents one table change event
#[derive(Debug, Clone)]
pub struct ConfigChange {
    /// Database the row lives in
    pub db: DbId,
    /// Table name (e.g., "STATIC_ROUTE", "DEVICE_METADATA")
    pub table: String,
    /// Key within the table
    pub key: String,
    /// Operation type
    pub op: Operation,
    /// Field-value pairs (for SET operations)
    pub fields: BTreeMap<String, String>,
}

impl ConfigChange {
    /// Create a SET operation
    pub fn set(db: DbId, table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            key: key.into(),
            op: Operation::Set,
            fields: BTreeMap::new(),
        }
    }

    /// Create a DEL operation
    pub fn del(db: DbId, table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            key: key.into(),
            op: Operation::Del,
            fields: BTreeMap::new(),
        }
    }

    /// Add a field to a SET operation
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Add multiple fields to a SET operation
    pub fn with_fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in fields {
            self.fields.insert(k.into(), v.into());
        }
        self
    }

    /// Full Redis key, using the separator of the change's database
    pub fn redis_key(&self) -> String {
        format!("{}{}{}", self.table, self.db.table_separator(), self.key)
    }

    /// Event as delivered to a manager
    pub fn to_event(&self) -> KeyOpFieldsValues {
        match self.op {
            Operation::Set => KeyOpFieldsValues::set(
                self.key.clone(),
                self.fields
                    .iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect(),
            ),
            Operation::Del => KeyOpFieldsValues::del(self.key.clone()),
        }
    }
}

/// STATIC_ROUTE rows
pub mod static_route_fixtures {
    use super::*;

    pub const CONFIG_TABLE: &str = "STATIC_ROUTE";
    pub const APPL_TABLE: &str = "STATIC_ROUTE_TABLE";

    /// CONFIG_DB route through one or more gateways (comma-joined)
    pub fn route(key: &str, nexthop: &str) -> ConfigChange {
        ConfigChange::set(DbId::ConfigDb, CONFIG_TABLE, key).with_field("nexthop", nexthop)
    }

    /// CONFIG_DB route whose redistribution is suppressed
    pub fn suppressed_route(key: &str, nexthop: &str) -> ConfigChange {
        route(key, nexthop).with_field("advertise", "false")
    }

    /// CONFIG_DB route out of an interface
    pub fn interface_route(key: &str, nexthop: &str, ifname: &str) -> ConfigChange {
        route(key, nexthop).with_field("ifname", ifname)
    }

    /// CONFIG_DB blackhole route with an administrative distance
    pub fn blackhole_route(key: &str, distance: &str) -> ConfigChange {
        ConfigChange::set(DbId::ConfigDb, CONFIG_TABLE, key)
            .with_field("blackhole", "true")
            .with_field("distance", distance)
    }

    /// CONFIG_DB route handed to the BFD-aware agent
    pub fn bfd_route(key: &str, nexthop: &str) -> ConfigChange {
        route(key, nexthop).with_field("bfd", "true")
    }

    /// Delete a CONFIG_DB route
    pub fn delete_route(key: &str) -> ConfigChange {
        ConfigChange::del(DbId::ConfigDb, CONFIG_TABLE, key)
    }

    /// APPL_DB route (key uses `VRF:PREFIX` or a bare prefix)
    pub fn appl_route(key: &str, nexthop: &str) -> ConfigChange {
        ConfigChange::set(DbId::ApplDb, APPL_TABLE, key).with_field("nexthop", nexthop)
    }

    /// Delete an APPL_DB route
    pub fn delete_appl_route(key: &str) -> ConfigChange {
        ConfigChange::del(DbId::ApplDb, APPL_TABLE, key)
    }
}

/// DEVICE_METADATA rows
pub mod device_metadata_fixtures {
    use super::*;

    pub const TABLE: &str = "DEVICE_METADATA";

    /// localhost entry carrying the BGP ASN
    pub fn localhost_with_asn(asn: &str) -> ConfigChange {
        ConfigChange::set(DbId::ConfigDb, TABLE, "localhost")
            .with_field("bgp_asn", asn)
            .with_field("hostname", "sonic")
    }

    /// Delete the localhost entry
    pub fn delete_localhost() -> ConfigChange {
        ConfigChange::del(DbId::ConfigDb, TABLE, "localhost")
    }
}

/// Test scenario builder for multi-step tests
#[derive(Debug)]
pub struct TestScenario {
    /// Scenario name
    pub name: String,
    /// Sequence of table changes
    pub changes: Vec<ConfigChange>,
    /// Lines expected in the generated FRR configuration
    pub expected_lines: Vec<String>,
}

impl TestScenario {
    /// Create a new test scenario
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            changes: Vec::new(),
            expected_lines: Vec::new(),
        }
    }

    /// Add a table change to the scenario
    pub fn add_change(mut self, change: ConfigChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Expect a line in the generated configuration
    pub fn expect_line(mut self, line: impl Into<String>) -> Self {
        self.expected_lines.push(line.into());
        self
    }
}
