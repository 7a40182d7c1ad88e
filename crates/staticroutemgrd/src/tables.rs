//! Database table name constants for staticroutemgrd

// CONFIG_DB tables
/// Static route table in CONFIG_DB
pub const CFG_STATIC_ROUTE_TABLE_NAME: &str = "STATIC_ROUTE";

/// Device metadata table in CONFIG_DB (carries the BGP ASN)
pub const CFG_DEVICE_METADATA_TABLE_NAME: &str = "DEVICE_METADATA";

// APPL_DB tables
/// Static route table in APPL_DB, written by the BFD-aware companion agent
pub const APP_STATIC_ROUTE_TABLE_NAME: &str = "STATIC_ROUTE_TABLE";

/// Key of the local device in DEVICE_METADATA
pub const DEVICE_METADATA_LOCALHOST: &str = "localhost";

/// Directory path of the BGP ASN fact
pub const BGP_ASN_PATH: &str = "localhost/bgp_asn";

/// Field names used in STATIC_ROUTE rows
pub mod fields {
    /// Comma-separated blackhole flags
    pub const BLACKHOLE: &str = "blackhole";

    /// Comma-separated next-hop addresses
    pub const NEXTHOP: &str = "nexthop";

    /// Comma-separated egress interface names
    pub const IFNAME: &str = "ifname";

    /// Comma-separated administrative distances
    pub const DISTANCE: &str = "distance";

    /// Comma-separated next-hop VRF names
    pub const NEXTHOP_VRF: &str = "nexthop-vrf";

    /// BFD (liveness check) flag
    pub const BFD: &str = "bfd";

    /// Advertise flag ("false" suppresses redistribution)
    pub const ADVERTISE: &str = "advertise";

    /// BGP ASN in DEVICE_METADATA|localhost
    pub const BGP_ASN: &str = "bgp_asn";
}
