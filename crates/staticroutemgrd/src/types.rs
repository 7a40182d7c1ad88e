//! Type definitions for staticroutemgrd

use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use sonic_bgpcfgd_common::{BgpCfgError, BgpCfgResult};

/// Name of the global routing table
pub const DEFAULT_VRF: &str = "default";

/// Address family of a route and its next-hops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Keyword used by FRR static route commands
    pub fn route_keyword(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "ip",
            AddressFamily::V6 => "ipv6",
        }
    }

    /// Returns true if `addr` belongs to this family
    pub fn matches(&self, addr: &IpAddr) -> bool {
        matches!(
            (self, addr),
            (AddressFamily::V4, IpAddr::V4(_)) | (AddressFamily::V6, IpAddr::V6(_))
        )
    }
}

/// Route tag matched by the STATIC_ROUTE_FILTER route-map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteTag {
    /// Redistributed into BGP
    Advertise,
    /// Installed but not redistributed
    Suppress,
}

impl RouteTag {
    /// Numeric tag value placed on the route
    pub fn value(&self) -> u32 {
        match self {
            RouteTag::Advertise => 1,
            RouteTag::Suppress => 2,
        }
    }

    /// Interprets the `advertise` field: only an explicit "false" suppresses
    pub fn from_advertise(advertise: Option<&str>) -> Self {
        match advertise {
            Some("false") => RouteTag::Suppress,
            _ => RouteTag::Advertise,
        }
    }
}

impl fmt::Display for RouteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Identity of a static route: VRF plus prefix
///
/// The prefix is validated but kept as written in the table, since it is
/// echoed into FRR commands and used to look the row up again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    vrf: String,
    prefix: String,
    family: AddressFamily,
}

impl RouteKey {
    /// Creates a key after validating `prefix`
    pub fn new(vrf: impl Into<String>, prefix: impl Into<String>) -> BgpCfgResult<Self> {
        let vrf = vrf.into();
        let prefix = prefix.into();
        if vrf.is_empty() {
            return Err(BgpCfgError::malformed_key(prefix, "empty VRF name"));
        }
        let family = parse_prefix(&prefix)
            .map(|net| match net {
                IpNet::V4(_) => AddressFamily::V4,
                IpNet::V6(_) => AddressFamily::V6,
            })
            .ok_or_else(|| BgpCfgError::malformed_key(&prefix, "invalid IP prefix"))?;
        Ok(Self {
            vrf,
            prefix,
            family,
        })
    }

    /// Splits a table key into VRF and prefix.
    ///
    /// Accepted forms:
    /// - `VRF|PREFIX` (CONFIG_DB)
    /// - `PREFIX` (either database, VRF "default")
    /// - `VRF:PREFIX` (APPL_DB)
    pub fn split(key: &str) -> BgpCfgResult<Self> {
        if let Some((vrf, prefix)) = key.split_once('|') {
            return Self::new(vrf, prefix);
        }
        if parse_prefix(key).is_some() {
            return Self::new(DEFAULT_VRF, key);
        }
        match key.split_once(':') {
            Some((vrf, prefix)) => Self::new(vrf, prefix),
            None => Err(BgpCfgError::malformed_key(
                key,
                "expected PREFIX, VRF|PREFIX or VRF:PREFIX",
            )),
        }
    }

    pub fn vrf(&self) -> &str {
        &self.vrf
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn is_default_vrf(&self) -> bool {
        self.vrf == DEFAULT_VRF
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.vrf, self.prefix)
    }
}

/// Parses a prefix, accepting a bare address as a host route
fn parse_prefix(s: &str) -> Option<IpNet> {
    s.parse::<IpNet>()
        .ok()
        .or_else(|| s.parse::<IpAddr>().ok().map(IpNet::from))
}
