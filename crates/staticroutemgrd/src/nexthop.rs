//! Next-hop values and per-route next-hop sets
//!
//! A STATIC_ROUTE row carries up to five comma-separated lists that are
//! indexed in parallel: element `i` of each list describes next-hop `i`.
//! An element that fails validation is dropped on its own; lists of
//! different lengths reject the whole row.

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use sonic_bgpcfgd_common::{BgpCfgError, BgpCfgResult, FieldValues, FieldValuesExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::tables::fields;
use crate::types::{AddressFamily, RouteKey};

/// Interface names starting with this are accepted in the nexthop field
const PORTCHANNEL_PREFIX: &str = "PortChannel";

/// Reasons a single next-hop element is dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NextHopError {
    #[error("invalid {family:?} next-hop address '{value}'")]
    InvalidAddress { value: String, family: AddressFamily },

    #[error("invalid distance '{0}'")]
    InvalidDistance(String),

    #[error("mandatory attribute not found for next-hop")]
    NoForwardingMethod,
}

/// Where traffic for the prefix is sent, besides the interface
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gateway {
    /// No address (zero address in the table, or absent)
    None,
    Ip(IpAddr),
    /// Port-channel name given in place of an address
    PortChannel(String),
}

/// One validated way to reach a prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NextHop {
    family: AddressFamily,
    blackhole: bool,
    gateway: Gateway,
    interface: String,
    distance: u32,
    nexthop_vrf: String,
}

impl NextHop {
    /// Builds a next-hop from the per-index values of a row.
    ///
    /// A blackhole next-hop ignores address, interface and VRF.
    pub fn new(
        family: AddressFamily,
        blackhole: Option<&str>,
        ip: Option<&str>,
        interface: Option<&str>,
        distance: Option<&str>,
        nexthop_vrf: Option<&str>,
    ) -> Result<Self, NextHopError> {
        let blackhole = blackhole == Some("true");
        let distance = match distance {
            None => 0,
            Some(d) => d
                .trim()
                .parse::<u32>()
                .map_err(|_| NextHopError::InvalidDistance(d.to_string()))?,
        };

        let (ip, interface, nexthop_vrf) = if blackhole {
            (None, None, None)
        } else {
            (ip, interface, nexthop_vrf)
        };

        let gateway = match ip {
            None | Some("") => Gateway::None,
            Some(name) if name.starts_with(PORTCHANNEL_PREFIX) => {
                Gateway::PortChannel(name.to_string())
            }
            Some(addr) => match addr.parse::<IpAddr>() {
                Ok(ip) if family.matches(&ip) => {
                    if ip.is_unspecified() {
                        Gateway::None
                    } else {
                        Gateway::Ip(ip)
                    }
                }
                _ => {
                    return Err(NextHopError::InvalidAddress {
                        value: addr.to_string(),
                        family,
                    })
                }
            },
        };

        let next_hop = Self {
            family,
            blackhole,
            gateway,
            interface: interface.unwrap_or_default().to_string(),
            distance,
            nexthop_vrf: nexthop_vrf.unwrap_or_default().to_string(),
        };

        if !next_hop.blackhole
            && next_hop.gateway == Gateway::None
            && next_hop.interface.trim().is_empty()
        {
            return Err(NextHopError::NoForwardingMethod);
        }

        Ok(next_hop)
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn is_blackhole(&self) -> bool {
        self.blackhole
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    pub fn nexthop_vrf(&self) -> &str {
        &self.nexthop_vrf
    }
}

/// The next-hop clause of an `ip route` command, with a leading space
impl fmt::Display for NextHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.blackhole {
            f.write_str(" blackhole")?;
        }
        match &self.gateway {
            Gateway::None => {}
            Gateway::Ip(ip) => write!(f, " {}", ip)?,
            Gateway::PortChannel(name) => write!(f, " {}", name)?,
        }
        if !self.interface.is_empty() {
            write!(f, " {}", self.interface)?;
        }
        if self.distance != 0 {
            write!(f, " {}", self.distance)?;
        }
        if !self.nexthop_vrf.is_empty() {
            write!(f, " nexthop-vrf {}", self.nexthop_vrf)?;
        }
        Ok(())
    }
}

/// How the `bfd` attribute applies to a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    /// No next-hop is BFD-checked
    Off,
    /// The whole route belongs to the BFD-aware agent
    Row,
    /// Per-element flags; `true` elements belong to the BFD-aware agent
    PerElement(Vec<bool>),
}

/// The raw parallel attribute lists of one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextHopLists {
    pub blackhole: Option<Vec<String>>,
    pub nexthop: Option<Vec<String>>,
    pub ifname: Option<Vec<String>>,
    pub distance: Option<Vec<String>>,
    pub nexthop_vrf: Option<Vec<String>>,
    pub bfd: Option<Vec<String>>,
}

impl NextHopLists {
    /// Extracts the lists from a row. A blank value counts as absent.
    pub fn from_fvs(fvs: &FieldValues) -> Self {
        let list = |field: &str| {
            fvs.get_field(field)
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.split(',').map(str::to_string).collect::<Vec<_>>())
        };

        Self {
            blackhole: list(fields::BLACKHOLE),
            nexthop: list(fields::NEXTHOP),
            ifname: list(fields::IFNAME),
            distance: list(fields::DISTANCE),
            nexthop_vrf: list(fields::NEXTHOP_VRF),
            bfd: list(fields::BFD),
        }
    }

    fn attribute_lists(&self) -> [(&'static str, Option<&Vec<String>>); 5] {
        [
            (fields::BLACKHOLE, self.blackhole.as_ref()),
            (fields::NEXTHOP, self.nexthop.as_ref()),
            (fields::IFNAME, self.ifname.as_ref()),
            (fields::DISTANCE, self.distance.as_ref()),
            (fields::NEXTHOP_VRF, self.nexthop_vrf.as_ref()),
        ]
    }

    /// Returns true if no list names a forwarding method.
    ///
    /// Distance or VRF alone do not describe a next-hop.
    pub fn is_empty(&self) -> bool {
        self.blackhole.is_none() && self.nexthop.is_none() && self.ifname.is_none()
    }

    /// Number of next-hops described, or an error if the lists disagree.
    pub fn count(&self, key: &RouteKey) -> BgpCfgResult<usize> {
        let present: Vec<(&str, usize)> = self
            .attribute_lists()
            .iter()
            .filter_map(|(name, list)| list.map(|l| (*name, l.len())))
            .collect();

        let count = present.first().map(|(_, len)| *len).unwrap_or(0);
        if present.iter().any(|(_, len)| *len != count) {
            return Err(BgpCfgError::malformed_row(
                key.to_string(),
                format!("next-hop attribute lists have different sizes: {:?}", present),
            ));
        }
        Ok(count)
    }

    /// Interprets the `bfd` list against `count` next-hops.
    pub fn liveness(&self, key: &RouteKey, count: usize) -> BgpCfgResult<Liveness> {
        let flags: Vec<bool> = match &self.bfd {
            None => return Ok(Liveness::Off),
            Some(list) => list.iter().map(|v| bfd_flag(v)).collect(),
        };

        if flags.len() == 1 {
            return Ok(if flags[0] { Liveness::Row } else { Liveness::Off });
        }
        if flags.len() != count {
            return Err(BgpCfgError::malformed_row(
                key.to_string(),
                format!("bfd list has {} entries for {} next-hops", flags.len(), count),
            ));
        }
        Ok(if flags.iter().all(|f| *f) {
            Liveness::Row
        } else if flags.iter().any(|f| *f) {
            Liveness::PerElement(flags)
        } else {
            Liveness::Off
        })
    }
}

fn bfd_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Returns true if a stored `bfd` value hands the whole row to the
/// BFD-aware agent: every comma-separated element is `true`.
pub fn bfd_covers_row(value: &str) -> bool {
    !value.trim().is_empty() && value.split(',').all(bfd_flag)
}

fn item(list: &Option<Vec<String>>, idx: usize) -> Option<&str> {
    list.as_ref().map(|l| l[idx].as_str())
}

/// Deduplicated next-hops of one route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextHopSet {
    next_hops: BTreeSet<NextHop>,
}

impl NextHopSet {
    /// Creates an empty set (nothing installed)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set for `key` from the row's attribute lists.
    ///
    /// BFD-flagged elements are left out: their installation is owned by
    /// the BFD-aware agent.
    pub fn from_lists(key: &RouteKey, lists: &NextHopLists) -> BgpCfgResult<Self> {
        let mut set = Self::new();
        if lists.is_empty() {
            return Ok(set);
        }

        let count = lists.count(key)?;
        let liveness = lists.liveness(key, count)?;

        for idx in 0..count {
            if let Liveness::PerElement(flags) = &liveness {
                if flags[idx] {
                    debug!("{}: next-hop #{} is BFD-checked, skipping", key, idx);
                    continue;
                }
            }

            match NextHop::new(
                key.family(),
                item(&lists.blackhole, idx),
                item(&lists.nexthop, idx),
                item(&lists.ifname, idx),
                item(&lists.distance, idx),
                item(&lists.nexthop_vrf, idx),
            ) {
                Ok(next_hop) => {
                    set.insert(next_hop);
                }
                Err(e) => warn!("{}: dropping next-hop #{}: {}", key, idx, e),
            }
        }

        Ok(set)
    }

    pub fn insert(&mut self, next_hop: NextHop) -> bool {
        self.next_hops.insert(next_hop)
    }

    pub fn contains(&self, next_hop: &NextHop) -> bool {
        self.next_hops.contains(next_hop)
    }

    pub fn len(&self) -> usize {
        self.next_hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_hops.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, NextHop> {
        self.next_hops.iter()
    }

    /// Next-hops present in exactly one of the two sets
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a NextHopSet,
    ) -> btree_set::SymmetricDifference<'a, NextHop> {
        self.next_hops.symmetric_difference(&other.next_hops)
    }
}

impl<'a> IntoIterator for &'a NextHopSet {
    type Item = &'a NextHop;
    type IntoIter = btree_set::Iter<'a, NextHop>;

    fn into_iter(self) -> Self::IntoIter {
        self.next_hops.iter()
    }
}

impl FromIterator<NextHop> for NextHopSet {
    fn from_iter<I: IntoIterator<Item = NextHop>>(iter: I) -> Self {
        Self {
            next_hops: iter.into_iter().collect(),
        }
    }
}
