//! What the manager believes is currently installed in FRR

use std::collections::BTreeMap;

use crate::nexthop::NextHopSet;
use crate::types::{RouteKey, RouteTag};

/// Installed next-hops and tag of one route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteState {
    pub next_hops: NextHopSet,
    pub tag: RouteTag,
}

impl RouteState {
    pub fn new(next_hops: NextHopSet, tag: RouteTag) -> Self {
        Self { next_hops, tag }
    }
}

/// Per-VRF map from prefix to [`RouteState`].
///
/// A VRF with no routes has no entry, so `vrf_route_count` going from
/// 0 to 1 (and back) marks the redistribution transitions.
#[derive(Debug, Default)]
pub struct RouteCache {
    vrfs: BTreeMap<String, BTreeMap<RouteKey, RouteState>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RouteKey) -> Option<&RouteState> {
        self.vrfs.get(key.vrf()).and_then(|routes| routes.get(key))
    }

    /// Stores `state` for `key`, returning the state it replaced.
    pub fn insert(&mut self, key: RouteKey, state: RouteState) -> Option<RouteState> {
        self.vrfs
            .entry(key.vrf().to_string())
            .or_default()
            .insert(key, state)
    }

    /// Forgets `key`, dropping the VRF entry once it has no routes left.
    pub fn remove(&mut self, key: &RouteKey) -> Option<RouteState> {
        let routes = self.vrfs.get_mut(key.vrf())?;
        let removed = routes.remove(key);
        if routes.is_empty() {
            self.vrfs.remove(key.vrf());
        }
        removed
    }

    pub fn vrf_route_count(&self, vrf: &str) -> usize {
        self.vrfs.get(vrf).map_or(0, BTreeMap::len)
    }

    /// Returns true if `key` is the only cached route of its VRF.
    pub fn is_last_in_vrf(&self, key: &RouteKey) -> bool {
        self.vrfs
            .get(key.vrf())
            .is_some_and(|routes| routes.len() == 1 && routes.contains_key(key))
    }

    pub fn vrfs(&self) -> impl Iterator<Item = &str> {
        self.vrfs.keys().map(String::as_str)
    }

    /// Cached routes of `vrf`, in prefix order.
    pub fn routes(&self, vrf: &str) -> impl Iterator<Item = (&RouteKey, &RouteState)> {
        self.vrfs.get(vrf).into_iter().flat_map(|routes| routes.iter())
    }

    pub fn len(&self) -> usize {
        self.vrfs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.vrfs.is_empty()
    }

    /// Removes and returns every cached route, VRF by VRF.
    pub fn drain(&mut self) -> Vec<(String, Vec<(RouteKey, RouteState)>)> {
        std::mem::take(&mut self.vrfs)
            .into_iter()
            .map(|(vrf, routes)| (vrf, routes.into_iter().collect()))
            .collect()
    }
}
