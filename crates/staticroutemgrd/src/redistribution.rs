//! Static route redistribution state per VRF
//!
//! Redistribution is switched on when a VRF gets its first static route
//! and off when it loses its last one. Enabling needs the BGP ASN; until
//! it is known the VRF waits in the pending state.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::commands::{build_disable_redistribution_cmds, build_enable_redistribution_cmds};

/// Redistribution state of a VRF that has routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedistributionState {
    /// Waiting for the ASN
    Pending,
    /// Enabled under `router bgp <asn>`
    Enabled { asn: String },
}

/// Tracks redistribution for every VRF with cached routes
#[derive(Debug, Default)]
pub struct RedistributionController {
    vrfs: BTreeMap<String, RedistributionState>,
}

impl RedistributionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, vrf: &str) -> Option<&RedistributionState> {
        self.vrfs.get(vrf)
    }

    /// VRFs waiting for the ASN
    pub fn pending_vrfs(&self) -> impl Iterator<Item = &str> {
        self.vrfs
            .iter()
            .filter(|(_, state)| **state == RedistributionState::Pending)
            .map(|(vrf, _)| vrf.as_str())
    }

    /// Called when `vrf` goes from no routes to one route.
    ///
    /// Returns the enable sequence if `asn` is known; otherwise the VRF
    /// becomes pending. A VRF already tracked is left alone.
    pub fn on_first_route(&mut self, vrf: &str, asn: Option<&str>) -> Vec<String> {
        if self.vrfs.contains_key(vrf) {
            return vec![];
        }

        match asn {
            Some(asn) => {
                info!("Enabling static route redistribution for VRF {}", vrf);
                self.vrfs.insert(
                    vrf.to_string(),
                    RedistributionState::Enabled {
                        asn: asn.to_string(),
                    },
                );
                build_enable_redistribution_cmds(vrf, asn)
            }
            None => {
                debug!("BGP ASN unknown, redistribution for VRF {} pending", vrf);
                self.vrfs
                    .insert(vrf.to_string(), RedistributionState::Pending);
                vec![]
            }
        }
    }

    /// Called when `vrf` loses its last route.
    ///
    /// Returns the disable sequence only if an enable was issued.
    pub fn on_last_route_removed(&mut self, vrf: &str) -> Vec<String> {
        match self.vrfs.remove(vrf) {
            Some(RedistributionState::Enabled { asn }) => {
                info!("Disabling static route redistribution for VRF {}", vrf);
                build_disable_redistribution_cmds(vrf, &asn)
            }
            Some(RedistributionState::Pending) => {
                debug!("Dropping pending redistribution for VRF {}", vrf);
                vec![]
            }
            None => vec![],
        }
    }

    /// Called when `vrf` is emptied without emitting commands.
    ///
    /// A pending VRF is dropped so a later ASN does not enable it. An
    /// enabled VRF stays enabled until a route removal or reset.
    pub fn on_routes_forgotten(&mut self, vrf: &str) {
        if self.vrfs.get(vrf) == Some(&RedistributionState::Pending) {
            debug!("Dropping pending redistribution for VRF {}", vrf);
            self.vrfs.remove(vrf);
        }
    }

    /// Called when the ASN becomes known; enables every pending VRF.
    pub fn on_asn_known(&mut self, asn: &str) -> Vec<String> {
        let mut cmds = Vec::new();
        for (vrf, state) in self.vrfs.iter_mut() {
            if *state == RedistributionState::Pending {
                info!(
                    "BGP ASN {} known, enabling static route redistribution for VRF {}",
                    asn, vrf
                );
                cmds.extend(build_enable_redistribution_cmds(vrf, asn));
                *state = RedistributionState::Enabled {
                    asn: asn.to_string(),
                };
            }
        }
        cmds
    }

    /// Forgets every VRF, returning disable sequences for the enabled ones.
    pub fn reset(&mut self) -> Vec<String> {
        let vrfs: Vec<String> = self.vrfs.keys().cloned().collect();
        vrfs.iter()
            .flat_map(|vrf| self.on_last_route_removed(vrf))
            .collect()
    }
}
