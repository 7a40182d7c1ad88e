//! FRR command builders for static routes and their redistribution

use crate::nexthop::{NextHop, NextHopSet};
use crate::types::{RouteKey, RouteTag, DEFAULT_VRF};

/// Route-map gating which static routes are redistributed into BGP
pub const STATIC_ROUTE_FILTER: &str = "STATIC_ROUTE_FILTER";

/// Polarity of a route command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOp {
    Install,
    Uninstall,
}

/// Build one static route line
///
/// `[no ]{ip|ipv6} route PREFIX NEXTHOP[ vrf VRF] tag TAG`
pub fn build_route_cmd(op: RouteOp, next_hop: &NextHop, key: &RouteKey, tag: RouteTag) -> String {
    format!(
        "{}{} route {}{}{} tag {}",
        if op == RouteOp::Uninstall { "no " } else { "" },
        next_hop.family().route_keyword(),
        key.prefix(),
        next_hop,
        if key.is_default_vrf() {
            String::new()
        } else {
            format!(" vrf {}", key.vrf())
        },
        tag
    )
}

/// Compute the lines moving `key` from (`cur`, `cur_tag`) to (`new`, `tag`)
///
/// All uninstall lines come before all install lines. A tag change
/// re-issues every next-hop since the tag is part of each line; otherwise
/// only next-hops present on one side produce a line.
pub fn static_route_commands(
    key: &RouteKey,
    new: &NextHopSet,
    tag: RouteTag,
    cur: &NextHopSet,
    cur_tag: RouteTag,
) -> Vec<String> {
    let mut uninstall = Vec::new();
    let mut install = Vec::new();

    if tag != cur_tag {
        uninstall.extend(
            cur.iter()
                .map(|nh| build_route_cmd(RouteOp::Uninstall, nh, key, cur_tag)),
        );
        install.extend(
            new.iter()
                .map(|nh| build_route_cmd(RouteOp::Install, nh, key, tag)),
        );
    } else {
        for nh in new.symmetric_difference(cur) {
            if cur.contains(nh) {
                uninstall.push(build_route_cmd(RouteOp::Uninstall, nh, key, tag));
            } else {
                install.push(build_route_cmd(RouteOp::Install, nh, key, tag));
            }
        }
    }

    uninstall.extend(install);
    uninstall
}

fn router_bgp_line(vrf: &str, asn: &str) -> String {
    if vrf == DEFAULT_VRF {
        format!("router bgp {}", asn)
    } else {
        format!("router bgp {} vrf {}", asn, vrf)
    }
}

fn redistribute_block(vrf: &str, asn: &str, negate: bool) -> Vec<String> {
    let mut cmds = vec![router_bgp_line(vrf, asn)];
    for af in ["ipv4", "ipv6"] {
        cmds.push(format!(" address-family {}", af));
        cmds.push(format!(
            "  {}redistribute static route-map {}",
            if negate { "no " } else { "" },
            STATIC_ROUTE_FILTER
        ));
        cmds.push(" exit-address-family".to_string());
    }
    cmds.push("exit".to_string());
    cmds
}

/// Build the sequence enabling static route redistribution for `vrf`
///
/// Defines the route-map matching the advertise tag, then redistributes
/// static routes for both address families through it.
pub fn build_enable_redistribution_cmds(vrf: &str, asn: &str) -> Vec<String> {
    let mut cmds = vec![
        format!("route-map {} permit 10", STATIC_ROUTE_FILTER),
        format!(" match tag {}", RouteTag::Advertise),
    ];
    cmds.extend(redistribute_block(vrf, asn, false));
    cmds
}

/// Build the sequence disabling static route redistribution for `vrf`
pub fn build_disable_redistribution_cmds(vrf: &str, asn: &str) -> Vec<String> {
    let mut cmds = redistribute_block(vrf, asn, true);
    cmds.push(format!("no route-map {}", STATIC_ROUTE_FILTER));
    cmds
}
