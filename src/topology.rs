//! The emulated topology: five routers, two end hosts.
//!
//! Mirrors the topology used by the intent-aware OSPF experiments. Routers
//! are connected pairwise by shaped veth links; each PC hangs off an edge
//! router and routes everything through it.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use netns_lab::{LinkProfile, Namespace, shape_interface};
use tracing::info;

/// Inter-router links: (src, dst, subnet, delay in ms, bandwidth in Mbit/s).
pub const ROUTER_LINKS: [(&str, &str, &str, u32, u64); 6] = [
    ("r1", "r2", "10.0.12.0/24", 5, 100),
    ("r1", "r3", "10.0.13.0/24", 2, 10),
    ("r2", "r3", "10.0.23.0/24", 5, 50),
    ("r2", "r5", "10.0.25.0/24", 7, 80),
    ("r3", "r4", "10.0.34.0/24", 1, 200),
    ("r4", "r5", "10.0.45.0/24", 3, 150),
];

pub const ROUTER_NAMES: [&str; 5] = ["r1", "r2", "r3", "r4", "r5"];

/// Host edges: (pc, router, pc address, router-side address).
pub const PC_LINKS: [(&str, &str, &str, &str); 2] = [
    ("pc1", "r1", "172.16.1.10/24", "172.16.1.1/24"),
    ("pc2", "r5", "172.16.5.10/24", "172.16.5.1/24"),
];

/// Derive the two endpoint addresses of a router link from its subnet.
///
/// `a.b.c.0/24` becomes `a.b.c.1/24` for the source end and `a.b.c.2/24` for
/// the destination end. Pure string substitution; malformed subnets are not
/// detected.
pub fn endpoint_addrs(subnet: &str) -> (String, String) {
    (
        subnet.replace("0/24", "1/24"),
        subnet.replace("0/24", "2/24"),
    )
}

/// Address without its prefix length, e.g. `10.0.12.1/24` -> `10.0.12.1`.
fn host_part(cidr: &str) -> String {
    cidr.split('/').next().unwrap_or(cidr).to_string()
}

/// An emulated router: a namespace accumulating one address per link.
pub struct Router {
    pub name: String,
    pub ns: Namespace,
    /// Link addresses in creation order, without prefix length. The first
    /// one doubles as the router's identity for reachability probes.
    pub addresses: Vec<String>,
}

/// An end host with a single address and a default route.
pub struct Pc {
    pub name: String,
    pub ns: Namespace,
    pub addr: String,
    pub gateway: String,
}

/// The running emulated network. Owns every namespace; dropping the lab
/// deletes them all.
pub struct Lab {
    pub routers: Vec<Router>,
    pub pcs: Vec<Pc>,
    started: Instant,
}

impl Lab {
    /// Create all namespaces, links, addresses, and default routes.
    pub fn build() -> Result<Self> {
        info!("creating router namespaces");
        let mut routers = Vec::with_capacity(ROUTER_NAMES.len());
        for name in ROUTER_NAMES {
            routers.push(Router {
                name: name.to_string(),
                ns: Namespace::new(name)?,
                addresses: Vec::new(),
            });
        }

        info!("creating PC namespaces");
        let mut pcs = Vec::with_capacity(PC_LINKS.len());
        for (pc, _, addr, gateway) in PC_LINKS {
            pcs.push(Pc {
                name: pc.to_string(),
                ns: Namespace::new(pc)?,
                addr: host_part(addr),
                gateway: host_part(gateway),
            });
        }

        info!("creating inter-router links");
        for (src, dst, subnet, delay_ms, rate_mbit) in ROUTER_LINKS {
            let (src_addr, dst_addr) = endpoint_addrs(subnet);
            let src_iface = format!("{src}-{dst}");
            let dst_iface = format!("{dst}-{src}");

            let si = router_index(&routers, src)?;
            let di = router_index(&routers, dst)?;

            routers[si]
                .ns
                .link_to(&routers[di].ns, &src_iface, &dst_iface, &src_addr, &dst_addr)
                .with_context(|| format!("link {src} <-> {dst} on {subnet}"))?;

            let profile = LinkProfile::new(delay_ms, rate_mbit);
            shape_interface(&routers[si].ns, &src_iface, profile)
                .with_context(|| format!("shape {src_iface}"))?;
            shape_interface(&routers[di].ns, &dst_iface, profile)
                .with_context(|| format!("shape {dst_iface}"))?;

            routers[si].addresses.push(host_part(&src_addr));
            routers[di].addresses.push(host_part(&dst_addr));
        }

        info!("creating PC edge links");
        for (i, (pc, router, pc_addr, router_addr)) in PC_LINKS.iter().enumerate() {
            let ri = router_index(&routers, router)?;
            let pc_iface = format!("{pc}-{router}");
            let router_iface = format!("{router}-{pc}");

            pcs[i]
                .ns
                .link_to(
                    &routers[ri].ns,
                    &pc_iface,
                    &router_iface,
                    pc_addr,
                    router_addr,
                )
                .with_context(|| format!("link {pc} <-> {router}"))?;

            routers[ri].addresses.push(host_part(router_addr));
        }

        info!("installing PC default routes");
        for pc in &pcs {
            pc.ns.set_default_route(&pc.gateway)?;
        }

        Ok(Self {
            routers,
            pcs,
            started: Instant::now(),
        })
    }

    /// Every node with the address used to probe it: routers by their first
    /// link address, PCs by their host address.
    pub fn node_addresses(&self) -> Vec<(String, String)> {
        let mut nodes: Vec<(String, String)> = self
            .routers
            .iter()
            .filter(|r| !r.addresses.is_empty())
            .map(|r| (r.name.clone(), r.addresses[0].clone()))
            .collect();
        nodes.extend(self.pcs.iter().map(|pc| (pc.name.clone(), pc.addr.clone())));
        nodes
    }

    /// Look up a node's namespace by name (router or PC).
    pub fn namespace(&self, node: &str) -> Option<&Namespace> {
        self.routers
            .iter()
            .find(|r| r.name == node)
            .map(|r| &r.ns)
            .or_else(|| self.pcs.iter().find(|p| p.name == node).map(|p| &p.ns))
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.routers
            .iter()
            .map(|r| r.name.as_str())
            .chain(self.pcs.iter().map(|p| p.name.as_str()))
            .collect()
    }

    /// Wall-clock time since the network came up.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

fn router_index(routers: &[Router], name: &str) -> Result<usize> {
    routers
        .iter()
        .position(|r| r.name == name)
        .with_context(|| format!("unknown router '{name}' in link table"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_addrs_substitutes_last_octet() {
        let (src, dst) = endpoint_addrs("10.0.12.0/24");
        assert_eq!(src, "10.0.12.1/24");
        assert_eq!(dst, "10.0.12.2/24");
    }

    #[test]
    fn endpoint_addrs_for_whole_table() {
        for (_, _, subnet, _, _) in ROUTER_LINKS {
            let (src, dst) = endpoint_addrs(subnet);
            assert!(src.ends_with(".1/24"), "src {src}");
            assert!(dst.ends_with(".2/24"), "dst {dst}");
            assert_eq!(&src[..src.len() - 4], &subnet[..subnet.len() - 4]);
        }
    }

    #[test]
    fn host_part_strips_prefix() {
        assert_eq!(host_part("172.16.1.10/24"), "172.16.1.10");
        assert_eq!(host_part("10.0.45.2"), "10.0.45.2");
    }

    #[test]
    fn link_table_references_known_routers() {
        for (src, dst, _, _, _) in ROUTER_LINKS {
            assert!(ROUTER_NAMES.contains(&src));
            assert!(ROUTER_NAMES.contains(&dst));
        }
        for (_, router, _, _) in PC_LINKS {
            assert!(ROUTER_NAMES.contains(&router));
        }
    }
}
