//! Topology bring-up integration tests.
//!
//! Builds the full five-router lab (no daemons) and validates direct-link
//! connectivity, shaped delay, and PC default routes. Runs only with
//! passwordless sudo; otherwise skips with a reason.

mod common;

use ospflab::topology::{Lab, ROUTER_LINKS};

fn parse_ping_rtt(output: &str) -> Option<f32> {
    output.lines().find_map(|line| {
        let rest = line.split("time=").nth(1)?;
        let num = rest.split_whitespace().next()?;
        num.parse().ok()
    })
}

// Single test for the whole lab: namespace names are fixed (r1..r5, pc1, pc2),
// so concurrent builds would clobber each other.
#[test]
fn lab_bring_up_and_direct_links() {
    if common::skip_without_deps() {
        return;
    }

    let lab = Lab::build().expect("build lab");

    // Every node is addressable for the convergence sweep
    let nodes = lab.node_addresses();
    assert_eq!(nodes.len(), 7, "5 routers + 2 PCs");

    // Directly connected neighbors reach each other without any routing daemon
    for (src, dst, subnet, _, _) in ROUTER_LINKS {
        let dst_addr = subnet.replace("0/24", "2");
        let src_ns = lab.namespace(src).expect("src namespace");
        let out = src_ns
            .exec("ping", &["-c", "1", "-W", "2", &dst_addr])
            .expect("ping");
        assert!(
            out.status.success(),
            "{src} cannot reach {dst} at {dst_addr}"
        );
    }

    // PCs reach their gateway via the default route
    for pc in &lab.pcs {
        let out = pc
            .ns
            .exec("ping", &["-c", "1", "-W", "2", &pc.gateway])
            .expect("ping gateway");
        assert!(out.status.success(), "{} cannot reach gateway", pc.name);
    }

    // The r2-r5 link carries 7 ms each way; RTT must reflect it
    let r2 = lab.namespace("r2").expect("r2 namespace");
    let out = r2
        .exec("ping", &["-c", "3", "-i", "0.2", "10.0.25.2"])
        .expect("ping r5");
    if out.status.success() {
        let stdout = String::from_utf8_lossy(&out.stdout);
        if let Some(rtt) = parse_ping_rtt(&stdout) {
            assert!(rtt >= 12.0, "RTT {rtt}ms below shaped 2x7ms delay");
        }
    }
}
