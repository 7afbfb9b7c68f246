//! Convergence detection: bounded polling of an all-pairs reachability sweep.
//!
//! Each attempt pings every distinct unordered node pair once. The sweep is
//! fail-fast: the first unreachable pair aborts it, since the poller only
//! needs a boolean "fully converged yet?" signal, not a complete failure
//! report. An echo reply proves the pair reachable in both directions.

use std::time::Duration;

use tracing::{info, warn};

use crate::metrics::print_metric_block;
use crate::topology::Lab;

pub const MAX_ATTEMPTS: usize = 120;
pub const ATTEMPT_INTERVAL: Duration = Duration::from_millis(500);

/// One full sweep over every distinct unordered pair of `nodes`
/// (`(name, address)` tuples). `probe(src_name, dst_addr)` reports whether
/// `dst_addr` answers a single ping sent from `src_name`'s namespace.
///
/// Returns false on the first failing pair.
pub fn sweep_all_pairs<F>(nodes: &[(String, String)], mut probe: F) -> bool
where
    F: FnMut(&str, &str) -> bool,
{
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if !probe(&nodes[i].0, &nodes[j].1) {
                return false;
            }
        }
    }
    true
}

/// Repeat the sweep up to `max_attempts` times, `interval` apart, stopping at
/// the first fully successful one. Returns the number of attempts used, or
/// `None` if the budget was exhausted.
pub fn poll<F>(
    nodes: &[(String, String)],
    max_attempts: usize,
    interval: Duration,
    mut probe: F,
) -> Option<usize>
where
    F: FnMut(&str, &str) -> bool,
{
    for attempt in 1..=max_attempts {
        if sweep_all_pairs(nodes, &mut probe) {
            return Some(attempt);
        }
        if attempt < max_attempts {
            std::thread::sleep(interval);
        }
    }
    None
}

/// Result of a successful convergence measurement.
pub struct Convergence {
    pub elapsed: Duration,
    pub attempts: usize,
}

/// Poll the live lab until every node pair is mutually reachable.
pub fn measure(lab: &Lab) -> Option<Convergence> {
    let nodes = lab.node_addresses();
    info!(
        nodes = nodes.len(),
        "polling for OSPF convergence (all-pairs ping)"
    );

    let attempts = poll(&nodes, MAX_ATTEMPTS, ATTEMPT_INTERVAL, |src, dst| {
        ping_once(lab, src, dst)
    })?;

    Some(Convergence {
        elapsed: lab.elapsed(),
        attempts,
    })
}

pub fn report(lab: &Lab) {
    match measure(lab) {
        Some(conv) => {
            let body = format!(
                "converged:  yes\nelapsed:    {:.2} s\nattempts:   {}",
                conv.elapsed.as_secs_f64(),
                conv.attempts
            );
            print_metric_block("CONVERGENCE_TIME", &body);
        }
        None => {
            warn!(
                attempts = MAX_ATTEMPTS,
                "network did not converge within the attempt budget; metric omitted"
            );
        }
    }
}

/// Single-packet ping with a 1 s reply deadline.
fn ping_once(lab: &Lab, src: &str, dst_addr: &str) -> bool {
    let Some(ns) = lab.namespace(src) else {
        return false;
    };
    ns.exec("ping", &["-c", "1", "-W", "1", dst_addr])
        .map(|out| out.status.success())
        .unwrap_or(false)
}
