//! Routing-table size per router.
//!
//! Counts `ip route` lines carrying a gateway (` via `) or link-local
//! (`scope link`) marker. Pure line counting; no semantic route parsing.

use anyhow::{Context, Result};

use crate::metrics::print_metric_block;
use crate::topology::Lab;

/// Number of lines in an `ip route` dump that describe installed routes.
pub fn count_route_lines(dump: &str) -> usize {
    dump.lines()
        .filter(|line| line.contains(" via ") || line.contains("scope link"))
        .count()
}

/// Per-router route counts, in topology order.
pub fn collect(lab: &Lab) -> Result<Vec<(String, usize)>> {
    lab.routers
        .iter()
        .map(|router| {
            let out = router
                .ns
                .exec_checked("ip", &["route"])
                .with_context(|| format!("dump routes on {}", router.name))?;
            let dump = String::from_utf8_lossy(&out.stdout);
            Ok((router.name.clone(), count_route_lines(&dump)))
        })
        .collect()
}

pub fn report(lab: &Lab) -> Result<()> {
    let counts = collect(lab)?;
    let total: usize = counts.iter().map(|(_, n)| n).sum();

    let mut body = String::new();
    for (router, count) in &counts {
        body.push_str(&format!("{router}: {count} routes\n"));
    }
    body.push_str(&format!("total: {total} routes"));
    print_metric_block("ROUTING_TABLE_SIZE", &body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_gateway_and_link_routes() {
        let dump = "\
default via 172.16.1.1 dev pc1-r1
10.0.12.0/24 dev r1-r2 proto kernel scope link src 10.0.12.1
10.0.23.0/24 via 10.0.12.2 dev r1-r2 proto zebra metric 20
10.0.13.0/24 dev r1-r3 proto kernel scope link src 10.0.13.1
broadcast 10.0.12.255 dev r1-r2 table local
";
        // broadcast line has neither marker
        assert_eq!(count_route_lines(dump), 4);
    }

    #[test]
    fn empty_dump_counts_zero() {
        assert_eq!(count_route_lines(""), 0);
        assert_eq!(count_route_lines("unreachable 10.9.9.0/24\n"), 0);
    }

    #[test]
    fn count_matches_marker_lines_exactly() {
        let dump = "a via b\nc via d\nscope link here\nnothing\n";
        assert_eq!(count_route_lines(dump), 3);
    }
}
