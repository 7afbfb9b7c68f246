//! Operational metric collectors.
//!
//! Each collector shells out to a standard diagnostic tool, parses its text
//! output, and prints one block to stdout between literal
//! `--- METRIC_<NAME>_START ---` / `--- METRIC_<NAME>_END ---` markers. The
//! markers are the only structured output contract of the lab; everything
//! inside a block is human-readable.

use anyhow::Result;

use crate::topology::Lab;

pub mod convergence;
pub mod overhead;
pub mod path_trace;
pub mod routes;
pub mod throughput;

/// Print one delimited metric block.
pub fn print_metric_block(name: &str, body: &str) {
    println!("--- METRIC_{name}_START ---");
    println!("{}", body.trim_end());
    println!("--- METRIC_{name}_END ---");
}

/// Run every collector in order. Convergence runs first because the other
/// probes are meaningless on a partially converged network.
pub fn collect_all(lab: &Lab) -> Result<()> {
    convergence::report(lab);
    throughput::report(lab)?;
    routes::report(lab)?;
    path_trace::report(lab)?;
    overhead::report(lab);
    Ok(())
}
