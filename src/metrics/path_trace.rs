//! Forwarding path between the two PCs.
//!
//! Runs a numeric-only traceroute (no DNS) from pc1 to pc2 and reports the
//! tool's output verbatim.

use anyhow::{Context, Result, bail};

use crate::metrics::print_metric_block;
use crate::topology::Lab;

pub fn trace(lab: &Lab) -> Result<String> {
    let [pc1, pc2] = lab.pcs.as_slice() else {
        bail!("expected exactly two PCs in the lab");
    };

    let out = pc1
        .ns
        .exec_checked("traceroute", &["-n", &pc2.addr])
        .with_context(|| format!("traceroute {} -> {}", pc1.name, pc2.name))?;
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

pub fn report(lab: &Lab) -> Result<()> {
    let output = trace(lab)?;
    print_metric_block("PATH_TRACE", &output);
    Ok(())
}
