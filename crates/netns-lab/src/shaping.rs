use anyhow::{Result, bail};

use crate::namespace::Namespace;

/// Link characteristics applied to one interface via `tc`.
///
/// Omitted parameters are not passed to `tc`. An all-`None` profile clears
/// any existing qdisc on the interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkProfile {
    /// One-way propagation delay added by netem.
    pub delay_ms: Option<u32>,
    /// Bandwidth cap enforced by a TBF root qdisc.
    pub rate_mbit: Option<u64>,
}

impl LinkProfile {
    pub fn new(delay_ms: u32, rate_mbit: u64) -> Self {
        Self {
            delay_ms: Some(delay_ms),
            rate_mbit: Some(rate_mbit),
        }
    }

    fn is_empty(&self) -> bool {
        self.delay_ms.is_none() && self.rate_mbit.is_none()
    }
}

/// Arguments for the TBF qdisc enforcing `rate_mbit`.
///
/// burst = max(rate_bytes/10, one MTU) so a single full-size frame always
/// fits the bucket.
fn tbf_args(rate_mbit: u64) -> Vec<String> {
    let rate_bytes_per_sec = rate_mbit * 1_000_000 / 8;
    let burst = (rate_bytes_per_sec / 10).max(15_400);
    vec![
        "tbf".into(),
        "rate".into(),
        format!("{rate_mbit}mbit"),
        "burst".into(),
        burst.to_string(),
        "latency".into(),
        "50ms".into(),
    ]
}

fn netem_args(delay_ms: u32) -> Vec<String> {
    vec!["netem".into(), "delay".into(), format!("{delay_ms}ms")]
}

/// Apply `profile` to `iface` inside `ns`.
///
/// Always removes the existing root qdisc first. When both rate and delay are
/// set, TBF is installed as root with netem chained as its child; a lone
/// delay gets netem as root, a lone rate gets TBF as root.
pub fn shape_interface(ns: &Namespace, iface: &str, profile: LinkProfile) -> Result<()> {
    // Always start clean
    let _ = ns.exec("tc", &["qdisc", "del", "dev", iface, "root"]);

    if profile.is_empty() {
        return Ok(());
    }

    if let Some(rate) = profile.rate_mbit {
        let mut args: Vec<String> = ["qdisc", "add", "dev", iface, "root", "handle", "1:"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(tbf_args(rate));
        tc_checked(ns, &args, "install tbf root qdisc")?;

        if let Some(delay) = profile.delay_ms {
            let mut args: Vec<String> =
                ["qdisc", "add", "dev", iface, "parent", "1:1", "handle", "10:"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
            args.extend(netem_args(delay));
            tc_checked(ns, &args, "install netem child qdisc")?;
        }
    } else if let Some(delay) = profile.delay_ms {
        let mut args: Vec<String> = ["qdisc", "add", "dev", iface, "root"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(netem_args(delay));
        tc_checked(ns, &args, "install netem root qdisc")?;
    }

    Ok(())
}

/// Run `tc` inside `ns`, bailing with stderr and the full command on failure.
fn tc_checked(ns: &Namespace, args: &[String], ctx: &str) -> Result<()> {
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let output = ns.exec("tc", &arg_refs)?;
    if !output.status.success() {
        bail!(
            "{ctx}: tc {}\n{}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
