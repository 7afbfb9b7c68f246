//! Preflight checks: every external collaborator must exist before a single
//! namespace is created, so a missing tool fails the run up front instead of
//! mid-collection.

use std::fmt;
use std::path::Path;

use anyhow::{Result, bail};
use netns_lab::{check_binary, check_privileges};

use crate::daemons::QuaggaPaths;

/// System tools the lab shells out to.
const REQUIRED_TOOLS: [&str; 7] = ["ip", "tc", "sysctl", "ping", "iperf", "traceroute", "ss"];

/// Why the lab cannot run in this environment.
#[derive(Debug)]
pub enum Missing {
    Privileges,
    Tool(String),
    DaemonBinary(String),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Privileges => write!(f, "requires root / passwordless sudo"),
            Missing::Tool(t) => write!(f, "system tool '{t}' not found in PATH"),
            Missing::DaemonBinary(b) => write!(f, "daemon binary '{b}' not found"),
        }
    }
}

/// Check privileges, diagnostic tools, and daemon binaries.
pub fn check(paths: &QuaggaPaths) -> Result<()> {
    let mut missing = Vec::new();

    if !check_privileges() {
        missing.push(Missing::Privileges);
    }

    for tool in REQUIRED_TOOLS {
        if check_binary(tool).is_none() {
            missing.push(Missing::Tool(tool.to_string()));
        }
    }

    for bin in [&paths.zebra_bin, &paths.ospfd_bin] {
        if !daemon_binary_exists(bin) {
            missing.push(Missing::DaemonBinary(bin.clone()));
        }
    }

    if !missing.is_empty() {
        let lines: Vec<String> = missing.iter().map(|m| format!("  - {m}")).collect();
        bail!("environment not ready:\n{}", lines.join("\n"));
    }
    Ok(())
}

/// Daemon binaries may be given as absolute paths (the Quagga packaging
/// convention, `/usr/lib/quagga/...`) or bare names resolved via PATH.
fn daemon_binary_exists(bin: &str) -> bool {
    if bin.contains('/') {
        Path::new(bin).exists()
    } else {
        check_binary(bin).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_messages_name_the_culprit() {
        assert_eq!(
            Missing::Tool("iperf".into()).to_string(),
            "system tool 'iperf' not found in PATH"
        );
        assert!(
            Missing::DaemonBinary("/usr/lib/quagga/ospfd".into())
                .to_string()
                .contains("/usr/lib/quagga/ospfd")
        );
    }

    #[test]
    fn bare_name_resolution_uses_path_lookup() {
        assert!(daemon_binary_exists("sh"));
        assert!(!daemon_binary_exists("no-such-daemon-42"));
        assert!(!daemon_binary_exists("/no/such/dir/ospfd"));
    }
}
