use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use tracing::debug;

/// A Linux network namespace acting as one emulated node.
///
/// Creates the namespace on construction, brings up loopback, and deletes it
/// on drop. All commands inside the namespace run via `sudo ip netns exec`.
pub struct Namespace {
    pub name: String,
}

impl Namespace {
    pub fn new(name: &str) -> Result<Self> {
        // Clean up stale namespace with same name (idempotent)
        let _ = sudo(&["ip", "netns", "del", name]);

        sudo_checked(&["ip", "netns", "add", name])
            .with_context(|| format!("create netns '{name}'"))?;

        debug!(ns = name, "created network namespace");

        // Loopback — best-effort, failure is non-fatal
        let _ = sudo(&["ip", "netns", "exec", name, "ip", "link", "set", "lo", "up"]);

        Ok(Self {
            name: name.to_string(),
        })
    }

    /// Run a command inside this namespace, returning raw output.
    pub fn exec(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        exec_in(&self.name, cmd, args)
    }

    /// Run a command inside this namespace, failing if it exits non-zero.
    pub fn exec_checked(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let output = self.exec(cmd, args)?;
        if !output.status.success() {
            bail!(
                "'{cmd} {}' failed in ns '{}':\n{}",
                args.join(" "),
                self.name,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }

    /// Create a veth pair connecting this namespace to `peer`.
    ///
    /// Each end gets a CIDR address assigned and is brought up.
    /// Interface names must be <= 15 chars (Linux limit).
    pub fn link_to(
        &self,
        peer: &Namespace,
        local_iface: &str,
        peer_iface: &str,
        local_addr: &str,
        peer_addr: &str,
    ) -> Result<()> {
        // Clean up stale veth (idempotent)
        let _ = sudo(&["ip", "link", "del", local_iface]);

        // Create the pair in the host namespace, then move each end in
        sudo_checked(&[
            "ip", "link", "add", local_iface, "type", "veth", "peer", "name", peer_iface,
        ])
        .context("create veth pair")?;

        sudo_checked(&["ip", "link", "set", local_iface, "netns", &self.name])
            .context("move local veth end")?;
        sudo_checked(&["ip", "link", "set", peer_iface, "netns", &peer.name])
            .context("move peer veth end")?;

        self.exec_checked("ip", &["addr", "add", local_addr, "dev", local_iface])
            .context("assign local address")?;
        self.exec_checked("ip", &["link", "set", local_iface, "up"])
            .context("bring local end up")?;

        peer.exec_checked("ip", &["addr", "add", peer_addr, "dev", peer_iface])
            .context("assign peer address")?;
        peer.exec_checked("ip", &["link", "set", peer_iface, "up"])
            .context("bring peer end up")?;

        debug!(
            ns_local = self.name,
            ns_peer = peer.name,
            local_addr,
            peer_addr,
            "veth link configured"
        );

        Ok(())
    }

    /// Install a default route via `gateway` inside this namespace.
    pub fn set_default_route(&self, gateway: &str) -> Result<()> {
        self.exec_checked("ip", &["route", "add", "default", "via", gateway])
            .with_context(|| format!("set default route via {gateway} in ns '{}'", self.name))?;
        Ok(())
    }

    /// Enable IPv4 forwarding inside this namespace (idempotent).
    pub fn enable_forwarding(&self) -> Result<()> {
        self.exec_checked("sysctl", &["-w", "net.ipv4.ip_forward=1"])
            .with_context(|| format!("enable ip_forward in ns '{}'", self.name))?;
        Ok(())
    }
}

impl Drop for Namespace {
    fn drop(&mut self) {
        debug!(ns = self.name, "deleting network namespace");
        let _ = sudo(&["ip", "netns", "del", &self.name]);
    }
}

/// Run a command inside a namespace identified by name only.
///
/// Used where a handle to the owning [`Namespace`] is not available, e.g.
/// daemon teardown that must not borrow the topology.
pub fn exec_in(ns: &str, cmd: &str, args: &[&str]) -> Result<Output> {
    let mut full_args = vec!["ip", "netns", "exec", ns, cmd];
    full_args.extend_from_slice(args);
    sudo(&full_args).with_context(|| format!("exec '{cmd}' in ns '{ns}'"))
}

/// Run `sudo <args>`, returning raw output.
pub fn sudo(args: &[&str]) -> Result<Output> {
    Command::new("sudo")
        .args(args)
        .output()
        .with_context(|| format!("sudo {}", args.join(" ")))
}

/// Run `sudo <args>`, returning output on success or bailing with stderr.
pub fn sudo_checked(args: &[&str]) -> Result<Output> {
    let output = sudo(args)?;
    if !output.status.success() {
        bail!(
            "command failed: sudo {}\n{}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{check_privileges, unique_ns_name};

    #[test]
    fn namespace_has_loopback() {
        if !check_privileges() {
            eprintln!("Skipping: insufficient privileges");
            return;
        }

        let ns = Namespace::new(&unique_ns_name("nl_lo")).expect("create ns");
        let out = ns.exec("ip", &["link"]).expect("ip link");
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.contains("lo"), "loopback missing: {stdout}");
    }

    #[test]
    fn linked_namespaces_can_ping() {
        if !check_privileges() {
            eprintln!("Skipping: insufficient privileges");
            return;
        }

        let a = Namespace::new(&unique_ns_name("nl_a")).expect("create a");
        let b = Namespace::new(&unique_ns_name("nl_b")).expect("create b");

        let id = std::process::id() % 100_000;
        let ia = format!("la_{id}");
        let ib = format!("lb_{id}");

        a.link_to(&b, &ia, &ib, "10.199.1.1/24", "10.199.1.2/24")
            .expect("link namespaces");

        let out = a
            .exec("ping", &["-c", "1", "-W", "1", "10.199.1.2"])
            .expect("ping");
        assert!(
            out.status.success(),
            "ping failed:\n{}",
            String::from_utf8_lossy(&out.stderr)
        );
    }

    #[test]
    fn default_route_installed() {
        if !check_privileges() {
            eprintln!("Skipping: insufficient privileges");
            return;
        }

        let a = Namespace::new(&unique_ns_name("nl_rt")).expect("create a");
        let b = Namespace::new(&unique_ns_name("nl_gw")).expect("create b");

        let id = std::process::id() % 100_000;
        a.link_to(
            &b,
            &format!("ra_{id}"),
            &format!("rb_{id}"),
            "10.199.2.1/24",
            "10.199.2.2/24",
        )
        .expect("link namespaces");

        a.set_default_route("10.199.2.2").expect("default route");

        let out = a.exec("ip", &["route"]).expect("ip route");
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(
            stdout.contains("default via 10.199.2.2"),
            "no default route: {stdout}"
        );
    }
}
