//! Managed child processes inside namespaces and readiness polling.
//!
//! Daemons that detach themselves (e.g. `zebra -d`) are launched with plain
//! [`Namespace::exec_checked`]; [`NamespaceProcess`] is for foreground tools
//! that must be killed by the lab (e.g. an `iperf` server).

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

use crate::namespace::Namespace;

/// A child process running inside a network namespace.
///
/// Captures stdout+stderr and kills the process on drop.
pub struct NamespaceProcess {
    child: Child,
    label: String,
}

impl NamespaceProcess {
    /// Spawn `binary args...` inside `ns` via `sudo ip netns exec`.
    pub fn spawn(ns: &Namespace, binary: &str, args: &[&str]) -> Result<Self> {
        let label = format!("{binary} in ns:{}", ns.name);
        let child = Command::new("sudo")
            .args(["ip", "netns", "exec", &ns.name, binary])
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {label}"))?;

        tracing::debug!(%label, pid = child.id(), "spawned namespace process");
        Ok(Self { child, label })
    }

    /// Read all captured stdout lines. Only meaningful after the process
    /// has exited.
    pub fn stdout_lines(&mut self) -> Vec<String> {
        match self.child.stdout.take() {
            Some(stdout) => BufReader::new(stdout)
                .lines()
                .map_while(|l| l.ok())
                .collect(),
            None => vec![],
        }
    }

    /// Read all captured stderr lines. Only meaningful after exit.
    pub fn stderr_lines(&mut self) -> Vec<String> {
        match self.child.stderr.take() {
            Some(stderr) => BufReader::new(stderr)
                .lines()
                .map_while(|l| l.ok())
                .collect(),
            None => vec![],
        }
    }

    /// Check if the process is still running.
    pub fn is_alive(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }

    /// If the process has exited, return its exit code and stderr.
    /// Returns `None` if still running.
    pub fn check_exit(&mut self) -> Option<(Option<i32>, String)> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                let stderr = self.stderr_lines().join("\n");
                Some((status.code(), stderr))
            }
            _ => None,
        }
    }

    /// Send SIGTERM, wait briefly, then SIGKILL if needed.
    ///
    /// Signals the entire process group (negative PID) so the inner process
    /// receives the signal even when wrapped by `sudo ip netns exec`.
    pub fn kill(&mut self) {
        let pid = self.child.id();
        let _ = Command::new("sudo")
            .args(["kill", "-TERM", "--", &format!("-{pid}")])
            .output();

        if self.child.try_wait().ok().flatten().is_some() {
            return;
        }
        std::thread::sleep(Duration::from_secs(2));
        if self.child.try_wait().ok().flatten().is_some() {
            return;
        }

        tracing::debug!(label = self.label, "force-killing process group");
        let _ = Command::new("sudo")
            .args(["kill", "-9", "--", &format!("-{pid}")])
            .output();
        let _ = self.child.wait();
    }
}

impl Drop for NamespaceProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

/// True when any `ss -tln` line has `port` in its local-address column.
///
/// Compares the token after the last `:` of the column, so port 5001 does
/// not match a listener on 50012.
fn ss_output_has_port(ss_output: &str, port: u16) -> bool {
    let port = port.to_string();
    ss_output.lines().any(|line| {
        line.split_whitespace()
            .nth(3)
            .and_then(|local| local.rsplit(':').next())
            .is_some_and(|p| p == port)
    })
}

/// Poll `ss -tln` inside `ns` until `port` appears as a TCP listener.
pub fn wait_for_tcp_listener(ns: &Namespace, port: u16, timeout: Duration) -> Result<()> {
    let start = Instant::now();
    let mut last_ss_output;

    loop {
        let out = ns.exec("ss", &["-tln"])?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        if ss_output_has_port(&stdout, port) {
            return Ok(());
        }
        last_ss_output = stdout.to_string();

        if start.elapsed() > timeout {
            bail!(
                "timeout waiting for TCP listener on port {port} in ns {}\nlast ss -tln \
                 output:\n{last_ss_output}",
                ns.name
            );
        }
        std::thread::sleep(Duration::from_millis(200));
    }
}

/// Poll until `path` exists on the filesystem.
///
/// Used for daemon control sockets and PID files that signal readiness.
pub fn wait_for_path(path: &Path, timeout: Duration) -> Result<()> {
    let start = Instant::now();
    loop {
        if path.exists() {
            return Ok(());
        }
        if start.elapsed() > timeout {
            bail!("timeout waiting for '{}' to appear", path.display());
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Check if a binary exists in PATH.
pub fn check_binary(name: &str) -> Option<PathBuf> {
    Command::new("sh")
        .args(["-c", &format!("command -v {name}")])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| PathBuf::from(String::from_utf8_lossy(&o.stdout).trim().to_string()))
}
