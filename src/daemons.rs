//! Quagga daemon lifecycle: one zebra + one ospfd per router.
//!
//! Both daemons of a router share the zebra API socket at
//! `/tmp/zebra_<router>.api`; ospfd connects to it at startup, so zebra must
//! be up first. Instead of a fixed stagger, the launcher polls for the socket
//! path with a bounded deadline and degrades to a warning on timeout.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use netns_lab::{exec_in, sudo, wait_for_path};
use tracing::{info, warn};

use crate::topology::Router;

/// How long to wait for zebra's API socket before starting ospfd anyway.
const ZEBRA_SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the daemon binaries and per-router configs live.
#[derive(Debug, Clone)]
pub struct QuaggaPaths {
    /// Root of the per-router config tree: `<config_dir>/<router>/{zebra.conf,ospfd.conf}`.
    pub config_dir: PathBuf,
    pub zebra_bin: String,
    pub ospfd_bin: String,
}

impl QuaggaPaths {
    pub fn zebra_conf(&self, router: &str) -> PathBuf {
        self.config_dir.join(router).join("zebra.conf")
    }

    pub fn ospfd_conf(&self, router: &str) -> PathBuf {
        self.config_dir.join(router).join("ospfd.conf")
    }

    /// Zebra API socket shared by both daemons of `router`.
    pub fn api_socket(router: &str) -> PathBuf {
        PathBuf::from(format!("/tmp/zebra_{router}.api"))
    }

    pub fn zebra_pid(router: &str) -> PathBuf {
        PathBuf::from(format!("/tmp/zebra_{router}.pid"))
    }

    pub fn ospfd_pid(router: &str) -> PathBuf {
        PathBuf::from(format!("/tmp/ospfd_{router}.pid"))
    }

    /// Log file ospfd is configured to write (consumed by the log scanner).
    pub fn ospfd_log(router: &str) -> PathBuf {
        PathBuf::from(format!("/tmp/{router}-ospfd.log"))
    }
}

/// The set of launched daemons. Dropping it kills them all.
pub struct QuaggaSet {
    paths: QuaggaPaths,
    launched: Vec<String>,
}

impl QuaggaSet {
    /// Enable forwarding and start zebra + ospfd on every router.
    ///
    /// On error the partially launched set is dropped, which stops whatever
    /// already came up.
    pub fn launch(paths: QuaggaPaths, routers: &[Router]) -> Result<Self> {
        let mut set = Self {
            paths,
            launched: Vec::with_capacity(routers.len()),
        };
        for router in routers {
            set.launch_router(router)?;
        }
        Ok(set)
    }

    fn launch_router(&mut self, router: &Router) -> Result<()> {
        let name = &router.name;
        info!(router = %name, "starting Quagga daemons");

        router.ns.enable_forwarding()?;

        let zebra_conf = self.paths.zebra_conf(name);
        let ospfd_conf = self.paths.ospfd_conf(name);
        for conf in [&zebra_conf, &ospfd_conf] {
            if !conf.exists() {
                bail!("missing daemon config '{}'", conf.display());
            }
        }

        let api = QuaggaPaths::api_socket(name);
        // Stale sockets and PID files from a previous run confuse the daemons
        for stale in [&api, &QuaggaPaths::zebra_pid(name), &QuaggaPaths::ospfd_pid(name)] {
            let stale = stale.display().to_string();
            let _ = sudo(&["rm", "-f", stale.as_str()]);
        }

        let api_str = api.display().to_string();
        let zebra_conf_str = zebra_conf.display().to_string();
        let zebra_pid_str = QuaggaPaths::zebra_pid(name).display().to_string();
        router
            .ns
            .exec_checked(
                &self.paths.zebra_bin,
                &["-d", "-f", &zebra_conf_str, "-z", &api_str, "-i", &zebra_pid_str],
            )
            .with_context(|| format!("start zebra on {name}"))?;

        // ospfd needs zebra's API socket; poll for it instead of sleeping
        if let Err(err) = wait_for_path(&api, ZEBRA_SOCKET_TIMEOUT) {
            warn!(router = %name, %err, "zebra API socket not observed; starting ospfd anyway");
        }

        let ospfd_conf_str = ospfd_conf.display().to_string();
        let ospfd_pid_str = QuaggaPaths::ospfd_pid(name).display().to_string();
        router
            .ns
            .exec_checked(
                &self.paths.ospfd_bin,
                &["-d", "-f", &ospfd_conf_str, "-z", &api_str, "-i", &ospfd_pid_str],
            )
            .with_context(|| format!("start ospfd on {name}"))?;

        self.launched.push(name.clone());
        Ok(())
    }

    /// Kill all launched daemons. Idempotent; every step is best-effort so a
    /// dead daemon never blocks the rest of teardown.
    pub fn stop(&mut self) {
        for name in self.launched.drain(..) {
            info!(router = %name, "stopping Quagga daemons");

            let mut killed = 0;
            for pid_file in [QuaggaPaths::zebra_pid(&name), QuaggaPaths::ospfd_pid(&name)] {
                if kill_from_pid_file(&pid_file) {
                    killed += 1;
                }
            }
            if killed < 2 {
                // PID files missing or stale: fall back to name-based kill
                let _ = exec_in(&name, "killall", &["zebra"]);
                let _ = exec_in(&name, "killall", &["ospfd"]);
            }

            let api = QuaggaPaths::api_socket(&name).display().to_string();
            let _ = sudo(&["rm", "-f", api.as_str()]);
        }
    }
}

impl Drop for QuaggaSet {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Kill the process named by a daemon PID file. Returns true if a signal
/// was delivered.
fn kill_from_pid_file(pid_file: &std::path::Path) -> bool {
    let Ok(contents) = fs::read_to_string(pid_file) else {
        return false;
    };
    let Ok(pid) = contents.trim().parse::<u32>() else {
        return false;
    };
    let pid = pid.to_string();
    let delivered = sudo(&["kill", pid.as_str()])
        .map(|o| o.status.success())
        .unwrap_or(false);
    let pid_file = pid_file.display().to_string();
    let _ = sudo(&["rm", "-f", pid_file.as_str()]);
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_router_paths_follow_convention() {
        assert_eq!(
            QuaggaPaths::api_socket("r3"),
            PathBuf::from("/tmp/zebra_r3.api")
        );
        assert_eq!(
            QuaggaPaths::zebra_pid("r1"),
            PathBuf::from("/tmp/zebra_r1.pid")
        );
        assert_eq!(
            QuaggaPaths::ospfd_pid("r5"),
            PathBuf::from("/tmp/ospfd_r5.pid")
        );
        assert_eq!(
            QuaggaPaths::ospfd_log("r2"),
            PathBuf::from("/tmp/r2-ospfd.log")
        );
    }

    #[test]
    fn config_paths_nest_under_router_dir() {
        let paths = QuaggaPaths {
            config_dir: PathBuf::from("./quagga_configs"),
            zebra_bin: "/usr/lib/quagga/zebra".into(),
            ospfd_bin: "/usr/lib/quagga/ospfd".into(),
        };
        assert_eq!(
            paths.zebra_conf("r4"),
            PathBuf::from("./quagga_configs/r4/zebra.conf")
        );
        assert_eq!(
            paths.ospfd_conf("r4"),
            PathBuf::from("./quagga_configs/r4/ospfd.conf")
        );
    }

    #[test]
    fn kill_from_missing_pid_file_is_false() {
        assert!(!kill_from_pid_file(std::path::Path::new(
            "/tmp/ospflab_no_such.pid"
        )));
    }
}
