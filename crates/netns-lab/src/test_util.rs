//! Environment gating and scratch names for namespace-backed tests.

use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

static NAME_SEQ: AtomicU32 = AtomicU32::new(0);

fn runs(cmd: &str, args: &[&str]) -> bool {
    Command::new(cmd)
        .args(args)
        .output()
        .is_ok_and(|o| o.status.success())
}

/// True when this environment can host an emulated lab: `ip netns` must work
/// and `sudo` must run it without prompting. Every namespace test calls this
/// first and skips with a reason when it fails.
pub fn check_privileges() -> bool {
    runs("ip", &["netns", "list"]) && runs("sudo", &["-n", "ip", "netns", "list"])
}

/// Short unique name for a scratch namespace or veth interface:
/// `<prefix>_<pid hex>_<seq>`, clipped to the 15-character netdev limit so
/// the same helper serves both.
pub fn unique_ns_name(prefix: &str) -> String {
    let seq = NAME_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = format!("{prefix}_{:x}_{seq}", std::process::id() % 0xffff);
    name.truncate(15);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_short() {
        let a = unique_ns_name("lab");
        let b = unique_ns_name("lab");
        assert_ne!(a, b);
        assert!(a.len() <= 15);
        assert!(b.len() <= 15);
    }

    #[test]
    fn names_keep_their_prefix() {
        assert!(unique_ns_name("rt").starts_with("rt_"));
        // Oversized prefixes are clipped, not rejected
        assert_eq!(unique_ns_name("a_very_long_lab_prefix").len(), 15);
    }
}
