//! Shared utilities for integration tests.
#![allow(dead_code)]

use netns_lab::{check_binary, check_privileges};

/// Check namespace privileges and the tools topology bring-up needs.
/// Returns `true` if tests should be skipped (prints the reason to stderr).
/// Use at the top of every test.
pub fn skip_without_deps() -> bool {
    if !check_privileges() {
        eprintln!("Skipping: requires root / passwordless sudo");
        return true;
    }
    for tool in ["ip", "tc", "ping"] {
        if check_binary(tool).is_none() {
            eprintln!("Skipping: system tool '{tool}' not found");
            return true;
        }
    }
    false
}
