//! Network emulation building blocks for routing labs.
//!
//! Uses Linux network namespaces as emulated nodes, veth pairs as links, and
//! `tc netem`/`tbf` for per-link delay and bandwidth. Routing daemons and
//! diagnostic tools run inside the namespaces as ordinary child processes.
//!
//! # Modules
//!
//! - [`namespace`]: Namespace and veth link management (RAII cleanup on drop)
//! - [`shaping`]: per-interface delay/bandwidth profiles via `tc`
//! - [`process`]: managed child processes inside namespaces, readiness polling
//! - [`test_util`]: privilege checks and unique name generation for tests

pub mod namespace;
pub mod process;
pub mod shaping;
pub mod test_util;

pub use namespace::{Namespace, exec_in, sudo};
pub use process::{NamespaceProcess, check_binary, wait_for_path, wait_for_tcp_listener};
pub use shaping::{LinkProfile, shape_interface};
pub use test_util::{check_privileges, unique_ns_name};
