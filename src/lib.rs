//! OSPF lab on Linux network namespaces.
//!
//! Provisions the five-router / two-host topology used by the intent-aware
//! OSPF experiments, launches a Quagga daemon pair (zebra + ospfd) per router,
//! and collects operational metrics by shelling out to standard diagnostic
//! tools and parsing their text output.
//!
//! Metric blocks are printed to stdout between literal
//! `--- METRIC_<NAME>_START ---` / `--- METRIC_<NAME>_END ---` markers so an
//! external scraper can cut them out of the run log.

// Use mimalloc as the global allocator for tests (non-Windows only)
#[cfg(not(windows))]
#[cfg(test)]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod cli;
pub mod daemons;
pub mod metrics;
pub mod preflight;
pub mod topology;

pub use daemons::{QuaggaPaths, QuaggaSet};
pub use topology::Lab;
