//! End-to-end throughput between the two PCs via iperf.
//!
//! An iperf server runs on pc2 as a managed child; the client on pc1 asks
//! for machine-readable CSV (`-y C`) and the last row is parsed into named
//! fields. A field-count mismatch is an error rather than a silently wrong
//! positional read.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use netns_lab::{NamespaceProcess, wait_for_tcp_listener};
use tracing::info;

use crate::metrics::print_metric_block;
use crate::topology::Lab;

pub const IPERF_PORT: u16 = 5001;
pub const TEST_SECS: u32 = 10;
const SERVER_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// iperf `-y C` rows carry exactly these comma-separated fields.
const IPERF_CSV_FIELDS: usize = 9;

/// One parsed row of iperf CSV output.
///
/// Schema (iperf 2): timestamp, local_ip, local_port, remote_ip, remote_port,
/// transfer_id, interval, transferred_bytes, bits_per_sec.
#[derive(Debug, Clone, PartialEq)]
pub struct BandwidthSample {
    pub interval: String,
    pub transferred_bytes: u64,
    pub bits_per_sec: f64,
}

impl BandwidthSample {
    pub fn parse_csv(row: &str) -> Result<Self> {
        let fields: Vec<&str> = row.trim().split(',').collect();
        if fields.len() != IPERF_CSV_FIELDS {
            bail!(
                "iperf CSV row has {} fields, expected {IPERF_CSV_FIELDS}: '{row}'",
                fields.len()
            );
        }

        Ok(Self {
            interval: fields[6].to_string(),
            transferred_bytes: fields[7]
                .parse()
                .with_context(|| format!("transferred bytes field '{}'", fields[7]))?,
            bits_per_sec: fields[8]
                .parse()
                .with_context(|| format!("bandwidth field '{}'", fields[8]))?,
        })
    }

    pub fn megabits_per_sec(&self) -> f64 {
        self.bits_per_sec / 1_000_000.0
    }

    pub fn transferred_mib(&self) -> f64 {
        self.transferred_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Run the iperf server on pc2 and the client on pc1, returning the parsed
/// summary row.
pub fn measure(lab: &Lab) -> Result<BandwidthSample> {
    let [pc1, pc2] = lab.pcs.as_slice() else {
        bail!("expected exactly two PCs in the lab");
    };

    info!(server = %pc2.name, client = %pc1.name, "starting iperf throughput test");
    let mut server =
        NamespaceProcess::spawn(&pc2.ns, "iperf", &["-s"]).context("start iperf server")?;
    if let Some((code, stderr)) = server.check_exit() {
        bail!("iperf server exited immediately (code: {code:?})\nstderr:\n{stderr}");
    }
    wait_for_tcp_listener(&pc2.ns, IPERF_PORT, SERVER_READY_TIMEOUT)
        .context("wait for iperf server")?;

    let secs = TEST_SECS.to_string();
    let out = pc1
        .ns
        .exec_checked("iperf", &["-c", &pc2.addr, "-t", &secs, "-y", "C"])
        .context("run iperf client")?;

    server.kill();

    let stdout = String::from_utf8_lossy(&out.stdout);
    let row = stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .next_back()
        .context("iperf client produced no CSV output")?;
    BandwidthSample::parse_csv(row)
}

pub fn report(lab: &Lab) -> Result<()> {
    let sample = measure(lab)?;
    let body = format!(
        "interval:     {} s\ntransferred:  {:.2} MiB\nthroughput:   {:.2} Mbit/s",
        sample.interval,
        sample.transferred_mib(),
        sample.megabits_per_sec()
    );
    print_metric_block("THROUGHPUT", &body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ROW: &str =
        "20240101120000,172.16.1.10,50412,172.16.5.10,5001,3,0.0-10.0,1300000000,10400000.5";

    #[test]
    fn parses_documented_field_positions() {
        let sample = BandwidthSample::parse_csv(SAMPLE_ROW).expect("parse");
        assert_eq!(sample.interval, "0.0-10.0");
        assert_eq!(sample.transferred_bytes, 1_300_000_000);
        assert_eq!(sample.bits_per_sec, 10_400_000.5);
    }

    #[test]
    fn derived_units_round_to_two_decimals() {
        let sample = BandwidthSample::parse_csv(SAMPLE_ROW).expect("parse");
        assert_eq!(format!("{:.2}", sample.megabits_per_sec()), "10.40");
        assert_eq!(format!("{:.2}", sample.transferred_mib()), "1239.78");
    }

    #[test]
    fn field_count_mismatch_is_an_error() {
        let err = BandwidthSample::parse_csv("1,2,3,4").unwrap_err();
        assert!(err.to_string().contains("4 fields"));

        let ten_fields = format!("{SAMPLE_ROW},extra");
        assert!(BandwidthSample::parse_csv(&ten_fields).is_err());
    }

    #[test]
    fn non_numeric_fields_are_an_error() {
        let row = "t,a,1,b,2,3,0.0-10.0,not_bytes,10400000.5";
        let err = BandwidthSample::parse_csv(row).unwrap_err();
        assert!(err.to_string().contains("not_bytes"));
    }

    #[test]
    fn trailing_newline_tolerated() {
        let row = format!("{SAMPLE_ROW}\n");
        assert!(BandwidthSample::parse_csv(&row).is_ok());
    }
}
