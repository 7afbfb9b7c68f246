use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ospflab::daemons::{QuaggaPaths, QuaggaSet};
use ospflab::topology::Lab;
use ospflab::{cli, metrics, preflight};

// Use mimalloc as the global allocator for the binary (non-Windows only)
#[cfg(not(windows))]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(
    name = "ospflab",
    author,
    version,
    disable_version_flag = true,
    about = "Quagga OSPF lab on network namespaces with metric collection"
)]
struct Cli {
    /// Print the version and exit
    #[arg(short = 'v', long = "version", action = clap::ArgAction::SetTrue)]
    print_version: bool,

    /// Root of the per-router Quagga configs
    /// (<dir>/<router>/{zebra.conf,ospfd.conf})
    #[arg(long = "config-dir", default_value = "./quagga_configs")]
    config_dir: PathBuf,

    /// Path to the zebra binary
    #[arg(long = "zebra-bin", default_value = "/usr/lib/quagga/zebra")]
    zebra_bin: String,

    /// Path to the ospfd binary
    #[arg(long = "ospfd-bin", default_value = "/usr/lib/quagga/ospfd")]
    ospfd_bin: String,

    /// Skip the interactive shell after metric collection
    #[arg(long = "batch")]
    batch: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Cli::parse();
    if args.print_version {
        let version = env!("CARGO_PKG_VERSION");
        let git_hash = env!("GIT_HASH");
        let git_branch = env!("GIT_BRANCH");
        let git_dirty = env!("GIT_DIRTY");

        println!(
            "{} ({}@{}{}) [{}]",
            version,
            git_branch,
            git_hash,
            git_dirty,
            env!("CARGO_PKG_NAME")
        );
        return Ok(());
    }

    let paths = QuaggaPaths {
        // Daemons are detached, so they must not depend on our cwd
        config_dir: args
            .config_dir
            .canonicalize()
            .with_context(|| format!("resolve config dir '{}'", args.config_dir.display()))?,
        zebra_bin: args.zebra_bin,
        ospfd_bin: args.ospfd_bin,
    };

    preflight::check(&paths)?;

    let lab = Lab::build().context("build topology")?;
    let daemons = QuaggaSet::launch(paths, &lab.routers).context("launch Quagga daemons")?;

    metrics::collect_all(&lab)?;

    if !args.batch {
        cli::run(&lab)?;
    }

    // Explicit for ordering: daemons die before their namespaces do
    drop(daemons);
    drop(lab);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_quagga_packaging_layout() {
        let args = Cli::parse_from(["ospflab"]);
        assert_eq!(args.config_dir, PathBuf::from("./quagga_configs"));
        assert_eq!(args.zebra_bin, "/usr/lib/quagga/zebra");
        assert_eq!(args.ospfd_bin, "/usr/lib/quagga/ospfd");
        assert!(!args.batch);
    }

    #[test]
    fn batch_flag_parses() {
        let args = Cli::parse_from(["ospflab", "--batch", "--config-dir", "/etc/quagga"]);
        assert!(args.batch);
        assert_eq!(args.config_dir, PathBuf::from("/etc/quagga"));
    }
}
