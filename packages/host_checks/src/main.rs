#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the verify-host tool.
//!
//! This module is excluded from mutation testing because testing process entry/exit behavior
//! is impractical - it requires spawning subprocesses and checking exit codes.

use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use host_checks::{Check, CheckOutcome, DEFAULT_SYSFS_ROOT, RunInput, run};
use tracing_subscriber::EnvFilter;

/// Verifies that this host was configured for SST-BF and OVS-DPDK as the role intended.
#[derive(FromArgs)]
struct Args {
    /// role variables file (default: /tmp/sst_bf_role_vars_<short hostname>.yaml)
    #[argh(option)]
    vars: Option<PathBuf>,

    /// where sysfs is mounted
    #[argh(option, default = "PathBuf::from(DEFAULT_SYSFS_ROOT)")]
    sysfs_root: PathBuf,

    /// SST-BF helper script that lists core priorities; the profile check is skipped without it
    #[argh(option)]
    sst_bf_script: Option<PathBuf>,

    /// check to run, may be repeated (default: all checks)
    #[argh(option)]
    check: Vec<Check>,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    let input = RunInput {
        vars_path: args.vars,
        sysfs_root: args.sysfs_root,
        sst_bf_script: args.sst_bf_script,
        checks: args.check,
    };

    let reports = match run(&input) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Error: {e}");

            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }

            return ExitCode::FAILURE;
        }
    };

    for report in &reports {
        match &report.result {
            Ok(CheckOutcome::Passed) => println!("PASS {}", report.check),
            Ok(CheckOutcome::Skipped { reason }) => println!("SKIP {}: {reason}", report.check),
            Err(error) => println!("FAIL {}: {error}", report.check),
            Ok(_) => println!("DONE {}", report.check),
        }
    }

    if reports.iter().any(|report| report.is_failure()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// Logs go to stderr so that stdout only carries the check results.
#[cfg_attr(test, mutants::skip)]
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
