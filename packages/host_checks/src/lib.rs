#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Verifies that a compute host was configured for SST-BF (Intel Speed Select Technology - Base
//! Frequency) and OVS-DPDK CPU pinning the way the configuration role intended.
//!
//! The role leaves a variables file behind describing what it configured. Each [`Check`]
//! compares one aspect of that against what the host reports through sysfs, `ovs-vsctl` and
//! `ovs-appctl`:
//!
//! ```text
//! $ verify-host --check pmd-mask --check hugepages
//! PASS pmd-mask
//! FAIL hugepages: 1G hugepages mismatch: expected 8, observed 4
//! ```
//!
//! The binary entry point is in `main.rs`; this crate holds the logic behind it.

mod checks;
mod error;
mod ovs;
mod pal;
mod probe;
mod role_vars;
mod sst_bf;
mod sysfs;

use std::path::PathBuf;

pub use checks::{Check, CheckError, CheckOutcome};
use checks::CheckContext;
pub use error::*;
use pal::{Host, HostFacade};
pub use role_vars::{NumaNodeVars, RoleVars};
use role_vars::default_vars_path;
pub use sst_bf::SstBfProfile;
pub use sysfs::DEFAULT_SYSFS_ROOT;
use tracing::{info, warn};

/// Input parameters for the `run` function.
#[doc(hidden)]
#[derive(Clone, Debug)]
#[allow(
    clippy::exhaustive_structs,
    reason = "This is a hidden struct for internal/test use only"
)]
pub struct RunInput {
    /// The role variables file. If `None`, the file the role writes for this host is used.
    pub vars_path: Option<PathBuf>,

    /// Where sysfs is mounted.
    pub sysfs_root: PathBuf,

    /// The SST-BF helper script that lists high and normal priority cores.
    pub sst_bf_script: Option<PathBuf>,

    /// The checks to run, in order. If empty, every check runs.
    pub checks: Vec<Check>,
}

/// The result of one check.
#[doc(hidden)]
#[derive(Debug)]
#[allow(
    clippy::exhaustive_structs,
    reason = "This is a hidden struct for internal/test use only"
)]
pub struct CheckReport {
    /// The check that ran.
    pub check: Check,

    /// What the check found.
    pub result: std::result::Result<CheckOutcome, CheckError>,
}

impl CheckReport {
    /// Whether the check failed, either on a mismatch or because it could not collect values.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Core logic of the tool, extracted for testability.
///
/// Fails only if the role variables cannot be loaded. Failures of individual checks are
/// reported in the returned list and do not stop the remaining checks.
#[doc(hidden)]
pub fn run(input: &RunInput) -> std::result::Result<Vec<CheckReport>, Error> {
    run_with_host(input, HostFacade::target())
}

fn run_with_host(input: &RunInput, host: impl Host) -> std::result::Result<Vec<CheckReport>, Error> {
    let vars_path = match &input.vars_path {
        Some(path) => path.clone(),
        None => default_vars_path(&host)?,
    };

    let role_vars = RoleVars::load(&host, &vars_path)?;

    let context = CheckContext {
        host,
        sysfs_root: input.sysfs_root.clone(),
        role_vars,
        sst_bf_script: input.sst_bf_script.clone(),
    };

    let checks = if input.checks.is_empty() {
        Check::ALL.to_vec()
    } else {
        input.checks.clone()
    };

    Ok(checks
        .into_iter()
        .map(|check| {
            let result = context.run(check);

            match &result {
                Ok(CheckOutcome::Passed) => info!(%check, "check passed"),
                Ok(CheckOutcome::Skipped { reason }) => info!(%check, %reason, "check skipped"),
                Err(error) => warn!(%check, %error, "check failed"),
            }

            CheckReport { check, result }
        })
        .collect())
}
