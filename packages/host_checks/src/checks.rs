//! The individual host checks. Each one collects an expected and an observed value and compares
//! them.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use coreset::{CpuId, CpuMask};
use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use crate::ovs::Ovs;
use crate::pal::Host;
use crate::sst_bf::{CorePriority, FrequencyExpectation, FrequencyRange, priority_cores};
use crate::sysfs::Sysfs;
use crate::{Error, RoleVars};

/// Each pinned physical core runs a PMD thread on both of its hyperthreads.
const PMD_THREADS_PER_CORE: u64 = 2;

/// A verification of one aspect of the host configuration.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Check {
    /// The CPUs isolated from the kernel scheduler are exactly the PMD CPUs.
    IsolatedCpus,
    /// The PMD threads run on exactly the CPUs in the OVS PMD CPU mask.
    PmdCoresMatchMask,
    /// The PMD CPU mask set in OVS is the one the role computed.
    PmdMask,
    /// OVS runs two PMD threads per pinned physical core.
    PmdThreads,
    /// The DPDK socket memory set in OVS matches the role's per-node values.
    DpdkSocketMem,
    /// The 2 MB and 1 GB hugepages allocated match the role's values.
    Hugepages,
    /// The IOMMU is enabled and has devices.
    Iommu,
    /// OVS reports DPDK as initialized.
    DpdkInitialized,
    /// Core frequencies match the SST-BF profile the role applied.
    SstBfProfile,
}

impl Check {
    /// Every check, in the order they run by default.
    pub const ALL: [Self; 9] = [
        Self::IsolatedCpus,
        Self::PmdCoresMatchMask,
        Self::PmdMask,
        Self::PmdThreads,
        Self::DpdkSocketMem,
        Self::Hugepages,
        Self::Iommu,
        Self::DpdkInitialized,
        Self::SstBfProfile,
    ];

    /// The name used to select the check on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::IsolatedCpus => "isolated-cpus",
            Self::PmdCoresMatchMask => "pmd-cores-match-mask",
            Self::PmdMask => "pmd-mask",
            Self::PmdThreads => "pmd-threads",
            Self::DpdkSocketMem => "dpdk-socket-mem",
            Self::Hugepages => "hugepages",
            Self::Iommu => "iommu",
            Self::DpdkInitialized => "dpdk-initialized",
            Self::SstBfProfile => "sst-bf-profile",
        }
    }

    /// Whether the check only applies if the role configured OVS-DPDK.
    fn requires_ovs_dpdk(self) -> bool {
        !matches!(self, Self::SstBfProfile)
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Check {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|check| check.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "Invalid check: '{s}'. Valid options are: {}",
                    Self::ALL.iter().join(", ")
                )
            })
    }
}

/// The result of a check that did not fail.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum CheckOutcome {
    /// The host is configured as expected.
    Passed,
    /// The check does not apply to this host.
    Skipped {
        /// Why the check does not apply.
        reason: String,
    },
}

/// Why a check failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckError {
    /// The host is not configured as expected.
    #[error("{what} mismatch: expected {expected}, observed {observed}")]
    Mismatch {
        /// What was compared.
        what: String,
        /// The expected value.
        expected: String,
        /// The value found on the host.
        observed: String,
    },

    /// The values to compare could not be collected.
    #[error(transparent)]
    Collect(#[from] Error),
}

impl CheckError {
    fn mismatch(what: impl Into<String>, expected: impl ToString, observed: impl ToString) -> Self {
        Self::Mismatch {
            what: what.into(),
            expected: expected.to_string(),
            observed: observed.to_string(),
        }
    }
}

type CheckResult = Result<CheckOutcome, CheckError>;

/// Everything the checks need to know about the host under test.
#[derive(Debug)]
pub(crate) struct CheckContext<H> {
    pub(crate) host: H,
    pub(crate) sysfs_root: PathBuf,
    pub(crate) role_vars: RoleVars,
    pub(crate) sst_bf_script: Option<PathBuf>,
}

impl<H: Host> CheckContext<H> {
    pub(crate) fn run(&self, check: Check) -> CheckResult {
        if check.requires_ovs_dpdk() && self.role_vars.skip_ovs_dpdk_config {
            return Ok(CheckOutcome::Skipped {
                reason: "the role skipped OVS-DPDK configuration".to_string(),
            });
        }

        match check {
            Check::IsolatedCpus => self.isolated_cpus(),
            Check::PmdCoresMatchMask => self.pmd_cores_match_mask(),
            Check::PmdMask => self.pmd_mask(),
            Check::PmdThreads => self.pmd_threads(),
            Check::DpdkSocketMem => self.dpdk_socket_mem(),
            Check::Hugepages => self.hugepages(),
            Check::Iommu => self.iommu(),
            Check::DpdkInitialized => self.dpdk_initialized(),
            Check::SstBfProfile => self.sst_bf_profile(),
        }
    }

    fn sysfs(&self) -> Sysfs<'_, H> {
        Sysfs::new(&self.host, &self.sysfs_root)
    }

    fn ovs(&self) -> Ovs<'_, H> {
        Ovs::new(&self.host)
    }

    fn isolated_cpus(&self) -> CheckResult {
        let isolated = self.sysfs().isolated_cpus()?;
        let pmd: Vec<CpuId> = self.ovs().pmd_cpu_mask()?.iter().collect();

        expect_cpus("isolated CPUs", &pmd, &isolated)
    }

    fn pmd_cores_match_mask(&self) -> CheckResult {
        let pmd: Vec<CpuId> = self.ovs().pmd_cpu_mask()?.iter().collect();
        let running = self.ovs().pmd_core_ids()?;

        expect_cpus("PMD thread cores", &pmd, &running)
    }

    fn pmd_mask(&self) -> CheckResult {
        let expected = self.role_vars.pmd_mask()?;

        if !expected.starts_with("0x") {
            return Err(Error::unexpected_output(
                "role variable pmd_mask",
                expected,
                "expected 0x prefixed hex",
            )
            .into());
        }

        let expected_mask = expected
            .parse::<CpuMask>()
            .map_err(|e| Error::cpu_set("role variable pmd_mask", e))?;
        let observed = self.ovs().pmd_cpu_mask()?;

        if observed == expected_mask {
            Ok(CheckOutcome::Passed)
        } else {
            Err(CheckError::mismatch("PMD CPU mask", expected, observed))
        }
    }

    fn pmd_threads(&self) -> CheckResult {
        let expected = self
            .role_vars
            .physical_cores_pinned()?
            .saturating_mul(PMD_THREADS_PER_CORE);
        let observed = self.ovs().pmd_thread_count()?;

        if u64::try_from(observed).is_ok_and(|observed| observed == expected) {
            Ok(CheckOutcome::Passed)
        } else {
            Err(CheckError::mismatch("PMD thread count", expected, observed))
        }
    }

    fn dpdk_socket_mem(&self) -> CheckResult {
        let expected = self.role_vars.dpdk_socket_mem()?;
        let observed = self.ovs().dpdk_socket_mem()?;

        if observed == expected {
            Ok(CheckOutcome::Passed)
        } else {
            Err(CheckError::mismatch(
                "DPDK socket memory",
                expected.iter().join(","),
                observed.iter().join(","),
            ))
        }
    }

    fn hugepages(&self) -> CheckResult {
        let expected_two_mb = self.role_vars.nr_2m_pages()?;
        let expected_one_gb = self.role_vars.nr_1g_pages()?;
        let observed = self.sysfs().hugepages()?;

        if observed.two_mb != expected_two_mb {
            return Err(CheckError::mismatch(
                "2M hugepages",
                expected_two_mb,
                observed.two_mb,
            ));
        }

        if observed.one_gb != expected_one_gb {
            return Err(CheckError::mismatch(
                "1G hugepages",
                expected_one_gb,
                observed.one_gb,
            ));
        }

        Ok(CheckOutcome::Passed)
    }

    fn iommu(&self) -> CheckResult {
        if self.sysfs().iommu_enabled()? {
            Ok(CheckOutcome::Passed)
        } else {
            Err(CheckError::mismatch("IOMMU devices", "present", "none"))
        }
    }

    fn dpdk_initialized(&self) -> CheckResult {
        let version = self.ovs().version()?;

        if !version.supports_dpdk_initialized() {
            return Ok(CheckOutcome::Skipped {
                reason: format!("OVS {version} does not report DPDK initialization"),
            });
        }

        if self.ovs().dpdk_initialized()? {
            Ok(CheckOutcome::Passed)
        } else {
            Err(CheckError::mismatch("dpdk_initialized", true, false))
        }
    }

    fn sst_bf_profile(&self) -> CheckResult {
        let Some(script) = self.sst_bf_script.as_deref() else {
            return Ok(CheckOutcome::Skipped {
                reason: "no SST-BF helper script given".to_string(),
            });
        };

        let high = priority_cores(&self.host, script, CorePriority::High)?;
        let normal = priority_cores(&self.host, script, CorePriority::Normal)?;
        let sysfs = self.sysfs();

        match self.role_vars.sst_bf_profile.expectation() {
            FrequencyExpectation::PinnedToBase => {
                for &cpu in normal.iter().chain(&high) {
                    let freqs = sysfs.cpu_frequencies(cpu)?;
                    debug!(cpu, ?freqs, "checking core is pinned to base frequency");

                    expect_frequency(cpu, "min", freqs.base, freqs.min)?;
                    expect_frequency(cpu, "max", freqs.base, freqs.max)?;
                }
            }
            FrequencyExpectation::Scaling {
                high: high_range,
                normal: normal_range,
            } => {
                check_scaling(&sysfs, &normal, normal_range)?;
                check_scaling(&sysfs, &high, high_range)?;
            }
        }

        Ok(CheckOutcome::Passed)
    }
}

fn check_scaling<H: Host>(
    sysfs: &Sysfs<'_, H>,
    cpus: &[CpuId],
    expected: FrequencyRange,
) -> Result<(), CheckError> {
    for &cpu in cpus {
        let freqs = sysfs.cpu_frequencies(cpu)?;
        debug!(cpu, ?freqs, ?expected, "checking core scaling range");

        expect_frequency(cpu, "min", expected.min, freqs.min)?;
        expect_frequency(cpu, "max", expected.max, freqs.max)?;
    }

    Ok(())
}

fn expect_frequency(cpu: CpuId, level: &str, expected: u64, observed: u64) -> Result<(), CheckError> {
    if expected == observed {
        Ok(())
    } else {
        Err(CheckError::mismatch(
            format!("CPU {cpu} {level} frequency (kHz)"),
            expected,
            observed,
        ))
    }
}

/// Compares CPU lists as ordered sequences, rendering them in range list form on mismatch.
fn expect_cpus(what: &str, expected: &[CpuId], observed: &[CpuId]) -> CheckResult {
    if expected == observed {
        Ok(CheckOutcome::Passed)
    } else {
        Err(CheckError::mismatch(
            what,
            render_cpus(expected),
            render_cpus(observed),
        ))
    }
}

fn render_cpus(cpus: &[CpuId]) -> String {
    if cpus.is_empty() {
        "no CPUs".to_string()
    } else {
        format!("[{}]", coreset::emit_list(cpus.iter().copied()))
    }
}
