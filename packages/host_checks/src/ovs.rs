//! Queries against a running Open vSwitch via `ovs-vsctl` and `ovs-appctl`, and the parsers
//! for their text output.

use std::fmt;
use std::str::FromStr;

use coreset::{CpuId, CpuMask};
use tracing::debug;

use crate::Error;
use crate::pal::Host;
use crate::probe::{check_output, parse_u64};

const VSCTL: &str = "ovs-vsctl";
const APPCTL: &str = "ovs-appctl";

/// The first release in which OVS reports `dpdk_initialized`.
const DPDK_INITIALIZED_SINCE: OvsVersion = OvsVersion {
    major: 2,
    minor: 10,
    patch: 0,
};

/// Queries the OVS instance on a host.
#[derive(Debug)]
pub(crate) struct Ovs<'h, H> {
    host: &'h H,
}

impl<'h, H: Host> Ovs<'h, H> {
    pub(crate) fn new(host: &'h H) -> Self {
        Self { host }
    }

    /// Reads a column of the `Open_vSwitch` table, with the quoting removed.
    fn get(&self, column: &str) -> crate::Result<String> {
        let output = check_output(self.host, VSCTL, &["get", "Open_vSwitch", ".", column])?;

        Ok(vsctl_value(&output).to_string())
    }

    /// The CPUs that poll mode driver threads are pinned to.
    pub(crate) fn pmd_cpu_mask(&self) -> crate::Result<CpuMask> {
        let other_config = self.get("other_config")?;

        if !other_config.contains("pmd-cpu-mask") {
            return Err(Error::unexpected_output(
                "Open_vSwitch column other_config",
                other_config,
                "pmd-cpu-mask is not set",
            ));
        }

        let mask = self.get("other_config:pmd-cpu-mask")?;

        debug!(%mask, "read PMD CPU mask");

        mask.parse::<CpuMask>()
            .map_err(|e| Error::cpu_set("other_config:pmd-cpu-mask", e))
    }

    /// Memory in MB that DPDK preallocates on each NUMA node, in node order.
    pub(crate) fn dpdk_socket_mem(&self) -> crate::Result<Vec<u64>> {
        let socket_mem = self.get("other_config:dpdk-socket-mem")?;

        parse_socket_mem(&socket_mem)
    }

    pub(crate) fn version(&self) -> crate::Result<OvsVersion> {
        self.get("ovs_version")?.parse()
    }

    /// Whether OVS has finished initializing DPDK.
    pub(crate) fn dpdk_initialized(&self) -> crate::Result<bool> {
        Ok(self.get("dpdk_initialized")?.eq_ignore_ascii_case("true"))
    }

    /// The CPUs that PMD threads actually run on, as reported by the datapath.
    pub(crate) fn pmd_core_ids(&self) -> crate::Result<Vec<CpuId>> {
        let output = check_output(self.host, APPCTL, &["dpif-netdev/pmd-rxq-show"])?;

        parse_pmd_core_ids(&output)
    }

    /// The number of PMD threads the datapath runs.
    pub(crate) fn pmd_thread_count(&self) -> crate::Result<usize> {
        let output = check_output(self.host, APPCTL, &["dpif-netdev/pmd-stats-show"])?;

        Ok(count_pmd_threads(&output))
    }
}

/// Strips the whitespace and double quotes that `ovs-vsctl get` wraps string values in.
pub(crate) fn vsctl_value(output: &str) -> &str {
    output.trim().trim_matches('"')
}

/// Parses `dpdk-socket-mem`, a comma-separated list of per-NUMA-node megabytes.
pub(crate) fn parse_socket_mem(socket_mem: &str) -> crate::Result<Vec<u64>> {
    socket_mem
        .split(',')
        .map(|mem| parse_u64("other_config:dpdk-socket-mem", vsctl_value(mem)))
        .collect()
}

/// Collects the `core_id <N>` of every PMD thread in `dpif-netdev/pmd-rxq-show` output.
pub(crate) fn parse_pmd_core_ids(output: &str) -> crate::Result<Vec<CpuId>> {
    const MARKER: &str = "core_id ";

    output
        .match_indices(MARKER)
        .filter_map(|(index, _)| {
            let rest = output.get(index + MARKER.len()..)?;
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());

            rest.get(..digits_end).filter(|digits| !digits.is_empty())
        })
        .map(|digits| {
            digits.parse::<CpuId>().map_err(|_parse_error| {
                Error::unexpected_output("dpif-netdev/pmd-rxq-show", digits, "core_id out of range")
            })
        })
        .collect()
}

/// Counts the PMD threads listed in `dpif-netdev/pmd-stats-show` output.
pub(crate) fn count_pmd_threads(output: &str) -> usize {
    output
        .lines()
        .filter(|line| line.contains("pmd thread"))
        .count()
}

/// An OVS release number in `major.minor.patch` form.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) struct OvsVersion {
    pub(crate) major: u32,
    pub(crate) minor: u32,
    pub(crate) patch: u32,
}

impl OvsVersion {
    /// Whether this release reports `dpdk_initialized` in the `Open_vSwitch` table.
    pub(crate) fn supports_dpdk_initialized(self) -> bool {
        self >= DPDK_INITIALIZED_SINCE
    }
}

impl FromStr for OvsVersion {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let invalid = || Error::unexpected_output("ovs_version", s, "expected major.minor.patch");

        let mut parts = s.split('.').map(|part| part.parse::<u32>());

        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch)), None) => Ok(Self {
                major,
                minor,
                patch,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for OvsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::pal::{CommandOutput, MockHost};

    const RXQ_SHOW: &str = "\
pmd thread numa_id 0 core_id 4:
  isolated : false
  port: dpdk0             queue-id:  0 (enabled)   pmd usage:  0 %
pmd thread numa_id 0 core_id 5:
  isolated : false
pmd thread numa_id 1 core_id 40:
  isolated : false
pmd thread numa_id 1 core_id 41:
  isolated : false
";

    const STATS_SHOW: &str = "\
pmd thread numa_id 0 core_id 4:
  packets received: 0
pmd thread numa_id 0 core_id 5:
  packets received: 0
main thread:
  packets received: 0
";

    fn ok(stdout: &str) -> std::io::Result<CommandOutput> {
        Ok(CommandOutput {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    /// A mock host answering `ovs-vsctl get Open_vSwitch . <column>` from the given pairs.
    fn host_with_columns(columns: &'static [(&'static str, &'static str)]) -> MockHost {
        let mut mock = MockHost::new();
        mock.expect_run().returning(move |program, args| {
            assert_eq!(program, VSCTL);
            let column = args.last().map(String::as_str).unwrap_or_default();

            columns
                .iter()
                .find(|(name, _)| *name == column)
                .map_or_else(
                    || {
                        Ok(CommandOutput {
                            success: false,
                            stdout: String::new(),
                            stderr: format!("no key \"{column}\"\n"),
                        })
                    },
                    |(_, value)| ok(value),
                )
        });
        mock
    }

    #[test]
    fn vsctl_value_strips_quotes() {
        assert_eq!(vsctl_value("\"0x30000000030\"\n"), "0x30000000030");
        assert_eq!(vsctl_value("true\n"), "true");
        assert_eq!(vsctl_value("\"2.11.1\""), "2.11.1");
    }

    #[test]
    fn pmd_cpu_mask_is_parsed() {
        let host = host_with_columns(&[
            (
                "other_config",
                "{dpdk-init=\"true\", pmd-cpu-mask=\"0x30000000030\"}\n",
            ),
            ("other_config:pmd-cpu-mask", "\"0x30000000030\"\n"),
        ]);

        let mask = Ovs::new(&host).pmd_cpu_mask().unwrap();

        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![4, 5, 40, 41]);
    }

    #[test]
    fn pmd_cpu_mask_without_prefix_is_parsed() {
        let host = host_with_columns(&[
            ("other_config", "{pmd-cpu-mask=\"f0\"}\n"),
            ("other_config:pmd-cpu-mask", "\"f0\"\n"),
        ]);

        let mask = Ovs::new(&host).pmd_cpu_mask().unwrap();

        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn missing_pmd_cpu_mask_is_error() {
        let host = host_with_columns(&[("other_config", "{dpdk-init=\"true\"}\n")]);

        let error = Ovs::new(&host).pmd_cpu_mask().unwrap_err();

        assert!(error.to_string().contains("pmd-cpu-mask is not set"));
    }

    #[test]
    fn socket_mem_is_parsed() {
        let host = host_with_columns(&[("other_config:dpdk-socket-mem", "\"1024,2048\"\n")]);

        assert_eq!(Ovs::new(&host).dpdk_socket_mem().unwrap(), vec![1024, 2048]);
    }

    #[test]
    fn garbage_socket_mem_is_error() {
        parse_socket_mem("1024,lots").unwrap_err();
        parse_socket_mem("").unwrap_err();
    }

    #[test]
    fn version_is_parsed() {
        let host = host_with_columns(&[("ovs_version", "\"2.11.1\"\n")]);

        assert_eq!(
            Ovs::new(&host).version().unwrap(),
            OvsVersion {
                major: 2,
                minor: 11,
                patch: 1
            }
        );
    }

    #[test]
    fn malformed_version_is_error() {
        "2.11".parse::<OvsVersion>().unwrap_err();
        "2.11.1.4".parse::<OvsVersion>().unwrap_err();
        "2.x.1".parse::<OvsVersion>().unwrap_err();
        "".parse::<OvsVersion>().unwrap_err();
    }

    #[test]
    fn dpdk_initialized_reported_since_2_10() {
        let supports = |version: &str| {
            version
                .parse::<OvsVersion>()
                .unwrap()
                .supports_dpdk_initialized()
        };

        assert!(!supports("2.9.5"));
        assert!(supports("2.10.0"));
        assert!(supports("2.17.9"));
        assert!(supports("3.0.0"));
        assert!(!supports("1.99.0"));
    }

    #[test]
    fn dpdk_initialized_is_case_insensitive() {
        let host = host_with_columns(&[("dpdk_initialized", "True\n")]);
        assert!(Ovs::new(&host).dpdk_initialized().unwrap());

        let host = host_with_columns(&[("dpdk_initialized", "false\n")]);
        assert!(!Ovs::new(&host).dpdk_initialized().unwrap());
    }

    #[test]
    fn pmd_core_ids_are_collected_in_order() {
        assert_eq!(parse_pmd_core_ids(RXQ_SHOW).unwrap(), vec![4, 5, 40, 41]);
        assert_eq!(parse_pmd_core_ids("").unwrap(), Vec::<CpuId>::new());
        assert_eq!(parse_pmd_core_ids("core_id x").unwrap(), Vec::<CpuId>::new());
    }

    #[test]
    fn pmd_core_ids_via_appctl() {
        let mut mock = MockHost::new();
        mock.expect_run().returning(|program, args| {
            assert_eq!(program, APPCTL);
            assert_eq!(args, ["dpif-netdev/pmd-rxq-show"]);
            ok(RXQ_SHOW)
        });

        assert_eq!(Ovs::new(&mock).pmd_core_ids().unwrap(), vec![4, 5, 40, 41]);
    }

    #[test]
    fn pmd_threads_are_counted() {
        let mut mock = MockHost::new();
        mock.expect_run().returning(|_, args| {
            assert_eq!(args, ["dpif-netdev/pmd-stats-show"]);
            ok(STATS_SHOW)
        });

        assert_eq!(Ovs::new(&mock).pmd_thread_count().unwrap(), 2);
        assert_eq!(count_pmd_threads(""), 0);
    }
}
