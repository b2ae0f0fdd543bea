//! The variables file that the configuration role writes at the end of its run, describing what
//! it configured on the host.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::pal::Host;
use crate::probe::{check_output, read_trimmed};
use crate::{Error, SstBfProfile};

/// Settings the role applied to one NUMA node.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[non_exhaustive]
pub struct NumaNodeVars {
    /// Memory in MB that DPDK preallocates on the node.
    #[serde(deserialize_with = "lenient_u64")]
    pub dpdk_socket_mem: u64,

    /// Physical cores on the node pinned to PMD threads. Each contributes two hyperthreads.
    #[serde(deserialize_with = "lenient_u64")]
    pub no_physical_cores_pinned: u64,
}

/// Variables from the role run.
///
/// Unknown keys are ignored; the role writes more than the checks consume. Keys that only matter
/// for OVS-DPDK may be absent if the role skipped that part. The accessors fail for an absent key
/// instead of assuming a default, since a check must never pass against a value the role did not
/// write.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[non_exhaustive]
pub struct RoleVars {
    /// The PMD CPU mask the role computed, in `0x` prefixed hex. Absent if OVS-DPDK was not
    /// configured.
    #[serde(default)]
    pub pmd_mask: Option<String>,

    /// Whether the role skipped OVS-DPDK configuration, making the DPDK checks moot.
    #[serde(default)]
    pub skip_ovs_dpdk_config: bool,

    /// Per-NUMA-node settings, keyed by node name. Sorted key order is node order.
    #[serde(default)]
    pub numa_nodes: Option<BTreeMap<String, NumaNodeVars>>,

    /// Number of 2 MB hugepages the role allocated.
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub ovs_dpdk_nr_2m_pages: Option<u64>,

    /// Number of 1 GB hugepages the role allocated.
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub ovs_dpdk_nr_1g_pages: Option<u64>,

    /// The SST-BF profile the role applied.
    pub sst_bf_profile: SstBfProfile,
}

impl RoleVars {
    /// Parses role variables from YAML. `path` is only used for error reporting.
    pub fn from_yaml(yaml: &str, path: &Path) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(|source| Error::RoleVars {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn load(host: &impl Host, path: &Path) -> crate::Result<Self> {
        let yaml = read_trimmed(host, path)?;
        let vars = Self::from_yaml(&yaml, path)?;

        info!(path = %path.display(), profile = ?vars.sst_bf_profile, "loaded role variables");

        Ok(vars)
    }

    /// The PMD CPU mask the role computed.
    pub fn pmd_mask(&self) -> crate::Result<&str> {
        self.pmd_mask.as_deref().ok_or_else(|| undefined("pmd_mask"))
    }

    /// Total physical cores pinned to PMD threads across all NUMA nodes.
    pub fn physical_cores_pinned(&self) -> crate::Result<u64> {
        Ok(self
            .numa_nodes()?
            .values()
            .map(|node| node.no_physical_cores_pinned)
            .sum())
    }

    /// DPDK socket memory per NUMA node, in node order.
    pub fn dpdk_socket_mem(&self) -> crate::Result<Vec<u64>> {
        Ok(self
            .numa_nodes()?
            .values()
            .map(|node| node.dpdk_socket_mem)
            .collect())
    }

    /// Number of 2 MB hugepages the role allocated.
    pub fn nr_2m_pages(&self) -> crate::Result<u64> {
        self.ovs_dpdk_nr_2m_pages
            .ok_or_else(|| undefined("ovs_dpdk_nr_2m_pages"))
    }

    /// Number of 1 GB hugepages the role allocated.
    pub fn nr_1g_pages(&self) -> crate::Result<u64> {
        self.ovs_dpdk_nr_1g_pages
            .ok_or_else(|| undefined("ovs_dpdk_nr_1g_pages"))
    }

    fn numa_nodes(&self) -> crate::Result<&BTreeMap<String, NumaNodeVars>> {
        match &self.numa_nodes {
            Some(nodes) if !nodes.is_empty() => Ok(nodes),
            Some(_) => Err(Error::unexpected_output(
                "role variables",
                String::new(),
                "numa_nodes has no entries",
            )),
            None => Err(undefined("numa_nodes")),
        }
    }
}

fn undefined(key: &str) -> Error {
    Error::unexpected_output("role variables", String::new(), format!("{key} is not defined"))
}

/// Where the role writes its variables for the host it ran on.
pub(crate) fn default_vars_path(host: &impl Host) -> crate::Result<PathBuf> {
    let hostname = check_output(host, "hostname", &["-s"])?;

    Ok(PathBuf::from(format!(
        "/tmp/sst_bf_role_vars_{}.yaml",
        hostname.trim()
    )))
}

/// An integer written either as a YAML number or as a string, since templated role output may
/// quote them.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientU64 {
    Number(u64),
    Text(String),
}

impl LenientU64 {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            Self::Number(value) => Ok(value),
            Self::Text(text) => text.trim().parse().map_err(E::custom),
        }
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    LenientU64::deserialize(deserializer)?.into_u64()
}

/// Like `lenient_u64`, with YAML null meaning the key is not defined.
fn lenient_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<LenientU64>::deserialize(deserializer)?
        .map(LenientU64::into_u64)
        .transpose()
}
