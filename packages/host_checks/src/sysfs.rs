//! Readers for the sysfs files that reflect CPU isolation, NUMA, hugepage, IOMMU and CPU
//! frequency configuration.

use std::path::{Path, PathBuf};

use coreset::CpuId;
use tracing::debug;

use crate::Error;
use crate::pal::Host;
use crate::probe::{read_trimmed, read_u64};

/// Where sysfs is mounted on a normal Linux host.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Hugepages allocated across all online NUMA nodes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct HugepageTotals {
    pub(crate) two_mb: u64,
    pub(crate) one_gb: u64,
}

/// Frequency settings of one CPU, in kHz.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct CpuFrequencies {
    pub(crate) min: u64,
    pub(crate) max: u64,
    pub(crate) base: u64,
}

/// Reads sysfs below a root directory, normally [`DEFAULT_SYSFS_ROOT`].
#[derive(Debug)]
pub(crate) struct Sysfs<'h, H> {
    host: &'h H,
    root: &'h Path,
}

impl<'h, H: Host> Sysfs<'h, H> {
    pub(crate) fn new(host: &'h H, root: &'h Path) -> Self {
        Self { host, root }
    }

    /// CPUs isolated from the general scheduler, in the order the kernel lists them.
    ///
    /// An empty file means no CPUs are isolated.
    pub(crate) fn isolated_cpus(&self) -> crate::Result<Vec<CpuId>> {
        let path = self.path("devices/system/cpu/isolated");
        let isolated = read_trimmed(self.host, &path)?;

        let cpus = coreset::range_list_to_list(&isolated)
            .map_err(|e| Error::cpu_set(path.display().to_string(), e))?;

        debug!(%isolated, count = cpus.len(), "read isolated CPUs");

        Ok(cpus)
    }

    /// The online NUMA nodes. A host always has at least one.
    pub(crate) fn online_numa_nodes(&self) -> crate::Result<Vec<u32>> {
        let path = self.path("devices/system/node/online");
        let online = read_trimmed(self.host, &path)?;
        let origin = path.display().to_string();

        // NUMA node IDs share the range list format with CPU IDs.
        let nodes = coreset::range_list_to_list(&online).map_err(|e| Error::cpu_set(&origin, e))?;

        if nodes.is_empty() {
            return Err(Error::unexpected_output(
                origin,
                online,
                "no online NUMA nodes listed",
            ));
        }

        Ok(nodes)
    }

    /// Sums the 2 MB and 1 GB hugepages allocated on every online NUMA node.
    pub(crate) fn hugepages(&self) -> crate::Result<HugepageTotals> {
        let mut totals = HugepageTotals::default();

        for node in self.online_numa_nodes()? {
            let node_dir = format!("devices/system/node/node{node}/hugepages");

            let two_mb = read_u64(
                self.host,
                &self.path(&format!("{node_dir}/hugepages-2048kB/nr_hugepages")),
            )?;
            let one_gb = read_u64(
                self.host,
                &self.path(&format!("{node_dir}/hugepages-1048576kB/nr_hugepages")),
            )?;

            debug!(node, two_mb, one_gb, "read hugepages of NUMA node");

            totals.two_mb = totals.two_mb.saturating_add(two_mb);
            totals.one_gb = totals.one_gb.saturating_add(one_gb);
        }

        Ok(totals)
    }

    /// The scaling limits and base frequency of one CPU.
    pub(crate) fn cpu_frequencies(&self, cpu: CpuId) -> crate::Result<CpuFrequencies> {
        let cpufreq = self.path(&format!("devices/system/cpu/cpu{cpu}/cpufreq"));

        if !self.host.exists(&cpufreq) {
            return Err(Error::unexpected_output(
                cpufreq.display().to_string(),
                String::new(),
                format!("no cpufreq directory for CPU {cpu}"),
            ));
        }

        Ok(CpuFrequencies {
            min: read_u64(self.host, &cpufreq.join("scaling_min_freq"))?,
            max: read_u64(self.host, &cpufreq.join("scaling_max_freq"))?,
            base: read_u64(self.host, &cpufreq.join("base_frequency"))?,
        })
    }

    /// Whether any IOMMU unit has devices attached, which is only the case if the IOMMU was
    /// enabled at boot.
    pub(crate) fn iommu_enabled(&self) -> crate::Result<bool> {
        let iommu_class = self.path("class/iommu");

        if !self.host.exists(&iommu_class) {
            return Ok(false);
        }

        let units = self
            .host
            .read_dir(&iommu_class)
            .map_err(|source| Error::Read {
                path: iommu_class.clone(),
                source,
            })?;

        for unit in units {
            let devices = unit.join("devices");

            if !self.host.exists(&devices) {
                continue;
            }

            let attached = self
                .host
                .read_dir(&devices)
                .map_err(|source| Error::Read {
                    path: devices.clone(),
                    source,
                })?;

            if !attached.is_empty() {
                debug!(unit = %unit.display(), count = attached.len(), "IOMMU unit has devices");
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}
