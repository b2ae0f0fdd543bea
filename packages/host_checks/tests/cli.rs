//! Integration tests for the verify-host binary against a fake sysfs tree, using only the
//! checks that need no running OVS.

#![cfg(not(miri))]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const VARS: &str = "\
skip_ovs_dpdk_config: false
ovs_dpdk_nr_2m_pages: 0
ovs_dpdk_nr_1g_pages: '4'
sst_bf_profile: FREQUENCY_VAR_HIGH_SHARED
";

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A host with one NUMA node holding four 1G hugepages and one IOMMU device.
fn fake_host(vars: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let sysfs = dir.path().join("sys");

    write(&sysfs, "devices/system/node/online", "0\n");
    write(
        &sysfs,
        "devices/system/node/node0/hugepages/hugepages-2048kB/nr_hugepages",
        "0\n",
    );
    write(
        &sysfs,
        "devices/system/node/node0/hugepages/hugepages-1048576kB/nr_hugepages",
        "4\n",
    );
    write(&sysfs, "class/iommu/dmar0/devices/0000:00:02.0", "");
    write(dir.path(), "vars.yaml", vars);

    dir
}

fn run_tool(host: &TempDir, checks: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_verify-host"));

    command
        .arg("--vars")
        .arg(host.path().join("vars.yaml"))
        .arg("--sysfs-root")
        .arg(host.path().join("sys"))
        .env_remove("RUST_LOG");

    for check in checks {
        command.args(["--check", check]);
    }

    command.output().expect("failed to launch verify-host")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn consistent_host_passes() {
    let host = fake_host(VARS);

    let output = run_tool(&host, &["hugepages", "iommu"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "PASS hugepages\nPASS iommu\n");
}

#[test]
fn mismatch_fails_and_is_reported() {
    let host = fake_host(&VARS.replace("'4'", "8"));

    let output = run_tool(&host, &["hugepages", "iommu"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "FAIL hugepages: 1G hugepages mismatch: expected 8, observed 4\nPASS iommu\n"
    );
}

#[test]
fn hugepages_fail_when_role_wrote_no_counts() {
    let host = fake_host(
        "skip_ovs_dpdk_config: false\nsst_bf_profile: FREQUENCY_VAR_HIGH_SHARED\n",
    );
    write(
        &host.path().join("sys"),
        "devices/system/node/node0/hugepages/hugepages-1048576kB/nr_hugepages",
        "0\n",
    );

    let output = run_tool(&host, &["hugepages"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("FAIL hugepages: "));
    assert!(stdout(&output).contains("is not defined"));
}

#[test]
fn missing_iommu_fails() {
    let host = fake_host(VARS);
    fs::remove_dir_all(host.path().join("sys/class/iommu")).unwrap();

    let output = run_tool(&host, &["iommu"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("FAIL iommu: "));
}

#[test]
fn skipped_checks_do_not_fail() {
    let host = fake_host(&VARS.replace(
        "skip_ovs_dpdk_config: false",
        "skip_ovs_dpdk_config: true",
    ));

    let output = run_tool(&host, &["hugepages", "sst-bf-profile"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout(&output),
        "SKIP hugepages: the role skipped OVS-DPDK configuration\n\
         SKIP sst-bf-profile: no SST-BF helper script given\n"
    );
}

#[test]
fn missing_vars_file_fails() {
    let host = fake_host(VARS);
    fs::remove_file(host.path().join("vars.yaml")).unwrap();

    let output = run_tool(&host, &["iommu"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("vars.yaml"));
}

#[test]
fn unknown_check_is_rejected() {
    let host = fake_host(VARS);

    let output = run_tool(&host, &["bogus"]);

    assert_ne!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("bogus"));
}
