// Real host implementation that delegates to std::fs and std::process.
//
// This is a trivial forwarder to system APIs and is excluded from coverage and mutation testing.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::pal::{CommandOutput, Host};

/// Real host implementation that uses the operating system of the machine we run on.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetHost;

// Trivial forwarder to system APIs - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Host for BuildTargetHost {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect()
    }

    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
