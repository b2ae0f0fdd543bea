// Host trait abstraction for mocking in tests.

use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

/// Captured result of a finished external command.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct CommandOutput {
    /// Whether the command exited with a zero status.
    pub(crate) success: bool,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

/// Abstraction over the host operations used by the checks.
///
/// This trait is automatically mocked by mockall in test builds, generating `MockHost`.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Host: Debug + Send + Sync + 'static {
    /// Reads the entire contents of a file as UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Returns `true` if the given path exists (file or directory).
    fn exists(&self, path: &Path) -> bool;

    /// Lists the entries of a directory, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Runs a program to completion, capturing its output.
    ///
    /// A non-zero exit status is not an error at this level; it is reported via
    /// [`CommandOutput::success`].
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}
