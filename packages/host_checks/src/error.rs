use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that prevent a check from collecting the values it compares.
///
/// A disagreement between collected values is not an `Error`; see [`CheckError::Mismatch`].
///
/// [`CheckError::Mismatch`]: crate::CheckError::Mismatch
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A file on the host could not be read.
    #[error("failed to read '{}'", path.display())]
    Read {
        /// The file that could not be read.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An external command could not be started or exited with a failure status.
    #[error("command '{command}' failed: {detail}")]
    Command {
        /// The command line that was executed.
        command: String,

        /// What went wrong, including the command's error output if there was any.
        detail: String,
    },

    /// A file or command produced output in a shape we do not recognize.
    #[error("unexpected output from {origin}: '{output}': {problem}")]
    UnexpectedOutput {
        /// Where the output came from, e.g. a file path or a command line.
        origin: String,

        /// The offending output.
        output: String,

        /// A human-readable description of the problem.
        problem: String,
    },

    /// A CPU list, mask or range list from the host could not be parsed.
    #[error("failed to parse CPU set from {origin}")]
    CpuSet {
        /// Where the CPU set came from.
        origin: String,

        /// The parse failure.
        #[source]
        source: coreset::Error,
    },

    /// The role variables file is not valid.
    #[error("invalid role variables in '{}'", path.display())]
    RoleVars {
        /// The role variables file.
        path: PathBuf,

        /// The deserialization failure.
        #[source]
        source: serde_yaml::Error,
    },
}

impl Error {
    pub(crate) fn unexpected_output(
        origin: impl Into<String>,
        output: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::UnexpectedOutput {
            origin: origin.into(),
            output: output.into(),
            problem: problem.into(),
        }
    }

    pub(crate) fn cpu_set(origin: impl Into<String>, source: coreset::Error) -> Self {
        Self::CpuSet {
            origin: origin.into(),
            source,
        }
    }
}

/// A specialized `Result` type for host queries, returning the crate's [`Error`] type as the
/// error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
