// Public API types for convert-cpu-hex.
//
// These types are used by main.rs and exposed via the crate's public API.

use std::fmt;
use std::process::ExitCode;

/// Exit code for a CPU list that contains a token other than a decimal integer.
pub const EXIT_INVALID_CPU_LIST: u8 = 2;

/// Input parameters for the `run` function.
///
/// These are the raw positional arguments, excluding the program name.
#[doc(hidden)]
#[derive(Debug)]
#[allow(
    clippy::exhaustive_structs,
    reason = "This is a hidden struct for internal/test use only"
)]
pub struct RunInput {
    /// Positional arguments. Exactly one, the CPU list, is expected.
    pub args: Vec<String>,
}

/// The outcome of a successful run.
#[doc(hidden)]
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(
    clippy::exhaustive_structs,
    reason = "This is a hidden struct for internal/test use only"
)]
pub struct RunOutcome {
    /// The CPU mask in lowercase hex with a `0x` prefix.
    pub mask: String,
}

/// Errors that can occur during a run.
#[doc(hidden)]
#[derive(Debug)]
#[allow(
    clippy::exhaustive_enums,
    reason = "This is a hidden enum for internal/test use only"
)]
pub enum RunError {
    /// The tool was not invoked with exactly one argument.
    ArgumentCount(usize),
    /// The CPU list contains a token that is not a decimal integer.
    InvalidCpuList(coreset::Error),
    /// The CPU list is well-formed but cannot be converted, e.g. a CPU ID is out of range.
    UnconvertibleCpuList(coreset::Error),
}

impl RunError {
    /// The process exit code that automation can branch on.
    ///
    /// Only an invalid CPU list has a distinct code. Anything else is a generic failure.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::ArgumentCount(_) | Self::UnconvertibleCpuList(_) => ExitCode::FAILURE,
            Self::InvalidCpuList(_) => ExitCode::from(EXIT_INVALID_CPU_LIST),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentCount(count) => {
                write!(f, "Incorrect arguments specified: expected 1, got {count}")
            }
            Self::InvalidCpuList(e) | Self::UnconvertibleCpuList(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ArgumentCount(_) => None,
            Self::InvalidCpuList(e) | Self::UnconvertibleCpuList(e) => Some(e),
        }
    }
}
