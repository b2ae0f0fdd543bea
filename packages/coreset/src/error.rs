use std::num::ParseIntError;

use thiserror::Error;

/// Errors that can occur when converting between CPU set representations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A token in a list, mask or range string is not well-formed per its grammar.
    #[error("invalid CPU set input: '{invalid_value}' is invalid: {problem}")]
    InvalidInput {
        /// The specific value that was invalid. This is either the entire input string
        /// or the single token that failed to parse, depending on the problem.
        invalid_value: String,

        /// A human-readable description of the problem.
        problem: String,

        /// The integer parsing failure behind the problem, if any.
        #[source]
        cause: Option<ParseIntError>,
    },

    /// A token is a well-formed decimal integer but too large to be a CPU ID.
    #[error("invalid CPU set input: CPU ID '{invalid_value}' is out of range")]
    OutOfRange {
        /// The token that does not fit a CPU ID.
        invalid_value: String,

        /// The integer parsing failure.
        #[source]
        cause: ParseIntError,
    },
}

impl Error {
    pub(crate) fn new(invalid_value: impl Into<String>, problem: impl Into<String>) -> Self {
        Self::InvalidInput {
            invalid_value: invalid_value.into(),
            problem: problem.into(),
            cause: None,
        }
    }

    pub(crate) fn caused_by(
        invalid_value: impl Into<String>,
        problem: impl Into<String>,
        cause: ParseIntError,
    ) -> Self {
        Self::InvalidInput {
            invalid_value: invalid_value.into(),
            problem: problem.into(),
            cause: Some(cause),
        }
    }

    pub(crate) fn out_of_range(invalid_value: impl Into<String>, cause: ParseIntError) -> Self {
        Self::OutOfRange {
            invalid_value: invalid_value.into(),
            cause,
        }
    }
}

/// A specialized `Result` type for CPU set conversions, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
