#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Converts a comma-separated list of CPU IDs into the hexadecimal CPU mask format expected by
//! tools such as Open vSwitch (`other_config:pmd-cpu-mask`).
//!
//! ```text
//! $ convert-cpu-hex 4,7,9,19,25
//! 0x2080290
//! ```
//!
//! Exit codes:
//!
//! * `0` - success, the mask is printed on standard output.
//! * `2` - a token in the list is not a decimal integer. Nothing is printed.
//! * `1` - any other failure, e.g. the wrong number of arguments or a CPU ID too large to
//!   represent.
//!
//! The binary entry point is in `main.rs`; this crate holds the logic behind it.

mod types;

use tracing::debug;
pub use types::*;

/// Core logic of the tool, extracted for testability.
///
/// This function contains all the business logic without any process-global dependencies
/// like `std::env::args()`, making it suitable for direct testing.
#[doc(hidden)]
pub fn run(input: &RunInput) -> Result<RunOutcome, RunError> {
    let [cpu_list] = input.args.as_slice() else {
        return Err(RunError::ArgumentCount(input.args.len()));
    };

    let mask = coreset::list_to_mask(cpu_list).map_err(|e| match e {
        coreset::Error::InvalidInput { .. } => RunError::InvalidCpuList(e),
        _ => RunError::UnconvertibleCpuList(e),
    })?;

    debug!(%cpu_list, %mask, "converted CPU list to mask");

    Ok(RunOutcome { mask })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn input(args: &[&str]) -> RunInput {
        RunInput {
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn converts_single_list() {
        let outcome = run(&input(&["4,7,9,19,25"])).unwrap();

        assert_eq!(outcome.mask, "0x2080290");
    }

    #[test]
    fn non_digit_token_is_invalid_cpu_list() {
        let error = run(&input(&["4,x,9"])).unwrap_err();

        assert!(matches!(error, RunError::InvalidCpuList(_)));
    }

    #[test]
    fn oversized_cpu_id_is_not_invalid_cpu_list() {
        let error = run(&input(&["4,4294967296"])).unwrap_err();

        assert!(matches!(error, RunError::UnconvertibleCpuList(_)));
    }

    #[test]
    fn wrong_argument_count_is_argument_error() {
        assert!(matches!(
            run(&input(&[])).unwrap_err(),
            RunError::ArgumentCount(0)
        ));
        assert!(matches!(
            run(&input(&["1", "2"])).unwrap_err(),
            RunError::ArgumentCount(2)
        ));
    }
}
