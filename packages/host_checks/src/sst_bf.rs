//! SST-BF (Speed Select Technology - Base Frequency) profiles and the discovery of high and
//! normal priority cores.

use std::path::Path;

use coreset::CpuId;
use serde::Deserialize;
use tracing::debug;

use crate::Error;
use crate::pal::Host;
use crate::probe::check_output;

/// How the role configured the frequencies of high and normal priority cores.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum SstBfProfile {
    /// Every core runs fixed at its base frequency; high priority cores are dedicated.
    FrequencyFixedHighDedicated,
    /// Every core runs fixed at its base frequency; high priority cores are shared.
    FrequencyFixedHighShared,
    /// Cores scale within a per-priority range; high priority cores are dedicated.
    FrequencyVarHighDedicated,
    /// Cores scale within a per-priority range; high priority cores are shared.
    FrequencyVarHighShared,
}

/// Scaling limits of a core, in kHz.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct FrequencyRange {
    pub(crate) min: u64,
    pub(crate) max: u64,
}

/// What the frequencies of each core must look like under a profile.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum FrequencyExpectation {
    /// Minimum and maximum both equal the base frequency of the core.
    PinnedToBase,
    /// Minimum and maximum equal fixed values that depend on the priority of the core.
    Scaling {
        high: FrequencyRange,
        normal: FrequencyRange,
    },
}

// These values have only been validated on Xeon 6230N.
const VARIABLE_HIGH: FrequencyRange = FrequencyRange {
    min: 2_700_000,
    max: 3_900_000,
};
const VARIABLE_NORMAL: FrequencyRange = FrequencyRange {
    min: 800_000,
    max: 2_100_000,
};

impl SstBfProfile {
    pub(crate) fn expectation(self) -> FrequencyExpectation {
        match self {
            Self::FrequencyFixedHighDedicated | Self::FrequencyFixedHighShared => {
                FrequencyExpectation::PinnedToBase
            }
            Self::FrequencyVarHighDedicated | Self::FrequencyVarHighShared => {
                FrequencyExpectation::Scaling {
                    high: VARIABLE_HIGH,
                    normal: VARIABLE_NORMAL,
                }
            }
        }
    }
}

/// Which cores to ask the SST-BF helper for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CorePriority {
    High,
    Normal,
}

impl CorePriority {
    fn helper_flag(self) -> &'static str {
        match self {
            Self::High => "-l",
            Self::Normal => "-n",
        }
    }
}

/// Asks the `sst_bf.py` helper script which cores have the given priority.
pub(crate) fn priority_cores(
    host: &impl Host,
    script: &Path,
    priority: CorePriority,
) -> crate::Result<Vec<CpuId>> {
    let script = script.display().to_string();
    let output = check_output(host, "python3", &[script.as_str(), priority.helper_flag()])?;

    let cores = parse_core_list(&format!("{script} {}", priority.helper_flag()), &output)?;

    debug!(?priority, cores = %coreset::emit_range_list(cores.iter().copied()), "discovered cores");

    Ok(cores)
}

/// Parses helper output, which must be exactly one newline-terminated line holding a
/// comma-separated list of at least two CPU IDs.
pub(crate) fn parse_core_list(origin: &str, output: &str) -> crate::Result<Vec<CpuId>> {
    let Some(line) = output.strip_suffix('\n').filter(|line| !line.contains('\n')) else {
        return Err(Error::unexpected_output(
            origin,
            output,
            "expected a single line of output",
        ));
    };

    if !line.contains(',') {
        return Err(Error::unexpected_output(
            origin,
            output,
            "expected a comma-separated list of cores",
        ));
    }

    coreset::parse_list(line).map_err(|e| Error::cpu_set(origin, e))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::pal::{CommandOutput, MockHost};

    #[test]
    fn profile_names_match_role_variables() {
        let profile: SstBfProfile = serde_yaml::from_str("FREQUENCY_VAR_HIGH_SHARED").unwrap();
        assert_eq!(profile, SstBfProfile::FrequencyVarHighShared);

        let profile: SstBfProfile =
            serde_yaml::from_str("FREQUENCY_FIXED_HIGH_DEDICATED").unwrap();
        assert_eq!(profile, SstBfProfile::FrequencyFixedHighDedicated);

        serde_yaml::from_str::<SstBfProfile>("FREQUENCY_TURBO").unwrap_err();
    }

    #[test]
    fn fixed_profiles_pin_to_base() {
        assert_eq!(
            SstBfProfile::FrequencyFixedHighShared.expectation(),
            FrequencyExpectation::PinnedToBase
        );
        assert_eq!(
            SstBfProfile::FrequencyFixedHighDedicated.expectation(),
            FrequencyExpectation::PinnedToBase
        );
    }

    #[test]
    fn variable_profiles_scale() {
        let FrequencyExpectation::Scaling { high, normal } =
            SstBfProfile::FrequencyVarHighDedicated.expectation()
        else {
            panic!("variable profile must scale");
        };

        assert_eq!(high.min, 2_700_000);
        assert_eq!(high.max, 3_900_000);
        assert_eq!(normal.min, 800_000);
        assert_eq!(normal.max, 2_100_000);
    }

    #[test]
    fn core_list_smoke_test() {
        assert_eq!(parse_core_list("x", "2,7,12\n").unwrap(), vec![2, 7, 12]);
    }

    #[test]
    fn malformed_core_list_is_error() {
        parse_core_list("x", "2,7,12").unwrap_err();
        parse_core_list("x", "2,7\n12\n").unwrap_err();
        parse_core_list("x", "2\n").unwrap_err();
        parse_core_list("x", "\n").unwrap_err();
        parse_core_list("x", "2,x\n").unwrap_err();
    }

    #[test]
    fn helper_is_invoked_with_priority_flag() {
        let mut mock = MockHost::new();
        mock.expect_run().returning(|program, args| {
            assert_eq!(program, "python3");
            assert_eq!(args, ["/opt/sst_bf/sst_bf.py", "-l"]);

            Ok(CommandOutput {
                success: true,
                stdout: "3,5,9\n".to_string(),
                stderr: String::new(),
            })
        });

        let cores =
            priority_cores(&mock, Path::new("/opt/sst_bf/sst_bf.py"), CorePriority::High).unwrap();

        assert_eq!(cores, vec![3, 5, 9]);
    }
}
