#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Conversions between the textual forms of a CPU set used when pinning workloads to cores:
//!
//! * **List form** - comma-separated decimal CPU IDs, e.g. `4,7,9,19,25`. This is what
//!   configuration tooling usually deals in.
//! * **Mask form** - a hexadecimal bitmask where bit *i* means CPU *i* is a member, e.g.
//!   `0x2080290`. Open vSwitch expects its `pmd-cpu-mask` and `dpdk-lcore-mask` in this form.
//! * **Range form** - comma-separated IDs or inclusive `low-high` ranges, e.g. `0-1,4-5`. The
//!   Linux kernel emits this form in sysfs files such as `/sys/devices/system/cpu/isolated`.
//!
//! All conversions are pure functions over strings. Malformed input is rejected with
//! [`Error::InvalidInput`], and a well-formed CPU ID too large for [`CpuId`] with
//! [`Error::OutOfRange`]. Neither yields a partial result.
//!
//! # Example
//!
//! ```
//! let mask = coreset::list_to_mask("4,7,9,19,25").unwrap();
//! assert_eq!(mask, "0x2080290");
//!
//! assert_eq!(coreset::mask_to_list(&mask).unwrap(), vec![4, 7, 9, 19, 25]);
//!
//! let isolated = coreset::range_list_to_list("4-5,7").unwrap();
//! assert_eq!(isolated, vec![4, 5, 7]);
//! ```

mod error;
mod list;
mod mask;
mod range;

pub use error::*;
pub use list::{emit_list, list_to_mask, parse_list};
pub use mask::*;
pub use range::*;

/// Identifies a logical CPU.
pub type CpuId = u32;

/// Converts a hexadecimal mask (with or without `0x`) into its member CPU IDs.
///
/// The result is strictly ascending because bits are scanned from the least significant
/// upward. A zero mask yields an empty result.
///
/// # Example
///
/// ```
/// assert_eq!(coreset::mask_to_list("0x90").unwrap(), vec![4, 7]);
/// assert_eq!(coreset::mask_to_list("0").unwrap(), Vec::<u32>::new());
/// ```
pub fn mask_to_list(mask: &str) -> crate::Result<Vec<CpuId>> {
    Ok(mask.parse::<CpuMask>()?.iter().collect())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_sorted_set() {
        let lists = ["0", "25,4,19,7,9", "3,3,1", "64,0,63", "1000,2,999"];

        for list in lists {
            let mask = list_to_mask(list).unwrap();

            let mut expected = parse_list(list).unwrap();
            expected.sort_unstable();
            expected.dedup();

            assert_eq!(mask_to_list(&mask).unwrap(), expected, "{list} via {mask}");
        }
    }

    #[test]
    fn empty_mask_has_no_members() {
        assert_eq!(mask_to_list("0x0").unwrap(), Vec::<CpuId>::new());
        assert_eq!(mask_to_list("0").unwrap(), Vec::<CpuId>::new());
    }

    #[test]
    fn garbage_mask_is_error() {
        let error = mask_to_list("0xzz").unwrap_err();

        assert!(matches!(error, Error::InvalidInput { .. }));
    }

    #[test]
    fn isolated_range_matches_pmd_mask() {
        let isolated = range_list_to_list("4-5,40-41").unwrap();
        let pmd = mask_to_list("0x30000000030").unwrap();

        assert_eq!(isolated, pmd);
    }
}
