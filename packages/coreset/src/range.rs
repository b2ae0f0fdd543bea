use itertools::Itertools;

use crate::list::parse_cpu_id;
use crate::{CpuId, Error};

/// Parses a Linux range list such as `0-1,4-5` or `3`, as written to sysfs files like
/// `/sys/devices/system/cpu/isolated`.
///
/// Each comma-separated token is either a single decimal ID or an inclusive `low-high` range.
/// Tokens are expanded in the order given: the result is neither sorted nor deduplicated, so
/// well-ordered input yields ascending output.
///
/// An empty string is valid input and returns an empty result.
///
/// # Example
///
/// ```
/// assert_eq!(coreset::range_list_to_list("0-1,4-5").unwrap(), vec![0, 1, 4, 5]);
/// assert_eq!(coreset::range_list_to_list("").unwrap(), Vec::<u32>::new());
/// ```
pub fn range_list_to_list(range_list: &str) -> crate::Result<Vec<CpuId>> {
    if range_list.is_empty() {
        return Ok(Vec::new());
    }

    let mut cpu_ids = Vec::new();

    for token in range_list.split(',') {
        if let Some((low, high)) = token.split_once('-') {
            let low = parse_cpu_id(low)?;
            let high = parse_cpu_id(high)?;

            if low > high {
                return Err(Error::new(token, "range start must be <= end"));
            }

            cpu_ids.extend(low..=high);
        } else {
            cpu_ids.push(parse_cpu_id(token)?);
        }
    }

    Ok(cpu_ids)
}

/// Emits CPU IDs as a compact range list that [`range_list_to_list()`] can parse back.
///
/// The IDs are sorted and deduplicated first, then consecutive runs are collapsed into
/// `low-high` ranges.
///
/// # Example
///
/// ```
/// assert_eq!(coreset::emit_range_list([5, 4, 0, 1, 9]), "0-1,4-5,9");
/// ```
pub fn emit_range_list(cpu_ids: impl IntoIterator<Item = CpuId>) -> String {
    let mut runs: Vec<(CpuId, CpuId)> = Vec::new();

    for cpu_id in cpu_ids.into_iter().sorted_unstable().dedup() {
        match runs.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(cpu_id) => *end = cpu_id,
            _ => runs.push((cpu_id, cpu_id)),
        }
    }

    runs.into_iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .join(",")
}
