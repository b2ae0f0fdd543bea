use itertools::Itertools;

use crate::{CpuId, CpuMask, Error};

/// Parses a comma-separated list of decimal CPU IDs, e.g. `4,7,9,19,25`.
///
/// Every token must consist only of ASCII digits: no signs, no whitespace and no empty tokens.
/// A token that does so but does not fit a [`CpuId`] is [`Error::OutOfRange`] rather than
/// [`Error::InvalidInput`]. The IDs are returned in the order given, duplicates included.
///
/// # Example
///
/// ```
/// assert_eq!(coreset::parse_list("9,4,4").unwrap(), vec![9, 4, 4]);
/// assert!(coreset::parse_list("4, 7").is_err());
/// ```
pub fn parse_list(list: &str) -> crate::Result<Vec<CpuId>> {
    list.split(',').map(parse_cpu_id).collect()
}

/// Converts a comma-separated list of decimal CPU IDs into a hexadecimal bitmask.
///
/// The output is lowercase, prefixed with `0x` and has no leading zero padding. Token order
/// does not matter and duplicate IDs are idempotent.
///
/// # Example
///
/// ```
/// assert_eq!(coreset::list_to_mask("4,7,9,19,25").unwrap(), "0x2080290");
/// assert_eq!(coreset::list_to_mask("7,4,4").unwrap(), "0x90");
/// ```
pub fn list_to_mask(list: &str) -> crate::Result<String> {
    let mask: CpuMask = parse_list(list)?.into_iter().collect();

    Ok(mask.to_string())
}

/// Emits CPU IDs as a comma-separated list, in the order given.
pub fn emit_list(cpu_ids: impl IntoIterator<Item = CpuId>) -> String {
    cpu_ids.into_iter().join(",")
}

/// Parses a single decimal CPU ID token, accepting ASCII digits only.
pub(crate) fn parse_cpu_id(token: &str) -> crate::Result<CpuId> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::new(token, "token is not a decimal integer"));
    }

    token
        .parse::<CpuId>()
        .map_err(|inner| Error::out_of_range(token, inner))
}
