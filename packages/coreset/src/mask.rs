use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::{CpuId, Error};

const WORD_BITS: u32 = u64::BITS;
const NIBBLE_BITS: u32 = 4;
const NIBBLES_PER_WORD: usize = (WORD_BITS / NIBBLE_BITS) as usize;

/// Largest number of significant hex digits a mask may have: one bit per possible [`CpuId`].
const MAX_SIGNIFICANT_DIGITS: u64 = (CpuId::MAX as u64 + 1) / NIBBLE_BITS as u64;

/// A set of CPU IDs in bitmask form, where bit *i* is set if CPU *i* is a member.
///
/// The mask has no implicit width: it grows to fit the highest member and never carries
/// zero bits above it, so two masks with the same members always compare equal.
///
/// Masks up to 256 CPUs wide are stored inline without a heap allocation.
///
/// # Example
///
/// ```
/// use coreset::CpuMask;
///
/// let mask: CpuMask = "0x2080290".parse().unwrap();
/// assert_eq!(mask.iter().collect::<Vec<_>>(), vec![4, 7, 9, 19, 25]);
/// assert_eq!(mask.to_string(), "0x2080290");
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct CpuMask {
    // Least significant word first. The last word is never zero.
    words: SmallVec<[u64; 4]>,
}

impl CpuMask {
    /// Creates an empty mask.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mask with the given CPUs as members. Duplicates are idempotent.
    #[must_use]
    pub fn from_cpu_ids(cpu_ids: impl IntoIterator<Item = CpuId>) -> Self {
        cpu_ids.into_iter().collect()
    }

    /// Adds a CPU to the mask.
    pub fn insert(&mut self, cpu_id: CpuId) {
        let (word_index, bit) = Self::locate(cpu_id);

        if self.words.len() <= word_index {
            self.words.resize(word_index + 1, 0);
        }

        if let Some(word) = self.words.get_mut(word_index) {
            *word |= 1 << bit;
        }
    }

    /// Whether the CPU is a member of the mask.
    #[must_use]
    pub fn contains(&self, cpu_id: CpuId) -> bool {
        let (word_index, bit) = Self::locate(cpu_id);

        self.words
            .get(word_index)
            .is_some_and(|word| word & (1 << bit) != 0)
    }

    /// Whether the mask has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The number of CPUs in the mask.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates over the members in strictly ascending order.
    pub fn iter(&self) -> impl Iterator<Item = CpuId> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_index, &word)| WordBits {
                base: word_base(word_index),
                remaining: word,
            })
    }

    fn locate(cpu_id: CpuId) -> (usize, u32) {
        ((cpu_id / WORD_BITS) as usize, cpu_id % WORD_BITS)
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

fn word_base(word_index: usize) -> CpuId {
    // Every word index stems from a valid CpuId, so this cannot overflow.
    CpuId::try_from(word_index)
        .ok()
        .and_then(|index| index.checked_mul(WORD_BITS))
        .expect("mask words never extend beyond the CpuId range")
}

/// Yields the set bits of one mask word, lowest first.
struct WordBits {
    base: CpuId,
    remaining: u64,
}

impl Iterator for WordBits {
    type Item = CpuId;

    fn next(&mut self) -> Option<CpuId> {
        if self.remaining == 0 {
            return None;
        }

        let bit = self.remaining.trailing_zeros();
        // Clear the lowest set bit.
        self.remaining &= self.remaining - 1;

        Some(self.base + bit)
    }
}

impl FromIterator<CpuId> for CpuMask {
    fn from_iter<T: IntoIterator<Item = CpuId>>(iter: T) -> Self {
        let mut mask = Self::new();

        for cpu_id in iter {
            mask.insert(cpu_id);
        }

        mask
    }
}

impl FromStr for CpuMask {
    type Err = Error;

    /// Parses a hexadecimal mask, with or without a leading `0x`. Hex digits may be upper
    /// or lower case.
    fn from_str(s: &str) -> crate::Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.is_empty() {
            return Err(Error::new(s, "mask has no hexadecimal digits"));
        }

        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::new(s, "mask is not a hexadecimal number"));
        }

        let significant = digits.trim_start_matches('0');

        if significant.len() as u64 > MAX_SIGNIFICANT_DIGITS {
            return Err(Error::new(s, "mask has bits beyond the largest CPU ID"));
        }

        // Walk the digits from the least significant end, one word-sized chunk at a time.
        let words = significant
            .as_bytes()
            .rchunks(NIBBLES_PER_WORD)
            .map(|chunk| {
                // The chunk is pure ASCII hex, so both conversions succeed.
                let chunk = std::str::from_utf8(chunk).unwrap_or_default();
                u64::from_str_radix(chunk, 16)
                    .map_err(|inner| Error::caused_by(s, "mask is not a hexadecimal number", inner))
            })
            .collect::<crate::Result<SmallVec<[u64; 4]>>>()?;

        let mut mask = Self { words };
        mask.trim();

        Ok(mask)
    }
}

impl fmt::LowerHex for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }

        let mut words = self.words.iter().rev();

        let Some(highest) = words.next() else {
            return f.write_str("0");
        };

        write!(f, "{highest:x}")?;

        for word in words {
            write!(f, "{word:016x}")?;
        }

        Ok(())
    }
}

impl fmt::Display for CpuMask {
    /// Formats the mask as lowercase hex with a `0x` prefix and no zero padding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:#x}")
    }
}
