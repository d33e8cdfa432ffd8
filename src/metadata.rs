//! Metadatum bit layout and the probing arithmetic built on it.
//!
//! Every bucket has one `u16` metadatum:
//!
//! ```text
//!  15    12  11  10               0
//! +--------+---+------------------+
//! |  frag  | H |   displacement   |
//! +--------+---+------------------+
//! ```
//!
//! - `frag`: top 4 bits of the key's hash, compared before calling `Eq`.
//! - `H`: set when the bucket's occupant lives in its own home bucket.
//! - `displacement`: quadratic-probe step of the next bucket in this chain,
//!   or `DISPLACEMENT_MASK` when this bucket ends the chain.
//!
//! An all-zero word is an empty bucket. An occupied bucket is never zero:
//! its displacement is either the chain end marker or a step >= 1.

use crate::error::TableError;

pub(crate) const EMPTY: u16 = 0x0000;
pub(crate) const HASH_FRAG_MASK: u16 = 0xF000;
pub(crate) const IN_HOME_BUCKET_MASK: u16 = 0x0800;
pub(crate) const DISPLACEMENT_MASK: u16 = 0x07FF;

/// Written to the first guard word so full-table scans stop at the end.
pub(crate) const SCAN_SENTINEL: u16 = 0x0001;

/// Metadata words allocated past the last bucket so that a 4-lane read
/// starting at any real bucket stays in bounds.
pub(crate) const GUARD_WORDS: usize = 4;

pub(crate) const MIN_NONZERO_BUCKET_COUNT: usize = 8;

// Maximum load factor, as a fraction: 0.9.
const MAX_LOAD_NUM: u128 = 9;
const MAX_LOAD_DEN: u128 = 10;

#[inline]
pub(crate) fn hash_frag(hash: u64) -> u16 {
    (hash >> 48) as u16 & HASH_FRAG_MASK
}

/// Offset from the home bucket of the `displacement`-th probe. Triangular
/// numbers visit every bucket of a power-of-two table before repeating.
#[inline]
pub(crate) fn quadratic(displacement: u16) -> usize {
    let d = displacement as usize;
    (d * d + d) / 2
}

#[inline]
pub(crate) fn is_in_home_bucket(metadatum: u16) -> bool {
    metadatum & IN_HOME_BUCKET_MASK != 0
}

#[inline]
pub(crate) fn displacement(metadatum: u16) -> u16 {
    metadatum & DISPLACEMENT_MASK
}

#[inline]
pub(crate) fn is_chain_end(metadatum: u16) -> bool {
    metadatum & DISPLACEMENT_MASK == DISPLACEMENT_MASK
}

/// Index (in memory order) of the first nonzero `u16` lane of four
/// consecutive metadata words read as one native-endian `u64`.
/// `group` must be nonzero.
#[inline]
pub(crate) fn first_nonzero_u16(group: u64) -> usize {
    debug_assert_ne!(group, 0);
    if cfg!(target_endian = "little") {
        group.trailing_zeros() as usize / 16
    } else {
        group.leading_zeros() as usize / 16
    }
}

/// Whether `len` keys in `buckets` buckets would exceed the load factor.
#[inline]
pub(crate) fn exceeds_max_load(len: usize, buckets: usize) -> bool {
    len as u128 * MAX_LOAD_DEN > buckets as u128 * MAX_LOAD_NUM
}

/// Smallest power-of-two bucket count that holds `size` keys within the
/// load factor. Zero keys need zero buckets.
pub(crate) fn min_bucket_count_for_size(size: usize) -> Result<usize, TableError> {
    if size == 0 {
        return Ok(0);
    }
    let mut bucket_count = MIN_NONZERO_BUCKET_COUNT;
    while exceeds_max_load(size, bucket_count) {
        bucket_count = bucket_count
            .checked_mul(2)
            .ok_or(TableError::CapacityOverflow)?;
    }
    Ok(bucket_count)
}
