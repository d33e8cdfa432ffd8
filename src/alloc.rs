//! The single allocation behind a non-empty table.
//!
//! ```text
//! offset 0                      metadata_offset
//! +----------------------------+-------------------------------+--------+
//! | bucket 0 | ... | bucket n-1 | meta 0 | ... | meta n-1        | guards |
//! +----------------------------+-------------------------------+--------+
//! ```
//!
//! Buckets start at offset 0 and inherit the allocation's alignment, which is
//! `max(align_of(bucket), align_of::<u16>())`. Metadata starts at the first
//! `u16`-aligned offset after the last bucket and has `n + GUARD_WORDS`
//! words: the first guard word holds `SCAN_SENTINEL`, the rest are zero.

use crate::error::TableError;
use crate::metadata::{GUARD_WORDS, SCAN_SENTINEL};
use core::alloc::Layout;
use core::mem::{align_of, size_of};
use core::ptr::{self, NonNull};

/// Byte layout of the combined allocation for a given bucket count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TableLayout {
    pub(crate) layout: Layout,
    pub(crate) metadata_offset: usize,
}

impl TableLayout {
    pub(crate) fn for_buckets(bucket: Layout, bucket_count: usize) -> Result<Self, TableError> {
        let meta_align = align_of::<u16>();
        let buckets_size = bucket
            .size()
            .checked_mul(bucket_count)
            .ok_or(TableError::CapacityOverflow)?;
        let metadata_offset = buckets_size
            .checked_add(meta_align - 1)
            .ok_or(TableError::CapacityOverflow)?
            & !(meta_align - 1);
        let metadata_size = bucket_count
            .checked_add(GUARD_WORDS)
            .and_then(|words| words.checked_mul(size_of::<u16>()))
            .ok_or(TableError::CapacityOverflow)?;
        let size = metadata_offset
            .checked_add(metadata_size)
            .ok_or(TableError::CapacityOverflow)?;
        let layout = Layout::from_size_align(size, bucket.align().max(meta_align))
            .map_err(|_| TableError::CapacityOverflow)?;
        Ok(Self {
            layout,
            metadata_offset,
        })
    }
}

/// Pointers into a freshly allocated table region.
pub(crate) struct Storage {
    pub(crate) buckets: NonNull<u8>,
    pub(crate) metadata: NonNull<u16>,
}

/// Allocate storage for `bucket_count` buckets (a nonzero power of two).
/// Bucket bytes are uninitialized; every metadata word is empty except the
/// scan sentinel.
pub(crate) fn allocate(bucket: Layout, bucket_count: usize) -> Result<Storage, TableError> {
    debug_assert!(bucket_count.is_power_of_two());
    let table = TableLayout::for_buckets(bucket, bucket_count)?;
    // SAFETY: the layout always includes the guard words, so its size is
    // nonzero.
    let raw = unsafe { std::alloc::alloc(table.layout) };
    let Some(buckets) = NonNull::new(raw) else {
        tracing::warn!(
            bytes = table.layout.size(),
            bucket_count,
            "table allocation failed"
        );
        return Err(TableError::AllocError {
            layout: table.layout,
        });
    };
    // SAFETY: `metadata_offset` and the metadata words lie inside the
    // allocation and the offset is u16-aligned.
    unsafe {
        let metadata = buckets.as_ptr().add(table.metadata_offset).cast::<u16>();
        ptr::write_bytes(metadata, 0, bucket_count + GUARD_WORDS);
        metadata.add(bucket_count).write(SCAN_SENTINEL);
        Ok(Storage {
            buckets,
            metadata: NonNull::new_unchecked(metadata),
        })
    }
}

/// Release storage obtained from `allocate` with the same arguments.
///
/// # Safety
/// `buckets` must come from `allocate(bucket, bucket_count)` and must not be
/// used afterwards. Payloads are not dropped.
pub(crate) unsafe fn deallocate(buckets: NonNull<u8>, bucket: Layout, bucket_count: usize) {
    // The layout was computed successfully at allocation time.
    if let Ok(table) = TableLayout::for_buckets(bucket, bucket_count) {
        std::alloc::dealloc(buckets.as_ptr(), table.layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: metadata follows the buckets at a u16-aligned offset and
    /// the allocation is aligned for the bucket type.
    #[test]
    fn layout_regions() {
        let t = TableLayout::for_buckets(Layout::new::<[u8; 3]>(), 8).unwrap();
        assert_eq!(t.metadata_offset, 24);
        assert_eq!(t.layout.size(), 24 + (8 + GUARD_WORDS) * 2);
        assert_eq!(t.layout.align(), 2);

        let t = TableLayout::for_buckets(Layout::new::<u8>(), 8).unwrap();
        assert_eq!(t.metadata_offset, 8);

        let t = TableLayout::for_buckets(Layout::new::<(u64, u32)>(), 16).unwrap();
        assert_eq!(t.metadata_offset, 16 * 16);
        assert_eq!(t.layout.align(), align_of::<u64>());
    }

    /// Invariant: zero-sized buckets still get the metadata region.
    #[test]
    fn layout_zero_sized_bucket() {
        let t = TableLayout::for_buckets(Layout::new::<()>(), 8).unwrap();
        assert_eq!(t.metadata_offset, 0);
        assert_eq!(t.layout.size(), (8 + GUARD_WORDS) * 2);
    }

    /// Invariant: oversized requests report overflow rather than wrapping.
    #[test]
    fn layout_overflow() {
        let r = TableLayout::for_buckets(Layout::new::<u64>(), usize::MAX / 4);
        assert_eq!(r, Err(TableError::CapacityOverflow));
    }

    /// Invariant: fresh metadata is all empty with the sentinel right after
    /// the last bucket.
    #[test]
    fn allocate_initializes_metadata() {
        let bucket = Layout::new::<u32>();
        let s = allocate(bucket, 8).unwrap();
        let meta = unsafe { core::slice::from_raw_parts(s.metadata.as_ptr(), 8 + GUARD_WORDS) };
        assert!(meta[..8].iter().all(|&m| m == 0));
        assert_eq!(meta[8], SCAN_SENTINEL);
        assert!(meta[9..].iter().all(|&m| m == 0));
        assert_eq!(s.buckets.as_ptr() as usize % bucket.align(), 0);
        unsafe { deallocate(s.buckets, bucket, 8) };
    }
}
