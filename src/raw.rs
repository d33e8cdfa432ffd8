//! RawTable: the untyped verstable engine shared by `Dict` and `Set`.
//!
//! The engine never names a key or value type. It sees buckets as
//! `vtable.bucket.size()` bytes, moves them with `copy_nonoverlapping`, drops
//! them through the vtable, and asks the caller for hashes and equality
//! through closures (the same split hashbrown's `HashTable` uses).
//!
//! Chains: every key has a home bucket `hash & mask`. Keys sharing a home
//! bucket form a chain that starts at the home bucket and is linked through
//! the displacement field of each metadatum, in increasing displacement
//! order. The occupant of a home bucket always belongs to that bucket's
//! chain: a displaced key squatting on some other key's home bucket is
//! evicted when that key arrives. A clear in-home flag therefore proves a
//! key is absent without probing.

use crate::alloc::{self, Storage};
use crate::error::TableError;
use crate::metadata::{
    displacement, exceeds_max_load, first_nonzero_u16, hash_frag, is_chain_end,
    is_in_home_bucket, min_bucket_count_for_size, quadratic, DISPLACEMENT_MASK, EMPTY,
    GUARD_WORDS, HASH_FRAG_MASK, IN_HOME_BUCKET_MASK, MIN_NONZERO_BUCKET_COUNT,
};
use core::alloc::Layout;
use core::fmt;
use core::iter::FusedIterator;
use core::mem::{self, ManuallyDrop};
use core::ptr::{self, NonNull};

/// Static description of one bucket shape. Built once per key (and value)
/// type as a `const` and handed to the engine as `&'static`.
#[derive(Debug)]
pub struct BucketVTable {
    pub bucket: Layout,
    pub key_offset: usize,
    /// `None` for key-only buckets.
    pub value_offset: Option<usize>,
    /// `None` when the key has no drop glue.
    pub drop_key: Option<unsafe fn(*mut u8)>,
    /// `None` when there is no value or it has no drop glue.
    pub drop_value: Option<unsafe fn(*mut u8)>,
}

unsafe fn drop_erased<T>(p: *mut u8) {
    ptr::drop_in_place(p.cast::<T>());
}

/// Type-erased destructor for `T`, or `None` if dropping `T` is a no-op.
pub const fn drop_fn<T>() -> Option<unsafe fn(*mut u8)> {
    if mem::needs_drop::<T>() {
        Some(drop_erased::<T>)
    } else {
        None
    }
}

/// Position of an occupied bucket, optionally with its chain's home bucket
/// when the producer already knows it (lookups and inserts do; plain
/// iteration does not).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSlot {
    index: usize,
    home: Option<usize>,
}

impl RawSlot {
    #[cfg_attr(not(any(test, feature = "raw")), allow(dead_code))]
    pub fn index(&self) -> usize {
        self.index
    }
}

enum Placement {
    Inserted(RawSlot),
    Existing(RawSlot),
    Full,
}

// Metadata of tables without storage. Never written: every mutating path
// either bails out on `len == 0` or fails the load check first.
static EMPTY_METADATA: [u16; GUARD_WORDS] = [EMPTY; GUARD_WORDS];

/// The untyped table. Chains link through an 11-bit displacement field,
/// so a chain reaches at most 2046 buckets past its home; more than
/// about two thousand keys sharing one full hash cannot be placed, and
/// inserting them keeps doubling the table until growth fails.
pub struct RawTable {
    len: usize,
    buckets_mask: usize,
    buckets: NonNull<u8>,
    metadata: NonNull<u16>,
    vtable: &'static BucketVTable,
}

impl RawTable {
    /// An empty table with no storage.
    pub fn new(vtable: &'static BucketVTable) -> Self {
        Self {
            len: 0,
            buckets_mask: 0,
            buckets: NonNull::dangling(),
            metadata: NonNull::from(&EMPTY_METADATA).cast::<u16>(),
            vtable,
        }
    }

    fn with_buckets(vtable: &'static BucketVTable, bucket_count: usize) -> Result<Self, TableError> {
        let Storage { buckets, metadata } = alloc::allocate(vtable.bucket, bucket_count)?;
        Ok(Self {
            len: 0,
            buckets_mask: bucket_count - 1,
            buckets,
            metadata,
            vtable,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets: zero or a power of two.
    pub fn buckets(&self) -> usize {
        self.buckets_mask + (self.buckets_mask != 0) as usize
    }

    /// Keys the current storage holds before the next growth.
    pub fn capacity(&self) -> usize {
        (self.buckets() as u128 * 9 / 10) as usize
    }

    #[inline]
    fn meta(&self, i: usize) -> u16 {
        debug_assert!(i <= self.buckets_mask);
        // SAFETY: `i <= buckets_mask` and the metadata region (or the static
        // empty group when `buckets_mask == 0`) covers it.
        unsafe { *self.metadata.as_ptr().add(i) }
    }

    #[inline]
    fn set_meta(&mut self, i: usize, metadatum: u16) {
        debug_assert!(i < self.buckets());
        // SAFETY: only reached with allocated storage and `i` in range.
        unsafe { *self.metadata.as_ptr().add(i) = metadatum }
    }

    #[inline]
    fn bucket_at(&self, i: usize) -> NonNull<u8> {
        // SAFETY: `i` is in range whenever the pointer is dereferenced; for
        // zero-sized buckets the offset is zero.
        unsafe { NonNull::new_unchecked(self.buckets.as_ptr().add(i * self.vtable.bucket.size())) }
    }

    #[inline]
    fn next_in_chain(&self, home: usize, bucket: usize) -> usize {
        (home + quadratic(displacement(self.meta(bucket)))) & self.buckets_mask
    }

    /// Pointer to the bucket payload at `slot`.
    pub fn bucket(&self, slot: RawSlot) -> NonNull<u8> {
        self.bucket_at(slot.index)
    }

    /// Drop a payload that is no longer tracked by metadata.
    unsafe fn drop_payload(&self, bucket: NonNull<u8>) {
        if let Some(drop_key) = self.vtable.drop_key {
            drop_key(bucket.as_ptr().add(self.vtable.key_offset));
        }
        if let (Some(drop_value), Some(offset)) = (self.vtable.drop_value, self.vtable.value_offset) {
            drop_value(bucket.as_ptr().add(offset));
        }
    }

    /// Index of the first occupied bucket at or after `from`, or
    /// `buckets()` if none. Scans four metadata words at a time; the
    /// sentinel guard word stops the scan. Requires allocated storage and
    /// `from <= buckets()`.
    fn next_occupied(&self, mut from: usize) -> usize {
        debug_assert!(self.buckets_mask != 0 && from <= self.buckets());
        loop {
            // SAFETY: `from <= buckets()` so the four words end at most at
            // the last guard word.
            let group = unsafe {
                ptr::read_unaligned(self.metadata.as_ptr().add(from).cast::<u64>())
            };
            if group != 0 {
                return from + first_nonzero_u16(group);
            }
            from += 4;
        }
    }

    /// Deep copy. `copy(src, dst)` must construct a clone of the bucket at
    /// `src` into the uninitialized bucket at `dst`.
    ///
    /// If `copy` panics, the partial copy drops only the buckets it already
    /// built.
    ///
    /// # Safety
    /// `copy` must fully initialize `dst` with a payload of this table's
    /// bucket shape.
    pub unsafe fn try_clone_with(
        &self,
        copy: &mut dyn FnMut(NonNull<u8>, NonNull<u8>),
    ) -> Result<Self, TableError> {
        if self.buckets_mask == 0 {
            return Ok(Self::new(self.vtable));
        }
        let mut new = Self::with_buckets(self.vtable, self.buckets())?;
        for i in 0..self.buckets() {
            let m = self.meta(i);
            if m != EMPTY {
                copy(self.bucket_at(i), new.bucket_at(i));
                new.set_meta(i, m);
                new.len += 1;
            }
        }
        Ok(new)
    }

    /// Drop every payload and empty every bucket; keep the storage.
    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        for i in 0..self.buckets() {
            if self.meta(i) != EMPTY {
                self.set_meta(i, EMPTY);
                self.len -= 1;
                // SAFETY: the bucket was occupied and is now untracked.
                unsafe { self.drop_payload(self.bucket_at(i)) };
            }
        }
        debug_assert_eq!(self.len, 0);
    }

    /// Clear, then release the storage. Idempotent.
    pub fn destroy(&mut self) {
        if self.buckets_mask == 0 {
            return;
        }
        self.clear();
        // SAFETY: every payload has been dropped.
        unsafe { self.free_storage() };
    }

    /// Release the storage without touching payloads and reset to the
    /// storage-less state.
    unsafe fn free_storage(&mut self) {
        if self.buckets_mask != 0 {
            alloc::deallocate(self.buckets, self.vtable.bucket, self.buckets());
        }
        self.len = 0;
        self.buckets_mask = 0;
        self.buckets = NonNull::dangling();
        self.metadata = NonNull::from(&EMPTY_METADATA).cast::<u16>();
    }

    /// Locate the bucket holding a key with `hash` for which `eq` holds.
    pub fn find(&self, hash: u64, eq: &mut dyn FnMut(NonNull<u8>) -> bool) -> Option<RawSlot> {
        let home = hash as usize & self.buckets_mask;
        if !is_in_home_bucket(self.meta(home)) {
            return None;
        }
        let frag = hash_frag(hash);
        let mut bucket = home;
        loop {
            let m = self.meta(bucket);
            if m & HASH_FRAG_MASK == frag && eq(self.bucket_at(bucket)) {
                return Some(RawSlot {
                    index: bucket,
                    home: Some(home),
                });
            }
            if is_chain_end(m) {
                return None;
            }
            bucket = self.next_in_chain(home, bucket);
        }
    }

    /// Insert the bucket at `src` unless `eq` matches a key already in its
    /// chain. Returns the slot and whether `src` was moved in; when an equal
    /// key exists the table is untouched and `src` still owns its payload.
    /// Grows (and retries) as needed.
    ///
    /// # Safety
    /// `src` must point to a valid payload of this table's bucket shape and
    /// `hash` must be `hasher(src)`. On `Ok((_, true))` the payload is owned
    /// by the table and must not be used or dropped through `src`.
    pub unsafe fn find_or_insert(
        &mut self,
        hash: u64,
        src: *const u8,
        eq: &mut dyn FnMut(NonNull<u8>) -> bool,
        hasher: &dyn Fn(NonNull<u8>) -> u64,
    ) -> Result<(RawSlot, bool), TableError> {
        loop {
            match self.insert_raw(hash, src, Some(&mut *eq), hasher) {
                Placement::Inserted(slot) => return Ok((slot, true)),
                Placement::Existing(slot) => return Ok((slot, false)),
                Placement::Full => {
                    let target = if self.buckets_mask == 0 {
                        MIN_NONZERO_BUCKET_COUNT
                    } else {
                        self.buckets()
                            .checked_mul(2)
                            .ok_or(TableError::CapacityOverflow)?
                    };
                    self.rehash(target, hasher)?;
                }
            }
        }
    }

    /// One placement attempt without growth. With `eq == None` the key is
    /// assumed absent (rehash).
    unsafe fn insert_raw(
        &mut self,
        hash: u64,
        src: *const u8,
        eq: Option<&mut dyn FnMut(NonNull<u8>) -> bool>,
        hasher: &dyn Fn(NonNull<u8>) -> u64,
    ) -> Placement {
        let frag = hash_frag(hash);
        let home = hash as usize & self.buckets_mask;

        if !is_in_home_bucket(self.meta(home)) {
            if exceeds_max_load(self.len + 1, self.buckets())
                || (self.meta(home) != EMPTY && !self.evict(home, hasher))
            {
                return Placement::Full;
            }
            self.write_bucket(home, src);
            self.set_meta(home, frag | IN_HOME_BUCKET_MASK | DISPLACEMENT_MASK);
            self.len += 1;
            return Placement::Inserted(RawSlot {
                index: home,
                home: Some(home),
            });
        }

        if let Some(eq) = eq {
            let mut bucket = home;
            loop {
                let m = self.meta(bucket);
                if m & HASH_FRAG_MASK == frag && eq(self.bucket_at(bucket)) {
                    return Placement::Existing(RawSlot {
                        index: bucket,
                        home: Some(home),
                    });
                }
                if is_chain_end(m) {
                    break;
                }
                bucket = self.next_in_chain(home, bucket);
            }
        }

        if exceeds_max_load(self.len + 1, self.buckets()) {
            return Placement::Full;
        }
        let Some((empty, step)) = self.find_first_empty(home) else {
            return Placement::Full;
        };
        let prev = self.find_insert_location_in_chain(home, step);

        self.write_bucket(empty, src);
        self.set_meta(empty, frag | displacement(self.meta(prev)));
        self.set_meta(prev, (self.meta(prev) & !DISPLACEMENT_MASK) | step);
        self.len += 1;
        Placement::Inserted(RawSlot {
            index: empty,
            home: Some(home),
        })
    }

    #[inline]
    unsafe fn write_bucket(&mut self, i: usize, src: *const u8) {
        ptr::copy_nonoverlapping(src, self.bucket_at(i).as_ptr(), self.vtable.bucket.size());
    }

    /// First empty bucket on the probe sequence from `home`, with its
    /// displacement step. `None` once the displacement field would overflow.
    fn find_first_empty(&self, home: usize) -> Option<(usize, u16)> {
        let mut step: u16 = 1;
        let mut offset = 1usize;
        loop {
            let empty = (home + offset) & self.buckets_mask;
            if self.meta(empty) == EMPTY {
                return Some((empty, step));
            }
            step += 1;
            if step == DISPLACEMENT_MASK {
                return None;
            }
            offset += step as usize;
        }
    }

    /// The chain member after which a bucket at displacement `step` must be
    /// linked to keep displacements increasing along the chain.
    fn find_insert_location_in_chain(&self, home: usize, step: u16) -> usize {
        let mut candidate = home;
        loop {
            let d = displacement(self.meta(candidate));
            if d > step {
                return candidate;
            }
            candidate = (home + quadratic(d)) & self.buckets_mask;
        }
    }

    /// Move the displaced occupant of `bucket` to another slot of its own
    /// chain so `bucket` can host the head of its rightful chain. The
    /// metadatum of `bucket` is left stale for the caller to overwrite.
    /// Returns false, without changes, when no slot is reachable.
    unsafe fn evict(&mut self, bucket: usize, hasher: &dyn Fn(NonNull<u8>) -> u64) -> bool {
        let home = hasher(self.bucket_at(bucket)) as usize & self.buckets_mask;
        let Some((empty, step)) = self.find_first_empty(home) else {
            return false;
        };

        let mut prev = home;
        loop {
            let next = self.next_in_chain(home, prev);
            if next == bucket {
                break;
            }
            prev = next;
        }
        self.set_meta(
            prev,
            (self.meta(prev) & !DISPLACEMENT_MASK) | displacement(self.meta(bucket)),
        );

        let prev = self.find_insert_location_in_chain(home, step);
        ptr::copy_nonoverlapping(
            self.bucket_at(bucket).as_ptr(),
            self.bucket_at(empty).as_ptr(),
            self.vtable.bucket.size(),
        );
        self.set_meta(
            empty,
            (self.meta(bucket) & HASH_FRAG_MASK) | displacement(self.meta(prev)),
        );
        self.set_meta(prev, (self.meta(prev) & !DISPLACEMENT_MASK) | step);
        tracing::trace!(from = bucket, to = empty, home, "evicted displaced bucket");
        true
    }

    /// Detach the occupant of `slot` from its chain. Returns the index of the
    /// bucket now holding the detached payload (untracked by metadata) and
    /// whether a cursor at `slot` should advance: `false` means a payload
    /// from a later bucket was moved into `slot` and still needs a visit.
    unsafe fn unlink(&mut self, slot: RawSlot, hasher: &dyn Fn(NonNull<u8>) -> u64) -> (usize, bool) {
        let i = slot.index;
        let m = self.meta(i);

        if is_in_home_bucket(m) && is_chain_end(m) {
            self.set_meta(i, EMPTY);
            self.len -= 1;
            return (i, true);
        }

        let home = match slot.home {
            Some(home) => home,
            None if is_in_home_bucket(m) => i,
            None => hasher(self.bucket_at(i)) as usize & self.buckets_mask,
        };
        self.len -= 1;

        if is_chain_end(m) {
            let mut bucket = home;
            loop {
                let next = self.next_in_chain(home, bucket);
                if next == i {
                    self.set_meta(bucket, self.meta(bucket) | DISPLACEMENT_MASK);
                    self.set_meta(i, EMPTY);
                    return (i, true);
                }
                bucket = next;
            }
        }

        let mut bucket = i;
        let mut prev;
        loop {
            prev = bucket;
            bucket = self.next_in_chain(home, bucket);
            if is_chain_end(self.meta(bucket)) {
                break;
            }
        }
        ptr::swap_nonoverlapping(
            self.bucket_at(i).as_ptr(),
            self.bucket_at(bucket).as_ptr(),
            self.vtable.bucket.size(),
        );
        self.set_meta(
            i,
            (self.meta(i) & !HASH_FRAG_MASK) | (self.meta(bucket) & HASH_FRAG_MASK),
        );
        self.set_meta(prev, self.meta(prev) | DISPLACEMENT_MASK);
        self.set_meta(bucket, EMPTY);
        (bucket, bucket < i)
    }

    /// Remove and drop the occupant of `slot`. Returns whether a cursor at
    /// `slot` should advance (see `retain`).
    pub fn erase_at(&mut self, slot: RawSlot, hasher: &dyn Fn(NonNull<u8>) -> u64) -> bool {
        debug_assert_ne!(self.meta(slot.index), EMPTY);
        // SAFETY: the detached payload is valid and untracked; drop it once.
        unsafe {
            let (payload, advance) = self.unlink(slot, hasher);
            self.drop_payload(self.bucket_at(payload));
            advance
        }
    }

    /// Remove the key matching `hash`/`eq`, dropping its payload.
    pub fn erase(
        &mut self,
        hash: u64,
        eq: &mut dyn FnMut(NonNull<u8>) -> bool,
        hasher: &dyn Fn(NonNull<u8>) -> u64,
    ) -> bool {
        match self.find(hash, eq) {
            Some(slot) => {
                self.erase_at(slot, hasher);
                true
            }
            None => false,
        }
    }

    /// Remove the occupant of `slot`, moving its payload into `dst`.
    /// Returns whether a cursor at `slot` should advance.
    ///
    /// # Safety
    /// `slot` must be occupied and `dst` must be valid for a write of one
    /// bucket. The caller takes ownership of the payload in `dst`.
    pub unsafe fn take_at(
        &mut self,
        slot: RawSlot,
        hasher: &dyn Fn(NonNull<u8>) -> u64,
        dst: *mut u8,
    ) -> bool {
        let (payload, advance) = self.unlink(slot, hasher);
        ptr::copy_nonoverlapping(self.bucket_at(payload).as_ptr(), dst, self.vtable.bucket.size());
        advance
    }

    /// Visit every bucket, erasing those for which `keep` returns false.
    pub fn retain(
        &mut self,
        hasher: &dyn Fn(NonNull<u8>) -> u64,
        keep: &mut dyn FnMut(NonNull<u8>) -> bool,
    ) {
        if self.len == 0 {
            return;
        }
        let end = self.buckets();
        let mut i = self.next_occupied(0);
        while i < end {
            if keep(self.bucket_at(i)) {
                i = self.next_occupied(i + 1);
                continue;
            }
            let advance = self.erase_at(RawSlot { index: i, home: None }, hasher);
            if self.len == 0 {
                return;
            }
            i = self.next_occupied(if advance { i + 1 } else { i });
        }
    }

    pub fn iter(&self) -> RawIter<'_> {
        RawIter {
            table: self,
            next: 0,
            remaining: self.len,
        }
    }

    /// Grow so that `size` keys in total fit without further growth. A
    /// no-op when the current buckets already hold `size` keys.
    pub fn reserve(
        &mut self,
        size: usize,
        hasher: &dyn Fn(NonNull<u8>) -> u64,
    ) -> Result<(), TableError> {
        let bucket_count = min_bucket_count_for_size(size)?;
        if bucket_count <= self.buckets() {
            return Ok(());
        }
        self.rehash(bucket_count, hasher)
    }

    /// Shrink to the smallest bucket count that holds `len` keys; releases
    /// the storage entirely when empty.
    pub fn shrink_to_fit(&mut self, hasher: &dyn Fn(NonNull<u8>) -> u64) -> Result<(), TableError> {
        let bucket_count = min_bucket_count_for_size(self.len)?;
        if bucket_count == self.buckets() {
            return Ok(());
        }
        if bucket_count == 0 {
            tracing::trace!(buckets = self.buckets(), "releasing empty table storage");
            self.destroy();
            return Ok(());
        }
        self.rehash(bucket_count, hasher)
    }

    /// Move every bucket into a fresh table of `bucket_count` buckets,
    /// doubling the target until every key fits.
    fn rehash(
        &mut self,
        mut bucket_count: usize,
        hasher: &dyn Fn(NonNull<u8>) -> u64,
    ) -> Result<(), TableError> {
        tracing::debug!(
            from = self.buckets(),
            to = bucket_count,
            len = self.len,
            "rehashing table"
        );
        loop {
            // The new table only ever holds bitwise copies of our payloads,
            // so it must be freed, never dropped. A panicking hasher leaks it.
            let mut new = ManuallyDrop::new(Self::with_buckets(self.vtable, bucket_count)?);
            for i in 0..self.buckets() {
                if self.meta(i) == EMPTY {
                    continue;
                }
                let src = self.bucket_at(i);
                let hash = hasher(src);
                // SAFETY: `src` is a valid payload; the copy is tracked by
                // `new` only, and `new` is never dropped.
                let placed = unsafe { new.insert_raw(hash, src.as_ptr(), None, hasher) };
                if matches!(placed, Placement::Full) {
                    break;
                }
            }

            if new.len < self.len {
                // SAFETY: `new` holds copies only.
                unsafe { new.free_storage() };
                bucket_count = bucket_count
                    .checked_mul(2)
                    .ok_or(TableError::CapacityOverflow)?;
                tracing::debug!(to = bucket_count, "rehash target too small, doubling");
                continue;
            }

            // SAFETY: every payload now lives in `new`.
            unsafe { self.free_storage() };
            self.len = new.len;
            self.buckets_mask = new.buckets_mask;
            self.buckets = new.buckets;
            self.metadata = new.metadata;
            return Ok(());
        }
    }

    /// Panics unless every structural invariant holds.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self, hasher: &dyn Fn(NonNull<u8>) -> u64) {
        use crate::metadata::SCAN_SENTINEL;

        let n = self.buckets();
        if n == 0 {
            assert_eq!(self.len, 0);
            return;
        }
        assert!(n.is_power_of_two());
        assert!(!exceeds_max_load(self.len, n), "load factor exceeded");
        // SAFETY: the guard words are part of the allocation.
        let guards = unsafe {
            core::slice::from_raw_parts(self.metadata.as_ptr().add(n), GUARD_WORDS)
        };
        assert_eq!(guards[0], SCAN_SENTINEL);
        assert!(guards[1..].iter().all(|&g| g == EMPTY));

        let mut occupied = 0;
        for i in 0..n {
            let m = self.meta(i);
            if m == EMPTY {
                continue;
            }
            occupied += 1;
            let hash = hasher(self.bucket_at(i));
            let home = hash as usize & self.buckets_mask;
            assert_eq!(m & HASH_FRAG_MASK, hash_frag(hash), "fragment of bucket {}", i);
            assert_eq!(is_in_home_bucket(m), home == i, "home flag of bucket {}", i);
            assert!(
                is_in_home_bucket(self.meta(home)),
                "bucket {} has no chain head at {}",
                i,
                home
            );

            let mut bucket = home;
            let mut last_step = 0u16;
            let mut steps = 0;
            while bucket != i {
                let d = displacement(self.meta(bucket));
                assert_ne!(d, DISPLACEMENT_MASK, "bucket {} unreachable from {}", i, home);
                assert!(d > last_step, "chain displacements must increase");
                last_step = d;
                bucket = (home + quadratic(d)) & self.buckets_mask;
                steps += 1;
                assert!(steps <= n, "chain from {} loops", home);
            }
        }
        assert_eq!(occupied, self.len, "len disagrees with metadata");
    }
}

impl Drop for RawTable {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl IntoIterator for RawTable {
    type Item = NonNull<u8>;
    type IntoIter = RawIntoIter;

    fn into_iter(self) -> RawIntoIter {
        RawIntoIter {
            table: self,
            next: 0,
        }
    }
}

impl fmt::Debug for RawTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawTable")
            .field("len", &self.len)
            .field("buckets", &self.buckets())
            .field("bucket_layout", &self.vtable.bucket)
            .finish()
    }
}

/// Cursor over occupied buckets in bucket order.
pub struct RawIter<'a> {
    table: &'a RawTable,
    next: usize,
    remaining: usize,
}

impl<'a> Iterator for RawIter<'a> {
    type Item = NonNull<u8>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let i = self.table.next_occupied(self.next);
        self.next = i + 1;
        self.remaining -= 1;
        Some(self.table.bucket_at(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RawIter<'_> {}
impl FusedIterator for RawIter<'_> {}

impl Clone for RawIter<'_> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            next: self.next,
            remaining: self.remaining,
        }
    }
}

/// Owning cursor. Each yielded bucket is no longer tracked by the table:
/// the caller must move the payload out before the next call. Buckets never
/// yielded are dropped with the iterator.
pub struct RawIntoIter {
    table: RawTable,
    next: usize,
}

impl RawIntoIter {
    /// Shared view of the buckets not yet yielded.
    pub fn iter(&self) -> RawIter<'_> {
        RawIter {
            table: &self.table,
            next: self.next,
            remaining: self.table.len,
        }
    }
}

impl Iterator for RawIntoIter {
    type Item = NonNull<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.table.len == 0 {
            return None;
        }
        let i = self.table.next_occupied(self.next);
        self.table.set_meta(i, EMPTY);
        self.table.len -= 1;
        self.next = i + 1;
        Some(self.table.bucket_at(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len, Some(self.table.len))
    }
}

impl ExactSizeIterator for RawIntoIter {}
impl FusedIterator for RawIntoIter {}
