//! Set: typed key-only façade over `RawTable`. Each bucket is exactly a `K`.

use crate::dict::make_hash;
use crate::error::TableError;
use crate::raw::{drop_fn, BucketVTable, RawIntoIter, RawIter, RawSlot, RawTable};
use core::alloc::Layout;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop, MaybeUninit};
use core::ptr::{self, NonNull};
use hashbrown::hash_map::DefaultHashBuilder;

#[inline]
unsafe fn key_at<'a, K>(b: NonNull<u8>) -> &'a K {
    &*b.cast::<K>().as_ptr()
}

/// A hash set stored in an open-addressing table.
///
/// Inserting a key equal to one already present replaces the stored key.
///
/// Keys that all share one 64-bit hash exhaust a chain after about two
/// thousand entries, the same limit described on `Dict`.
pub struct Set<K, S = DefaultHashBuilder> {
    hash_builder: S,
    table: RawTable,
    marker: PhantomData<K>,
}

// SAFETY: the table exclusively owns its keys.
unsafe impl<K: Send, S: Send> Send for Set<K, S> {}
unsafe impl<K: Sync, S: Sync> Sync for Set<K, S> {}

impl<K> Set<K, DefaultHashBuilder> {
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K: Eq + Hash> Set<K, DefaultHashBuilder> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, S: Default> Default for Set<K, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, S> Set<K, S> {
    const VTABLE: BucketVTable = BucketVTable {
        bucket: Layout::new::<K>(),
        key_offset: 0,
        value_offset: None,
        drop_key: drop_fn::<K>(),
        drop_value: None,
    };

    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            hash_builder,
            table: RawTable::new(&Self::VTABLE),
            marker: PhantomData,
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            raw: self.table.iter(),
            marker: PhantomData,
        }
    }
}

impl<K, S> Set<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let mut set = Self::with_hasher(hash_builder);
        set.reserve(capacity);
        set
    }

    fn find_slot<Q>(&self, k: &Q) -> Option<RawSlot>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.table.is_empty() {
            return None;
        }
        let hash = make_hash(&self.hash_builder, k);
        // SAFETY: every occupied bucket holds a `K`.
        self.table
            .find(hash, &mut |b| unsafe { key_at::<K>(b) }.borrow() == k)
    }

    /// Insert `key`. Returns true if it was not present. When an equal key
    /// is present it is replaced by `key` (the old one is dropped).
    pub fn insert(&mut self, key: K) -> bool {
        self.replace(key).is_none()
    }

    /// Insert `key`, returning the equal key it replaced, if any.
    pub fn replace(&mut self, key: K) -> Option<K> {
        self.try_replace(key).unwrap_or_else(|e| e.abort())
    }

    /// Fallible `insert`. On error `key` is dropped and the set is unchanged.
    pub fn try_insert(&mut self, key: K) -> Result<bool, TableError> {
        self.try_replace(key).map(|old| old.is_none())
    }

    fn try_replace(&mut self, key: K) -> Result<Option<K>, TableError> {
        let hash = make_hash(&self.hash_builder, &key);
        let key = ManuallyDrop::new(key);
        let hash_builder = &self.hash_builder;
        let src = &*key as *const K as *const u8;
        // SAFETY: `src` is a live `K`; on a fresh insert the table owns it
        // and `key` is never dropped.
        let res = unsafe {
            self.table.find_or_insert(
                hash,
                src,
                &mut |b| *key_at::<K>(b) == *key,
                &|b| make_hash(hash_builder, key_at::<K>(b)),
            )
        };
        match res {
            Ok((_, true)) => Ok(None),
            Ok((slot, false)) => {
                // SAFETY: `slot` is occupied by a `K` equal to `key`; the
                // swap keeps its hash and chain position valid.
                let stored = unsafe { &mut *self.table.bucket(slot).cast::<K>().as_ptr() };
                Ok(Some(mem::replace(stored, ManuallyDrop::into_inner(key))))
            }
            Err(e) => {
                drop(ManuallyDrop::into_inner(key));
                Err(e)
            }
        }
    }

    /// The stored key equal to `key`, inserting `key` first when absent.
    /// A present key is kept and `key` is dropped.
    pub fn get_or_insert(&mut self, key: K) -> &K {
        let hash = make_hash(&self.hash_builder, &key);
        let key = ManuallyDrop::new(key);
        let hash_builder = &self.hash_builder;
        let src = &*key as *const K as *const u8;
        // SAFETY: as in `try_replace`.
        let res = unsafe {
            self.table.find_or_insert(
                hash,
                src,
                &mut |b| *key_at::<K>(b) == *key,
                &|b| make_hash(hash_builder, key_at::<K>(b)),
            )
        };
        let slot = match res {
            Ok((slot, inserted)) => {
                if !inserted {
                    drop(ManuallyDrop::into_inner(key));
                }
                slot
            }
            Err(e) => {
                drop(ManuallyDrop::into_inner(key));
                e.abort()
            }
        };
        // SAFETY: occupied slot, borrowed for the lifetime of `&mut self`.
        unsafe { key_at::<K>(self.table.bucket(slot)) }
    }

    pub fn contains<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_slot(k).is_some()
    }

    pub fn get<Q>(&self, k: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find_slot(k)?;
        // SAFETY: occupied slot, borrowed for the lifetime of `&self`.
        Some(unsafe { key_at::<K>(self.table.bucket(slot)) })
    }

    /// Remove and return the stored key equal to `k`.
    pub fn take<Q>(&mut self, k: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find_slot(k)?;
        let hash_builder = &self.hash_builder;
        let mut out = MaybeUninit::<K>::uninit();
        // SAFETY: `slot` is occupied; its key moves into `out`.
        unsafe {
            self.table.take_at(
                slot,
                &|b| make_hash(hash_builder, key_at::<K>(b)),
                out.as_mut_ptr().cast::<u8>(),
            );
            Some(out.assume_init())
        }
    }

    pub fn remove<Q>(&mut self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.table.is_empty() {
            return false;
        }
        let hash_builder = &self.hash_builder;
        let hash = make_hash(hash_builder, k);
        // SAFETY: every occupied bucket holds a `K`.
        self.table.erase(
            hash,
            &mut |b| unsafe { key_at::<K>(b) }.borrow() == k,
            &|b| make_hash(hash_builder, unsafe { key_at::<K>(b) }),
        )
    }

    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K) -> bool,
    {
        let hash_builder = &self.hash_builder;
        self.table.retain(
            // SAFETY: the engine only passes occupied buckets.
            &|b| make_hash(hash_builder, unsafe { key_at::<K>(b) }),
            &mut |b| f(unsafe { key_at::<K>(b) }),
        );
    }

    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional).unwrap_or_else(|e| e.abort());
    }

    /// Like `Dict::try_reserve`, `additional` counts keys beyond `len()`.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TableError> {
        let size = self
            .len()
            .checked_add(additional)
            .ok_or(TableError::CapacityOverflow)?;
        let hash_builder = &self.hash_builder;
        self.table
            .reserve(size, &|b| make_hash(hash_builder, unsafe { key_at::<K>(b) }))
    }

    pub fn shrink_to_fit(&mut self) {
        self.try_shrink_to_fit().unwrap_or_else(|e| e.abort());
    }

    pub fn try_shrink_to_fit(&mut self) -> Result<(), TableError> {
        let hash_builder = &self.hash_builder;
        self.table
            .shrink_to_fit(&|b| make_hash(hash_builder, unsafe { key_at::<K>(b) }))
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let hash_builder = &self.hash_builder;
        self.table
            .check_invariants(&|b| make_hash(hash_builder, unsafe { key_at::<K>(b) }));
    }
}

impl<K: Clone, S: Clone> Clone for Set<K, S> {
    fn clone(&self) -> Self {
        // SAFETY: `dst` is an uninitialized `K`-shaped bucket.
        let table = unsafe {
            self.table.try_clone_with(&mut |src, dst| {
                ptr::write(dst.cast::<K>().as_ptr(), key_at::<K>(src).clone());
            })
        }
        .unwrap_or_else(|e| e.abort());
        Self {
            hash_builder: self.hash_builder.clone(),
            table,
            marker: PhantomData,
        }
    }
}

impl<K: fmt::Debug, S> fmt::Debug for Set<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, S> PartialEq for Set<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|k| other.contains(k))
    }
}

impl<K: Eq + Hash, S: BuildHasher> Eq for Set<K, S> {}

impl<K, S> Extend<K> for Set<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = K>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        let additional = if self.is_empty() {
            iter.size_hint().0
        } else {
            (iter.size_hint().0 + 1) / 2
        };
        self.reserve(additional);
        for k in iter {
            self.insert(k);
        }
    }
}

impl<'a, K, S> Extend<&'a K> for Set<K, S>
where
    K: Eq + Hash + Copy + 'a,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = &'a K>>(&mut self, iter: T) {
        self.extend(iter.into_iter().copied());
    }
}

impl<K, S> FromIterator<K> for Set<K, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let mut set = Self::with_hasher(S::default());
        set.extend(iter);
        set
    }
}

impl<K: Eq + Hash, const N: usize> From<[K; N]> for Set<K, DefaultHashBuilder> {
    fn from(arr: [K; N]) -> Self {
        arr.into_iter().collect()
    }
}

pub struct Iter<'a, K> {
    raw: RawIter<'a>,
    marker: PhantomData<&'a K>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        // SAFETY: occupied bucket, shared for `'a`.
        self.raw.next().map(|b| unsafe { key_at::<K>(b) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}
impl<K> FusedIterator for Iter<'_, K> {}

impl<K> Clone for Iter<'_, K> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            marker: PhantomData,
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for Iter<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

pub struct IntoIter<K> {
    raw: RawIntoIter,
    marker: PhantomData<K>,
}

unsafe impl<K: Send> Send for IntoIter<K> {}
unsafe impl<K: Sync> Sync for IntoIter<K> {}

impl<K> Iterator for IntoIter<K> {
    type Item = K;

    #[inline]
    fn next(&mut self) -> Option<K> {
        // SAFETY: the bucket is no longer tracked; read it out once.
        self.raw
            .next()
            .map(|b| unsafe { ptr::read(b.cast::<K>().as_ptr()) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<K> ExactSizeIterator for IntoIter<K> {}
impl<K> FusedIterator for IntoIter<K> {}

impl<K: fmt::Debug> fmt::Debug for IntoIter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = Iter::<K> {
            raw: self.raw.iter(),
            marker: PhantomData,
        };
        f.debug_list().entries(pending).finish()
    }
}

impl<K, S> IntoIterator for Set<K, S> {
    type Item = K;
    type IntoIter = IntoIter<K>;

    fn into_iter(self) -> IntoIter<K> {
        IntoIter {
            raw: self.table.into_iter(),
            marker: PhantomData,
        }
    }
}

impl<'a, K, S> IntoIterator for &'a Set<K, S> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}
