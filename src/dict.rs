//! Dict: typed key/value façade over `RawTable`.

use crate::error::TableError;
use crate::raw::{drop_fn, BucketVTable, RawIntoIter, RawIter, RawSlot, RawTable};
use core::alloc::Layout;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop, MaybeUninit};
use core::ops::Index;
use core::ptr::{self, NonNull};
use hashbrown::hash_map::DefaultHashBuilder;

/// Bucket layout of a `Dict`: key first, value second.
#[repr(C)]
pub(crate) struct Slot<K, V> {
    key: K,
    value: V,
}

impl<K, V> Slot<K, V> {
    const VTABLE: BucketVTable = BucketVTable {
        bucket: Layout::new::<Slot<K, V>>(),
        key_offset: mem::offset_of!(Slot<K, V>, key),
        value_offset: Some(mem::offset_of!(Slot<K, V>, value)),
        drop_key: drop_fn::<K>(),
        drop_value: drop_fn::<V>(),
    };

    #[inline]
    unsafe fn at<'a>(b: NonNull<u8>) -> &'a Self {
        &*b.cast::<Self>().as_ptr()
    }

    #[inline]
    unsafe fn at_mut<'a>(b: NonNull<u8>) -> &'a mut Self {
        &mut *b.cast::<Self>().as_ptr()
    }
}

#[inline]
pub(crate) fn make_hash<Q, S>(hash_builder: &S, q: &Q) -> u64
where
    Q: ?Sized + Hash,
    S: BuildHasher,
{
    hash_builder.hash_one(q)
}

/// A hash map with unique keys, stored in an open-addressing table.
///
/// Inserting a key that is already present replaces its value in place.
/// Iteration order is bucket order and changes on growth.
///
/// The hasher must spread keys. A chain reaches at most 2046 buckets past
/// its home, so roughly two thousand keys with one identical 64-bit hash
/// cannot all be placed; the table keeps doubling in search of room until
/// growth fails with `CapacityOverflow` or an allocation error.
pub struct Dict<K, V, S = DefaultHashBuilder> {
    hash_builder: S,
    table: RawTable,
    marker: PhantomData<Slot<K, V>>,
}

// SAFETY: the table exclusively owns its `K`/`V` payloads, like `Vec`.
unsafe impl<K: Send, V: Send, S: Send> Send for Dict<K, V, S> {}
// SAFETY: `&Dict` only hands out `&K`/`&V`.
unsafe impl<K: Sync, V: Sync, S: Sync> Sync for Dict<K, V, S> {}

impl<K, V> Dict<K, V, DefaultHashBuilder> {
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K, V> Dict<K, V, DefaultHashBuilder>
where
    K: Eq + Hash,
{
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S: Default> Default for Dict<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Dict<K, V, S> {
    /// An empty map; nothing is allocated until the first insert.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            hash_builder,
            table: RawTable::new(&Slot::<K, V>::VTABLE),
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

    /// Number of entries the map holds before it has to grow.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Remove every entry, keeping the allocated buckets.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            raw: self.table.iter(),
            marker: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            raw: self.table.iter(),
            marker: PhantomData,
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }
}

impl<K, V, S> Dict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let mut dict = Self::with_hasher(hash_builder);
        dict.reserve(capacity);
        dict
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
        // SAFETY: every occupied bucket holds a `Slot<K, V>`.
        self.table
            .find(hash, &mut |b| unsafe { Slot::<K, V>::at(b) }.key.borrow() == k)
    }

    /// Insert `key -> value`. When the key is present its value is replaced
    /// and the old value returned; the stored key is kept.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.try_insert(key, value).unwrap_or_else(|e| e.abort())
    }

    /// Like `insert`, but reports growth failure instead of aborting. On
    /// error the key and value are dropped and the map is unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        let slot = ManuallyDrop::new(Slot { key, value });
        match self.place(&slot) {
            Ok((_, true)) => Ok(None),
            Ok((raw, false)) => {
                let Slot { key, value } = ManuallyDrop::into_inner(slot);
                drop(key);
                // SAFETY: `raw` is occupied and we hold `&mut self`.
                let existing = unsafe { Slot::<K, V>::at_mut(self.table.bucket(raw)) };
                Ok(Some(mem::replace(&mut existing.value, value)))
            }
            Err(e) => {
                drop(ManuallyDrop::into_inner(slot));
                Err(e)
            }
        }
    }

    /// The value stored under `key`, inserting `f()` first when the key is
    /// absent. `f` only runs on a miss.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, f: F) -> &mut V {
        self.try_get_or_insert_with(key, f)
            .unwrap_or_else(|e| e.abort())
    }

    /// Fallible `get_or_insert_with`. On error `key` and the value built by
    /// `f` are dropped and the map is unchanged.
    pub fn try_get_or_insert_with<F: FnOnce() -> V>(
        &mut self,
        key: K,
        f: F,
    ) -> Result<&mut V, TableError> {
        let raw = match self.find_slot(&key) {
            Some(raw) => raw,
            None => {
                let slot = ManuallyDrop::new(Slot { key, value: f() });
                match self.place(&slot) {
                    Ok((raw, inserted)) => {
                        if !inserted {
                            drop(ManuallyDrop::into_inner(slot));
                        }
                        raw
                    }
                    Err(e) => {
                        drop(ManuallyDrop::into_inner(slot));
                        return Err(e);
                    }
                }
            }
        };
        // SAFETY: `raw` is occupied, borrowed for the lifetime of `&mut self`.
        Ok(&mut unsafe { Slot::<K, V>::at_mut(self.table.bucket(raw)) }.value)
    }

    /// Find `slot.key` or copy `slot` into a fresh bucket. Ownership moves
    /// to the table only on `Ok((_, true))`; otherwise `slot` still owns
    /// its contents.
    fn place(&mut self, slot: &ManuallyDrop<Slot<K, V>>) -> Result<(RawSlot, bool), TableError> {
        let hash = make_hash(&self.hash_builder, &slot.key);
        let hash_builder = &self.hash_builder;
        let src = &**slot as *const Slot<K, V> as *const u8;
        // SAFETY: `src` is a live `Slot<K, V>`; every occupied bucket holds one.
        unsafe {
            self.table.find_or_insert(
                hash,
                src,
                &mut |b| Slot::<K, V>::at(b).key == slot.key,
                &|b| make_hash(hash_builder, &Slot::<K, V>::at(b).key),
            )
        }
    }

    pub fn get<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(k).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, k: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find_slot(k)?;
        // SAFETY: occupied slot, borrowed for the lifetime of `&self`.
        let s = unsafe { Slot::<K, V>::at(self.table.bucket(slot)) };
        Some((&s.key, &s.value))
    }

    pub fn get_mut<Q>(&mut self, k: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find_slot(k)?;
        // SAFETY: occupied slot, borrowed for the lifetime of `&mut self`.
        Some(&mut unsafe { Slot::<K, V>::at_mut(self.table.bucket(slot)) }.value)
    }

    pub fn contains_key<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_slot(k).is_some()
    }

    pub fn remove<Q>(&mut self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(k).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, k: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find_slot(k)?;
        let hash_builder = &self.hash_builder;
        let mut out = MaybeUninit::<Slot<K, V>>::uninit();
        // SAFETY: `slot` is occupied; the payload is moved into `out` and
        // the table no longer tracks it.
        let Slot { key, value } = unsafe {
            self.table.take_at(
                slot,
                &|b| make_hash(hash_builder, &Slot::<K, V>::at(b).key),
                out.as_mut_ptr().cast::<u8>(),
            );
            out.assume_init()
        };
        Some((key, value))
    }

    /// Keep only the entries for which `f` returns true.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let hash_builder = &self.hash_builder;
        self.table.retain(
            // SAFETY: the engine only passes occupied buckets.
            &|b| make_hash(hash_builder, &unsafe { Slot::<K, V>::at(b) }.key),
            &mut |b| {
                let s = unsafe { Slot::<K, V>::at_mut(b) };
                f(&s.key, &mut s.value)
            },
        );
    }

    /// Make room for `additional` more entries without further growth.
    /// Nothing happens when `len() + additional` already fits.
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional).unwrap_or_else(|e| e.abort());
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TableError> {
        let size = self
            .len()
            .checked_add(additional)
            .ok_or(TableError::CapacityOverflow)?;
        let hash_builder = &self.hash_builder;
        self.table.reserve(size, &|b| {
            make_hash(hash_builder, &unsafe { Slot::<K, V>::at(b) }.key)
        })
    }

    /// Shrink the buckets to the minimum that holds the current entries;
    /// an empty map releases its allocation.
    pub fn shrink_to_fit(&mut self) {
        self.try_shrink_to_fit().unwrap_or_else(|e| e.abort());
    }

    pub fn try_shrink_to_fit(&mut self) -> Result<(), TableError> {
        let hash_builder = &self.hash_builder;
        self.table.shrink_to_fit(&|b| {
            make_hash(hash_builder, &unsafe { Slot::<K, V>::at(b) }.key)
        })
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let hash_builder = &self.hash_builder;
        self.table.check_invariants(&|b| {
            make_hash(hash_builder, &unsafe { Slot::<K, V>::at(b) }.key)
        });
    }
}

impl<K, V, S> Clone for Dict<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    /// Deep copy with identical bucket placement. Requires that a cloned
    /// `S` hashes exactly like the original.
    fn clone(&self) -> Self {
        // SAFETY: `dst` is an uninitialized bucket of the same shape.
        let table = unsafe {
            self.table.try_clone_with(&mut |src, dst| {
                let s = Slot::<K, V>::at(src);
                ptr::write(
                    dst.cast::<Slot<K, V>>().as_ptr(),
                    Slot {
                        key: s.key.clone(),
                        value: s.value.clone(),
                    },
                );
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

impl<K, V, S> fmt::Debug for Dict<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> PartialEq for Dict<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| v == ov))
    }
}

impl<K, V, S> Eq for Dict<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, Q, V, S> Index<&Q> for Dict<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Eq + Hash,
    S: BuildHasher,
{
    type Output = V;

    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in Dict")
    }
}

impl<K, V, S> Extend<(K, V)> for Dict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        let additional = if self.is_empty() {
            iter.size_hint().0
        } else {
            (iter.size_hint().0 + 1) / 2
        };
        self.reserve(additional);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S> Extend<(&'a K, &'a V)> for Dict<K, V, S>
where
    K: Eq + Hash + Copy,
    V: Copy,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<K, V, S> FromIterator<(K, V)> for Dict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut dict = Self::with_hasher(S::default());
        dict.extend(iter);
        dict
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Dict<K, V, DefaultHashBuilder>
where
    K: Eq + Hash,
{
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

/// Iterator over `(&K, &V)` in bucket order.
pub struct Iter<'a, K, V> {
    raw: RawIter<'a>,
    marker: PhantomData<&'a (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.raw.next().map(|b| {
            // SAFETY: occupied bucket, shared for `'a`.
            let s = unsafe { Slot::<K, V>::at(b) };
            (&s.key, &s.value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            marker: PhantomData,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Iterator over `(&K, &mut V)` in bucket order.
pub struct IterMut<'a, K, V> {
    raw: RawIter<'a>,
    marker: PhantomData<&'a mut (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.raw.next().map(|b| {
            // SAFETY: each bucket is yielded once while the map is
            // mutably borrowed for `'a`.
            let s = unsafe { Slot::<K, V>::at_mut(b) };
            (&s.key, &mut s.value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<K, V> IterMut<'_, K, V> {
    /// Shared view of the entries not yet yielded.
    fn remaining(&self) -> Iter<'_, K, V> {
        Iter {
            raw: self.raw.clone(),
            marker: PhantomData,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IterMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.remaining()).finish()
    }
}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

impl<K, V: fmt::Debug> fmt::Debug for ValuesMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.inner.remaining().map(|(_, v)| v))
            .finish()
    }
}

/// Owning iterator; entries not yet yielded are dropped with it.
pub struct IntoIter<K, V> {
    raw: RawIntoIter,
    marker: PhantomData<Slot<K, V>>,
}

// SAFETY: same ownership as `Dict`.
unsafe impl<K: Send, V: Send> Send for IntoIter<K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for IntoIter<K, V> {}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<(K, V)> {
        self.raw.next().map(|b| {
            // SAFETY: the bucket is no longer tracked; read it out once.
            let Slot { key, value } = unsafe { ptr::read(b.cast::<Slot<K, V>>().as_ptr()) };
            (key, value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = Iter::<K, V> {
            raw: self.raw.iter(),
            marker: PhantomData,
        };
        f.debug_list().entries(pending).finish()
    }
}

impl<K, V, S> IntoIterator for Dict<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            raw: self.table.into_iter(),
            marker: PhantomData,
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a Dict<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut Dict<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
