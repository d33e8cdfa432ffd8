//! verstable: an open-addressing `Dict`/`Set` pair built on one untyped
//! table engine.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one hash table engine, compiled once, that backs every key and
//!   value type, with thin typed wrappers on top.
//! - Layers:
//!   - `metadata`: the 16-bit per-bucket metadatum (hash fragment, in-home
//!     flag, displacement) and the probe/load arithmetic.
//!   - `alloc`: the single allocation holding buckets followed by metadata
//!     and four guard words.
//!   - `raw::RawTable`: the engine. Buckets are opaque bytes described by a
//!     static `BucketVTable`; hashing and equality arrive as closures.
//!   - `Dict<K, V, S>` and `Set<K, S>`: typed façades that supply layouts,
//!     hashing through `S: BuildHasher`, and `K: Eq`.
//!
//! Constraints
//! - Unique keys. `Dict::insert` on a present key replaces the value;
//!   `Set::insert` replaces the stored key.
//! - Max load factor 0.9; bucket counts are zero or a power of two >= 8.
//! - No tombstones: erasure repairs the chain immediately.
//! - Iteration order is bucket order and is not stable across growth.
//!
//! Chains
//! - Keys sharing a home bucket form a chain starting there, linked by
//!   quadratic displacement and ordered by increasing displacement.
//! - A home bucket is always occupied by a member of its own chain, so a
//!   clear in-home flag proves absence without comparing keys.
//! - Displacements are 11 bits, so a chain spans at most 2046 buckets past
//!   its home. Around two thousand keys with one identical hash cannot be
//!   placed at any size; growth doubles until it fails.
//!
//! Failure boundaries
//! - Only growth can fail (`TableError`). Infallible entry points escalate
//!   like std collections; `try_*` entry points return the error and leave
//!   the table unchanged.
//! - User `Hash`/`Eq` run before any structural mutation of a placement.
//!   A panicking hasher during rehash leaks the half-built table instead
//!   of double-dropping payloads.
//!
//! Non-goals
//! - No concurrent access (`Send`/`Sync` follow `K`/`V`/`S` like `Vec`).
//! - No entry API and no per-element iterator invalidation tracking; the
//!   borrow checker covers it.

mod alloc;
pub mod dict;
mod dict_proptest;
mod error;
mod metadata;
#[cfg(feature = "raw")]
pub mod raw;
#[cfg(not(feature = "raw"))]
mod raw;
pub mod set;

// Public surface
pub use dict::Dict;
pub use error::TableError;
pub use set::Set;
