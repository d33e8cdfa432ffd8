// Forced-collision suite.
//
// Keys carry the exact hash they produce, so tests choose home buckets and
// hash fragments directly. Verifies that chain repair on erase, eviction
// of displaced keys, and growth never lose a surviving key.
use std::hash::{BuildHasher, Hash, Hasher};
use verstable::{Dict, Set};

#[derive(Clone, Copy, Default)]
struct PassThrough;

#[derive(Default)]
struct PassThroughHasher(u64);

impl BuildHasher for PassThrough {
    type Hasher = PassThroughHasher;
    fn build_hasher(&self) -> PassThroughHasher {
        PassThroughHasher::default()
    }
}

impl Hasher for PassThroughHasher {
    fn write(&mut self, _bytes: &[u8]) {
        unreachable!("synthetic keys only write a u64");
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

/// Equality on `id`; hashing yields `hash` verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Synthetic {
    id: u32,
    hash: u64,
}

impl Hash for Synthetic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

fn syn(id: u32, hash: u64) -> Synthetic {
    Synthetic { id, hash }
}

// Test: erase the middle of a three-key chain and reinsert a different
// colliding key.
// Verifies: the other two chain members stay findable throughout.
#[test]
fn erase_middle_then_reinsert() {
    let mut m: Dict<Synthetic, u32, PassThrough> = Dict::with_capacity_and_hasher(3, PassThrough);
    let cap = m.capacity();
    let (a, b, c) = (syn(1, 5), syn(2, 5), syn(3, 5));
    for k in [a, b, c] {
        m.insert(k, k.id * 10);
    }

    assert_eq!(m.remove(&b), Some(20));
    assert_eq!(m.get(&a), Some(&10));
    assert_eq!(m.get(&c), Some(&30));
    assert_eq!(m.get(&b), None);

    let d = syn(4, 5);
    m.insert(d, 40);
    assert_eq!(m.get(&a), Some(&10));
    assert_eq!(m.get(&c), Some(&30));
    assert_eq!(m.get(&d), Some(&40));
    assert_eq!(m.len(), 3);
    assert_eq!(m.capacity(), cap, "no growth expected");
}

// Test: every position of a chain can be erased in every order.
// Verifies: survivors stay findable after each single erase.
#[test]
fn erase_each_chain_position() {
    let ids: Vec<u32> = (0..6).collect();
    for victim in 0..ids.len() {
        let mut m: Dict<Synthetic, u32, PassThrough> = Dict::with_hasher(PassThrough);
        m.reserve(6);
        for &id in &ids {
            m.insert(syn(id, 2), id);
        }
        m.remove(&syn(victim as u32, 2));
        for &id in &ids {
            let expect = (id as usize != victim).then_some(id);
            assert_eq!(m.get(&syn(id, 2)).copied(), expect, "victim {} id {}", victim, id);
        }
    }
}

// Test: a key arriving at a bucket occupied by a displaced key takes the
// bucket over.
// Verifies: both the newcomer and the evicted key remain reachable, as does
// the rest of the evicted key's chain.
#[test]
fn arrival_at_home_evicts_squatter() {
    let mut m: Dict<Synthetic, &str, PassThrough> = Dict::with_capacity_and_hasher(4, PassThrough);
    // 1 and 9 share home bucket 1 in an 8-bucket table; 9 is displaced to 2.
    m.insert(syn(1, 1), "a");
    m.insert(syn(9, 9), "b");
    m.insert(syn(17, 17), "c");
    // Home bucket 2 belongs to this key.
    m.insert(syn(2, 2), "d");
    for (id, v) in [(1, "a"), (9, "b"), (17, "c"), (2, "d")] {
        assert_eq!(m.get(&syn(id, id as u64)), Some(&v), "key {}", id);
    }
    m.remove(&syn(2, 2));
    m.remove(&syn(1, 1));
    assert_eq!(m.get(&syn(9, 9)), Some(&"b"));
    assert_eq!(m.get(&syn(17, 17)), Some(&"c"));
}

// Test: identical full hashes, so fragments match and only Eq separates
// keys.
// Verifies: lookups resolve by equality and negative lookups still miss.
#[test]
fn identical_hashes_resolved_by_eq() {
    let mut s: Set<Synthetic, PassThrough> = Set::with_hasher(PassThrough);
    for id in 0..200 {
        assert!(s.insert(syn(id, 0xDEAD_BEEF)));
    }
    for id in 0..200 {
        assert!(s.contains(&syn(id, 0xDEAD_BEEF)));
    }
    assert!(!s.contains(&syn(500, 0xDEAD_BEEF)));
    // Same id but different hash lives in another chain.
    assert!(!s.contains(&syn(3, 0xDEAD_BEF0)));
    s.retain(|k| k.id % 4 == 0);
    assert_eq!(s.len(), 50);
    assert!(s.iter().all(|k| k.id % 4 == 0));
}

// Test: hashes that agree on their low three bits, so every key shares
// one chain in the minimum table and chains split as the table grows.
// Verifies: growth and shrink redistribute them and nothing is lost.
#[test]
fn growth_splits_chains() {
    let mut m: Dict<Synthetic, u64, PassThrough> = Dict::with_hasher(PassThrough);
    let keys: Vec<Synthetic> = (0..2000u32)
        .map(|id| {
            let id64 = id as u64;
            syn(id, (id64 % 16) << 60 | id64 << 3 | 0x3)
        })
        .collect();
    for k in &keys {
        m.insert(*k, k.hash);
    }
    for k in &keys {
        assert_eq!(m.get(k), Some(&k.hash));
    }
    m.shrink_to_fit();
    for k in keys.iter().step_by(3) {
        assert_eq!(m.remove(k), Some(k.hash));
    }
    assert_eq!(m.len(), 2000 - 667);
}

// Test: fifteen hundred keys sharing one full hash in a 2048-bucket table.
// Verifies: a single chain holds that many keys within its displacement
// range, without growth, and stays intact after erasing every other key.
#[test]
fn long_single_chain_within_displacement_range() {
    const HASH: u64 = 0x0123_4567_89AB_CDEF;
    let mut m: Dict<Synthetic, u32, PassThrough> = Dict::with_capacity_and_hasher(1500, PassThrough);
    let cap = m.capacity();
    for id in 0..1500 {
        assert_eq!(m.insert(syn(id, HASH), id), None);
    }
    assert_eq!(m.capacity(), cap, "chain length alone must not force growth");
    for id in 0..1500 {
        assert_eq!(m.get(&syn(id, HASH)), Some(&id));
    }
    for id in (0..1500).step_by(2) {
        assert_eq!(m.remove(&syn(id, HASH)), Some(id));
    }
    for id in 0..1500 {
        let expect = (id % 2 == 1).then_some(id);
        assert_eq!(m.get(&syn(id, HASH)).copied(), expect, "id {}", id);
    }
}
