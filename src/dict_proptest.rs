#![cfg(test)]

// Property tests for Dict kept inside the crate so they can check the
// engine's structural invariants after every operation.

use crate::dict::Dict;
use crate::set::Set;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so failures shrink to earlier keys and shorter
// op lists.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    RetainEven,
    Reserve(u8),
    Shrink,
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(Op::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::RetainEven),
            1 => any::<u8>().prop_map(Op::Reserve),
            1 => Just(Op::Shrink),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_state_machine<S: BuildHasher>(
    mut sut: Dict<Key, i32, S>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.insert(k.clone(), v), model.insert(k, v));
            }
            Op::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove_entry(&k), model.remove_entry(&k));
            }
            Op::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.wrapping_add(d);
                }
                if let Some(v) = model.get_mut(&k) {
                    *v = v.wrapping_add(d);
                }
            }
            Op::RetainEven => {
                sut.retain(|_, v| *v % 2 == 0);
                model.retain(|_, v| *v % 2 == 0);
            }
            Op::Reserve(n) => {
                sut.reserve(n as usize);
                prop_assert!(sut.capacity() >= sut.len() + n as usize);
            }
            Op::Shrink => sut.shrink_to_fit(),
            Op::Clear => {
                sut.clear();
                model.clear();
            }
            Op::Iterate => {
                let s: BTreeMap<_, _> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m: BTreeMap<_, _> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s, m);
                prop_assert_eq!(sut.iter().len(), model.len());
            }
        }

        sut.check_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }

    let drained: BTreeMap<_, _> = sut.into_iter().collect();
    let expected: BTreeMap<_, _> = model.into_iter().collect();
    prop_assert_eq!(drained, expected);
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap,
// with the chain invariants re-checked after each op:
// - insert returns the replaced value exactly when the model does;
// - remove/get/contains parity, including borrowed `&str` lookup;
// - retain, reserve, shrink and clear leave the same contents;
// - iteration and into_iter yield each live entry exactly once.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(Dict::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key shares home bucket
// zero and hash fragment zero, so every lookup walks one chain.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Low-entropy variant: only the low three bits of the hash vary, so chains
// are long and keep evicting each other across growth.
#[derive(Clone, Default)]
struct LowBitsBuildHasher;
#[derive(Default)]
struct LowBitsHasher(u64);
impl BuildHasher for LowBitsBuildHasher {
    type Hasher = LowBitsHasher;
    fn build_hasher(&self) -> Self::Hasher {
        LowBitsHasher::default()
    }
}
impl Hasher for LowBitsHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(b as u64);
        }
    }
    fn finish(&self) -> u64 {
        self.0 & 7
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(Dict::with_hasher(ConstBuildHasher), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_low_entropy((pool, ops) in arb_scenario()) {
        run_state_machine(Dict::with_hasher(LowBitsBuildHasher), &pool, ops)?;
    }
}

// Property: Set agrees with BTreeSet over random insert/remove sequences
// on a small integer domain, so duplicates are frequent.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_set_matches_model(ops in proptest::collection::vec((any::<bool>(), 0u16..300), 1..400)) {
        let mut sut: Set<u16> = Set::new();
        let mut model: BTreeSet<u16> = BTreeSet::new();
        for (insert, k) in ops {
            if insert {
                prop_assert_eq!(sut.insert(k), model.insert(k));
            } else {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
        }
        sut.check_invariants();
        let got: BTreeSet<u16> = sut.iter().copied().collect();
        prop_assert_eq!(got, model);
    }
}
