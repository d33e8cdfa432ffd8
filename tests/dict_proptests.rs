use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use verstable::{Dict, Set};

// Model operations on Dict through the public API only: every op keeps the
// map equal to a std HashMap, clones stay equal to their source at the time
// of the clone, and the load factor holds after each insert.
proptest! {
    #[test]
    fn prop_dict_matches_std(ops in proptest::collection::vec((0u8..=5u8, 0u16..512, any::<u32>()), 1..300)) {
        let mut m: Dict<u16, u32> = Dict::new();
        let mut model: HashMap<u16, u32> = HashMap::new();
        let mut snapshots: Vec<(Dict<u16, u32>, HashMap<u16, u32>)> = Vec::new();

        for (op, k, v) in ops {
            match op {
                // Insert returns the replaced value
                0 | 1 => {
                    prop_assert_eq!(m.insert(k, v), model.insert(k, v));
                    prop_assert!(m.len() <= m.capacity());
                }
                // Remove
                2 => {
                    prop_assert_eq!(m.remove(&k), model.remove(&k));
                }
                // Lookup
                3 => {
                    prop_assert_eq!(m.get(&k), model.get(&k));
                }
                // Snapshot via clone
                4 => {
                    if snapshots.len() < 4 {
                        snapshots.push((m.clone(), model.clone()));
                    }
                }
                // Shrink
                _ => m.shrink_to_fit(),
            }
            prop_assert_eq!(m.len(), model.len());
        }

        let got: BTreeMap<u16, u32> = m.iter().map(|(k, v)| (*k, *v)).collect();
        let want: BTreeMap<u16, u32> = model.into_iter().collect();
        prop_assert_eq!(got, want);

        for (snap, snap_model) in snapshots {
            let got: BTreeMap<u16, u32> = snap.into_iter().collect();
            let want: BTreeMap<u16, u32> = snap_model.into_iter().collect();
            prop_assert_eq!(got, want);
        }
    }
}

// Set membership after random inserts and retains.
proptest! {
    #[test]
    fn prop_set_retain(keys in proptest::collection::vec(any::<u64>(), 0..500), modulus in 1u64..7) {
        let s: Set<u64> = keys.iter().copied().collect();
        let mut kept = s.clone();
        kept.retain(|k| k % modulus == 0);
        for k in &keys {
            prop_assert!(s.contains(k));
            prop_assert_eq!(kept.contains(k), k % modulus == 0);
        }
        prop_assert!(kept.len() <= s.len());
        prop_assert_eq!(kept.iter().count(), kept.len());
    }
}
