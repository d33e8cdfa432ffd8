// Dict integration suite.
//
// Each test documents what behavior is being verified. The core
// invariants exercised:
// - Round-trip: every inserted key resolves to its last value until erased.
// - Size: len() tracks live entries across copy, move, reserve, shrink and
//   growth.
// - Load factor: len() <= 0.9 * buckets after every insert.
// - Isolation: clones own separate storage for keys and values.
// - Move: a moved-from map is empty and iterates nothing.
use std::collections::BTreeSet;
use std::mem;
use verstable::Dict;

fn key(i: u32) -> String {
    i.to_string()
}

fn value(i: u32) -> String {
    (i * 2).to_string()
}

fn assert_odd_keys(m: &Dict<String, String>) {
    assert_eq!(m.len(), 512);
    for i in 0..1024u32 {
        let got = m.get(key(i).as_str());
        if i % 2 == 1 {
            assert_eq!(got, Some(&value(i)), "key {}", i);
        } else {
            assert!(got.is_none(), "even key {} survived", i);
        }
    }
}

// Test: the full lifecycle scenario over 1024 string keys.
// Verifies: round-trip through reserve/shrink cycles, bulk erase, two
// independent copies, iteration count, and move over a populated map.
#[test]
fn string_keys_lifecycle() {
    let mut m: Dict<String, String> = Dict::new();
    m.reserve(256);
    assert!(m.capacity() >= 256);

    for i in 0..1024u32 {
        assert!(m.insert(key(i), value(i)).is_none());
        assert!(m.len() <= m.capacity(), "load factor");
    }
    assert_eq!(m.len(), 1024);
    for i in 0..1024u32 {
        assert_eq!(m.get(key(i).as_str()), Some(&value(i)));
    }

    m.shrink_to_fit();
    // Room for 4096 entries beyond the current 1024.
    m.reserve(4096);
    assert!(m.capacity() >= m.len() + 4096);
    m.shrink_to_fit();
    assert!(m.capacity() >= 1024);
    assert_eq!(m.len(), 1024);
    for i in 0..1024u32 {
        assert_eq!(m.get(key(i).as_str()), Some(&value(i)), "after shrink, key {}", i);
    }

    for i in (0..1024u32).step_by(2) {
        assert_eq!(m.remove(key(i).as_str()), Some(value(i)));
    }
    assert_odd_keys(&m);

    // Copy-construct and copy-assign.
    let copy = m.clone();
    let mut assigned: Dict<String, String> = Dict::new();
    assigned.insert("stale".to_string(), "x".to_string());
    assigned.clone_from(&m);
    assert!(assigned.get("stale").is_none());

    for t in [&m, &copy, &assigned] {
        assert_odd_keys(t);
    }
    for i in (1..1024u32).step_by(2) {
        let k = key(i);
        let (k0, v0) = m.get_key_value(k.as_str()).unwrap();
        let (k1, v1) = copy.get_key_value(k.as_str()).unwrap();
        let (k2, v2) = assigned.get_key_value(k.as_str()).unwrap();
        let keys: BTreeSet<*const u8> = [k0.as_ptr(), k1.as_ptr(), k2.as_ptr()].into();
        let values: BTreeSet<*const u8> = [v0.as_ptr(), v1.as_ptr(), v2.as_ptr()].into();
        assert_eq!(keys.len(), 3, "keys share storage for {}", i);
        assert_eq!(values.len(), 3, "values share storage for {}", i);
    }

    assert_eq!(m.iter().count(), m.len());
    assert_eq!(m.keys().count(), 512);
    assert_eq!(m.values().count(), 512);

    let mut target: Dict<String, String> = Dict::new();
    for k in ["a", "b", "c"] {
        target.insert(k.to_string(), k.to_string());
    }
    target = mem::take(&mut m);
    assert_odd_keys(&target);
    assert!(target.get("a").is_none());
    assert_eq!(m.len(), 0);
    assert_eq!(m.iter().next(), None);
}

// Test: mutating a clone leaves the original alone and vice versa.
#[test]
fn clone_isolation_under_mutation() {
    let mut a: Dict<String, String> = Dict::new();
    a.insert("k".to_string(), "v".to_string());
    let mut b = a.clone();
    b.get_mut("k").unwrap().push_str("-b");
    a.get_mut("k").unwrap().push_str("-a");
    assert_eq!(a["k"], "v-a");
    assert_eq!(b["k"], "v-b");
    b.remove("k");
    assert!(a.contains_key("k"));
}

// Test: load factor holds after every insert through many growths.
#[test]
fn load_factor_after_each_insert() {
    let mut m: Dict<u64, u64> = Dict::new();
    for i in 0..5000u64 {
        m.insert(i, i);
        // capacity() is floor(0.9 * buckets).
        assert!(m.len() <= m.capacity(), "len {} capacity {}", m.len(), m.capacity());
    }
    m.clear();
    assert!(m.is_empty());
    assert!(m.capacity() > 0);
    m.shrink_to_fit();
    assert_eq!(m.capacity(), 0);
}

// Test: operations on a map that never allocated.
#[test]
fn empty_map_is_inert() {
    let mut m: Dict<String, u32> = Dict::new();
    assert_eq!(m.get("nothing"), None);
    assert_eq!(m.remove("nothing"), None);
    assert!(m.iter().next().is_none());
    assert!(m.iter_mut().next().is_none());
    assert!(m.clone().is_empty());
    assert_eq!(m.into_iter().count(), 0);
}

// Test: collect, extend and From build the same contents.
#[test]
fn construction_from_iterators() {
    let a: Dict<u32, &str> = Dict::from([(1, "one"), (2, "two")]);
    let b: Dict<u32, &str> = vec![(2, "two"), (1, "one")].into_iter().collect();
    assert_eq!(a, b);

    let mut c: Dict<u32, &str> = Dict::with_capacity(2);
    c.extend([(1, "uno"), (2, "two")]);
    c.extend(&[(1, "one")].into_iter().collect::<Dict<u32, &str>>());
    assert_eq!(a, c);
    assert_eq!(format!("{:?}", Dict::from([(7, 'x')])), "{7: 'x'}");
}

// Test: try_* entry points report overflow instead of panicking and leave
// the map usable.
#[test]
fn try_reserve_reports_overflow() {
    let mut m: Dict<u64, u64> = Dict::new();
    m.insert(1, 1);
    assert_eq!(m.try_reserve(usize::MAX), Err(verstable::TableError::CapacityOverflow));
    assert_eq!(m.get(&1), Some(&1));
    assert_eq!(m.try_insert(2, 2), Ok(None));
    assert_eq!(m.try_insert(2, 3), Ok(Some(2)));
}

// Test: reserve within the spare capacity of a populated map.
// Verifies: reserve counts entries beyond len(), so asking for no more than
// the spare room leaves the buckets alone and one more entry grows them.
#[test]
fn reserve_within_spare_capacity_is_noop() {
    let mut m: Dict<u64, u64> = (0..100).map(|k| (k, k)).collect();
    let cap = m.capacity();
    assert!(cap >= 100);
    m.reserve(0);
    assert_eq!(m.capacity(), cap);
    m.reserve(cap - m.len());
    assert_eq!(m.capacity(), cap);
    m.reserve(cap - m.len() + 1);
    assert!(m.capacity() > cap);
    for k in 0..100 {
        assert_eq!(m.get(&k), Some(&k));
    }
}
