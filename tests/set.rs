// Set integration suite.
//
// Verifies membership round-trip, key replacement on duplicate insert,
// copy isolation and move semantics for the key-only table.
use std::collections::BTreeSet;
use std::mem;
use verstable::Set;

// Test: 1024 string members through growth, shrink and bulk removal.
#[test]
fn string_members_lifecycle() {
    let mut s: Set<String> = Set::with_capacity(256);
    for i in 0..1024u32 {
        assert!(s.insert(i.to_string()));
        assert!(s.len() <= s.capacity());
    }
    assert!(!s.insert("17".to_string()));
    assert_eq!(s.len(), 1024);

    s.shrink_to_fit();
    s.reserve(4096);
    s.shrink_to_fit();
    for i in 0..1024u32 {
        assert!(s.contains(i.to_string().as_str()));
    }

    s.retain(|k| k.parse::<u32>().map_or(false, |n| n % 2 == 1));
    assert_eq!(s.len(), 512);

    let copy = s.clone();
    for k in s.iter() {
        let other = copy.get(k.as_str()).unwrap();
        assert_ne!(k.as_ptr(), other.as_ptr());
    }

    let mut target: Set<String> = ["x", "y", "z"].iter().map(|s| s.to_string()).collect();
    target = mem::take(&mut s);
    assert_eq!(target.len(), 512);
    assert!(!target.contains("x"));
    assert!(s.is_empty());
    assert_eq!(s.iter().count(), 0);
    assert_eq!(target, copy);
}

// Test: empty set queries and owning iteration.
#[test]
fn empty_and_into_iter() {
    let mut s: Set<u8> = Set::new();
    assert!(!s.contains(&0));
    assert!(!s.remove(&0));
    assert_eq!(s.take(&0), None);
    assert_eq!(format!("{:?}", s), "{}");

    s.extend([3u8, 1, 2, 3]);
    let all: BTreeSet<u8> = s.into_iter().collect();
    assert_eq!(all, BTreeSet::from([1, 2, 3]));
}
