use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, HashSet};

/// Walk every level from the head and check the structural invariants.
fn validate_list<K: Ord, V>(l: &SkipList<K, V>) {
    assert!(l.level < MAX_LEVEL, "top level out of range: {}", l.level);
    if l.level > 0 {
        assert!(
            !l.head[l.level].is_null(),
            "top level {} must link at least one entry",
            l.level
        );
    }
    for level in l.level + 1..MAX_LEVEL {
        assert!(
            l.head[level].is_null(),
            "head link above the top level is set (level={level})"
        );
    }

    // Per level: strictly increasing keys, and exactly the entries whose
    // tower reaches that level.
    let mut below: Option<HashSet<usize>> = None;
    for level in 0..=l.level {
        let mut seen = HashSet::new();
        let mut prev: Option<&K> = None;
        let mut cursor = l.head[level];
        while !cursor.is_null() {
            let entry = l.entry(cursor);
            assert!(
                entry.level_count() > level,
                "entry linked on level {level} but its tower has {} slots",
                entry.level_count()
            );
            if let Some(p) = prev {
                assert!(p < entry.key(), "level {level} not strictly increasing");
            }
            prev = Some(entry.key());
            assert!(seen.insert(cursor.index()), "cycle on level {level}");
            cursor = entry.next(level);
        }

        if let Some(lower) = &below {
            assert!(
                seen.is_subset(lower),
                "level {level} links an entry missing from the level below"
            );
        } else {
            assert_eq!(seen.len(), l.count, "level-0 chain must match len");
        }

        let tall_enough = l
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(e) if e.level_count() > level))
            .count();
        assert_eq!(
            seen.len(),
            tall_enough,
            "every tower reaching level {level} must be linked there"
        );
        below = Some(seen);
    }

    let occupied = l
        .slots
        .iter()
        .filter(|slot| matches!(slot, Slot::Occupied(_)))
        .count();
    assert_eq!(occupied, l.count, "occupied slots must match len");

    let mut free = 0usize;
    let mut cursor = l.free;
    while !cursor.is_null() {
        match &l.slots[cursor.index()] {
            Slot::Vacant(next) => cursor = *next,
            Slot::Occupied(_) => panic!("free chain reaches an occupied slot"),
        }
        free += 1;
        assert!(free <= l.slots.len(), "free chain cycles");
    }
    assert_eq!(free + occupied, l.slots.len(), "every vacant slot must be on the free chain");
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Insert(u8, u32),
    Remove(u8),
    Get(u8),
    GetMut(u8, u32),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(seed in any::<u64>(), ops in prop::collection::vec(any::<Op>(), 0..=1000)) {
        let mut l: SkipList<u8, u32> = SkipList::with_seed(seed);
        let mut m: BTreeMap<u8, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let fresh = !m.contains_key(&key);
                    if fresh {
                        m.insert(key, value);
                    }
                    prop_assert_eq!(l.insert(key, value), fresh);
                }
                Op::Remove(key) => {
                    prop_assert_eq!(l.remove(&key), m.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(l.get(&key).copied(), m.get(&key).copied());
                    prop_assert_eq!(l.contains_key(&key), m.contains_key(&key));
                }
                Op::GetMut(key, value) => {
                    match (l.get_mut(&key), m.get_mut(&key)) {
                        (Some(a), Some(b)) => {
                            *a = value;
                            *b = value;
                        }
                        (None, None) => {}
                        (a, b) => prop_assert!(false, "get_mut mismatch: {:?} vs {:?}", a, b),
                    }
                }
            }

            prop_assert_eq!(l.len(), m.len());
        }

        validate_list(&l);
        let got: Vec<(u8, u32)> = l.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u8, u32)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_duplicate_insert_is_noop(seed in any::<u64>(), keys in prop::collection::vec(any::<u16>(), 1..=200)) {
        let mut l: SkipList<u16, u16> = SkipList::with_seed(seed);
        for &k in &keys {
            l.insert(k, k);
        }
        let before = l.levels().to_string();
        let len = l.len();

        for &k in &keys {
            prop_assert!(!l.insert(k, k.wrapping_add(1)));
        }

        prop_assert_eq!(l.len(), len);
        prop_assert_eq!(l.levels().to_string(), before);
        validate_list(&l);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(
        items: &[T],
        used: &mut [bool],
        out: &mut Vec<T>,
        f: &mut impl FnMut(Vec<T>),
    ) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = ["a", "b", "c", "aa", "ab", "ba"];

    for_each_permutation(&keys, |perm| {
        let mut l: SkipList<&str, u64> = SkipList::with_seed(17);
        let mut m: BTreeMap<&str, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert!(l.insert(k, v));
            m.insert(k, v);
            validate_list(&l);
        }

        let got: Vec<(&str, u64)> = l.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(&str, u64)> = m.into_iter().collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = ["a", "b", "c", "aa", "ab", "ba"];

    // Insert in a fixed order, then remove in all permutations.
    let mut base: SkipList<&str, u64> = SkipList::with_seed(23);
    for (i, k) in keys.iter().enumerate() {
        assert!(base.insert(*k, i as u64));
    }

    for_each_permutation(&keys, |perm| {
        let mut l = base.clone();
        let mut remaining = keys.len();

        for k in perm {
            assert!(l.remove(k).is_some());
            assert!(!l.contains_key(k));
            assert_eq!(l.remove(k), None);
            remaining -= 1;
            assert_eq!(l.len(), remaining);
            validate_list(&l);
        }
        assert!(l.is_empty());
        assert_eq!(l.top_level(), 0);
    });
}
