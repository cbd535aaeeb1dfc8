//! Tests for multimap groups built with `push`.

use ordered_hamt::persistent::{Lookup, OrderedHashMap, StringKeyConfig, Update};
use rstest::rstest;

fn entries<'a>(map: &'a OrderedHashMap<&'static str, i32>) -> Vec<(&'a str, i32)> {
    map.iter().map(|(key, value)| (*key, *value)).collect()
}

// =============================================================================
// Push
// =============================================================================

#[rstest]
fn test_push_onto_absent_key_creates_single_entry() {
    let map = OrderedHashMap::new().push("k", 1);
    assert_eq!(map.len(), 1);
    assert_eq!(map.lookup(&"k"), Some(Lookup::Single(&1)));
}

#[rstest]
fn test_two_pushes_aggregate_both_values() {
    let map = OrderedHashMap::new().push("k", 1).push("k", 2);
    assert_eq!(map.len(), 2);
    let lookup = map.lookup(&"k");
    assert!(lookup.as_ref().is_some_and(Lookup::is_multi));
    assert_eq!(lookup.map(Lookup::into_vec), Some(vec![&1, &2]));
}

#[rstest]
fn test_push_onto_inserted_key_promotes_it() {
    let map = OrderedHashMap::new().insert("k", 1).insert("other", 0).push("k", 2);
    assert_eq!(map.get_all(&"k"), vec![&1, &2]);
    assert_eq!(entries(&map), vec![("k", 1), ("other", 0), ("k", 2)]);
}

#[rstest]
fn test_members_interleave_in_global_order() {
    let map = OrderedHashMap::new()
        .push("x", 1)
        .push("y", 2)
        .push("x", 3)
        .push("y", 4)
        .push("x", 5);

    assert_eq!(
        entries(&map),
        vec![("x", 1), ("y", 2), ("x", 3), ("y", 4), ("x", 5)]
    );
    assert_eq!(map.get_all(&"x"), vec![&1, &3, &5]);
    assert_eq!(map.get_all(&"y"), vec![&2, &4]);
}

#[rstest]
fn test_duplicate_pairs_are_allowed() {
    let map = OrderedHashMap::new().push("k", 1).push("k", 1);
    assert_eq!(map.len(), 2);
    assert_eq!(map.get_all(&"k"), vec![&1, &1]);

    let map = map.remove_value(&"k", &1);
    assert_eq!(map.len(), 1);
    assert_eq!(map.get_all(&"k"), vec![&1]);
}

// =============================================================================
// Removal
// =============================================================================

#[rstest]
fn test_remove_value_keeps_other_members_and_order() {
    let map = OrderedHashMap::new()
        .push("k", 1)
        .push("j", 9)
        .push("k", 2)
        .push("k", 3);

    let removed = map.remove_value(&"k", &1);
    assert_eq!(removed.get_all(&"k"), vec![&2, &3]);
    assert_eq!(entries(&removed), vec![("j", 9), ("k", 2), ("k", 3)]);

    let middle = map.remove_value(&"k", &2);
    assert_eq!(entries(&middle), vec![("k", 1), ("j", 9), ("k", 3)]);
    assert_eq!(map.len(), 4);
}

#[rstest]
fn test_remove_value_without_match_is_noop() {
    let map = OrderedHashMap::new().push("k", 1).push("k", 2);
    assert_eq!(map.remove_value(&"k", &7), map);
    assert_eq!(map.remove_value(&"absent", &1), map);
}

#[rstest]
fn test_group_collapses_to_last_member() {
    let map = OrderedHashMap::new().push("k", 1).push("k", 2);
    let single = map.remove_value(&"k", &1);
    assert_eq!(single.lookup(&"k"), Some(Lookup::Single(&2)));

    // The collapsed leaf keeps its member id, so later pushes still line up
    let regrown = single.push("k", 3);
    assert_eq!(regrown.get_all(&"k"), vec![&2, &3]);
    assert_eq!(entries(&regrown), vec![("k", 2), ("k", 3)]);
}

#[rstest]
fn test_remove_targets_newest_member() {
    let map = OrderedHashMap::new().push("k", 1).push("k", 2).push("k", 3);
    let map = map.remove(&"k");
    assert_eq!(map.get_all(&"k"), vec![&1, &2]);
    let map = map.remove(&"k").remove(&"k");
    assert!(map.is_empty());
    assert_eq!(map.first(), None);
}

// =============================================================================
// Single-value operations on groups
// =============================================================================

#[rstest]
fn test_get_returns_newest_member() {
    let map = OrderedHashMap::new().push("k", 1).push("k", 2);
    assert_eq!(map.get(&"k"), Some(&2));
    assert!(map.contains_key(&"k"));
}

#[rstest]
fn test_insert_and_modify_update_newest_member() {
    let map = OrderedHashMap::new().push("k", 1).push("k", 2);
    let map = map.insert("k", 20);
    assert_eq!(map.get_all(&"k"), vec![&1, &20]);

    let map = map.modify("k", |current| Update::Set(current.copied().unwrap_or(0) * 2));
    assert_eq!(map.get_all(&"k"), vec![&1, &40]);
    assert_eq!(map.len(), 2);
}

#[rstest]
fn test_append_replaces_whole_group() {
    let map = OrderedHashMap::new()
        .push("k", 1)
        .push("k", 2)
        .push("j", 3)
        .append("k", 4);
    assert_eq!(entries(&map), vec![("j", 3), ("k", 4)]);
    assert_eq!(map.lookup(&"k"), Some(Lookup::Single(&4)));
}

#[rstest]
fn test_successor_of_group_uses_newest_member() {
    let map = OrderedHashMap::new()
        .push("k", 1)
        .push("j", 2)
        .push("k", 3)
        .push("i", 4);
    assert_eq!(map.successor(&"k"), Some((&"i", &4)));
}

// =============================================================================
// Groups inside collision nodes
// =============================================================================

#[rstest]
fn test_groups_under_colliding_keys() {
    let map = OrderedHashMap::with_config(StringKeyConfig)
        .push("Aa", 1)
        .push("BB", 2)
        .push("Aa", 3)
        .push("BB", 4);

    assert_eq!(map.get_all(&"Aa"), vec![&1, &3]);
    assert_eq!(map.get_all(&"BB"), vec![&2, &4]);

    let map = map.remove_value(&"Aa", &1).remove(&"BB");
    let entries: Vec<_> = map.iter().collect();
    assert_eq!(entries, vec![(&"BB", &2), (&"Aa", &3)]);
}

#[rstest]
fn test_transient_push_matches_persistent_push() {
    let persistent = (0..30).fold(OrderedHashMap::new(), |map, index| map.push(index % 4, index));
    let transient = OrderedHashMap::new().mutate(|transient| {
        for index in 0..30 {
            transient.push(index % 4, index);
        }
    });
    assert_eq!(persistent, transient);
    assert_eq!(transient.get_all(&0), vec![&0, &4, &8, &12, &16, &20, &24, &28]);
}
