//! Cross-thread reads of immutable maps.
//!
//! With the `arc` feature nodes are shared through `Arc`, so a sealed map can
//! be read and extended from several threads at once.

#![cfg(feature = "arc")]

use ordered_hamt::persistent::OrderedHashMap;
use rstest::rstest;
use std::sync::Arc;
use std::thread;

#[rstest]
fn test_map_cross_thread_structural_sharing() {
    let original = Arc::new((0..1_000).fold(OrderedHashMap::new(), |map, key| map.insert(key, key)));

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let map = Arc::clone(&original);
            thread::spawn(move || {
                // Each thread derives its own version
                let extended = map.insert(1_000 + index, index).remove(&index);
                assert_eq!(extended.len(), 1_000);
                assert_eq!(extended.last(), Some((&(1_000 + index), &index)));
                assert_eq!(map.len(), 1_000);
                extended
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .collect();

    for (index, map) in (0..).zip(&results) {
        assert_eq!(map.get(&index), None);
        assert_eq!(map.get(&(1_000 + index)), Some(&index));
    }
    let keys: Vec<i32> = original.keys().copied().collect();
    assert_eq!(keys, (0..1_000).collect::<Vec<_>>());
}

#[rstest]
fn test_sealed_transient_result_is_shareable() {
    let map = OrderedHashMap::new().mutate(|transient| {
        for key in 0..256u32 {
            transient.push(key % 16, key);
        }
    });
    let shared = Arc::new(map);

    let handles: Vec<_> = (0..16u32)
        .map(|key| {
            let map = Arc::clone(&shared);
            thread::spawn(move || map.get_all(&key).into_iter().copied().sum::<u32>())
        })
        .collect();

    for (key, handle) in (0..16u32).zip(handles) {
        let expected: u32 = (0..16).map(|step| key + step * 16).sum();
        assert_eq!(handle.join().expect("Thread panicked"), expected);
    }
}
