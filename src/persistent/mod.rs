//! Persistent insertion-ordered hash map.
//!
//! This module provides [`OrderedHashMap`], an immutable Hash Array Mapped
//! Trie whose entries are threaded on a doubly-linked insertion-order chain,
//! and [`TransientOrderedHashMap`], its owned builder for batch updates.
//!
//! # Structural Sharing
//!
//! Every update copies only the nodes on the path to the changed entry (and
//! to its chain neighbours); everything else is shared with the previous
//! snapshot.
//!
//! # Examples
//!
//! ## Ordered map
//!
//! ```rust
//! use ordered_hamt::persistent::OrderedHashMap;
//!
//! let map = OrderedHashMap::new()
//!     .insert("one", 1)
//!     .insert("two", 2);
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.remove(&"one");
//! assert_eq!(map.get(&"one"), Some(&1));
//! assert_eq!(updated.get(&"one"), None);
//!
//! // Re-adding a key appends it at the end of the order chain
//! let readded = updated.insert("one", 10);
//! let keys: Vec<&&str> = readded.keys().collect();
//! assert_eq!(keys, vec![&"two", &"one"]);
//! ```
//!
//! ## Multimap
//!
//! ```rust
//! use ordered_hamt::persistent::{Lookup, OrderedHashMap};
//!
//! let map = OrderedHashMap::new()
//!     .push("tag", "red")
//!     .push("tag", "blue");
//!
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.get_all(&"tag"), vec![&"red", &"blue"]);
//! assert!(matches!(map.lookup(&"tag"), Some(Lookup::Multi(_))));
//!
//! let map = map.remove_value(&"tag", &"red");
//! assert_eq!(map.get(&"tag"), Some(&"blue"));
//! ```
//!
//! ## Transient batch updates
//!
//! ```rust
//! use ordered_hamt::persistent::OrderedHashMap;
//!
//! let base: OrderedHashMap<u32, u32> = OrderedHashMap::new();
//! let filled = base.mutate(|transient| {
//!     for index in 0..100 {
//!         transient.insert(index, index * 2);
//!     }
//! });
//!
//! assert!(base.is_empty());
//! assert_eq!(filled.len(), 100);
//! assert_eq!(filled.get(&42), Some(&84));
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

pub mod bits;
mod array;
mod chain;
mod config;
mod iter;
mod node;
mod ordered_hashmap;

pub use config::CustomHash;
pub use config::DefaultKeyConfig;
pub use config::FnKeyConfig;
pub use config::KeyConfig;
pub use config::StringKeyConfig;
pub use iter::OrderedHashMapIterator;
pub use node::Update;
pub use ordered_hashmap::Lookup;
pub use ordered_hashmap::Mutation;
pub use ordered_hashmap::OrderedHashMap;
pub use ordered_hashmap::TransientOrderedHashMap;

// =============================================================================
// Tests
// =============================================================================
