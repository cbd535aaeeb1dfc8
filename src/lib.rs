//! # ordered-hamt
//!
//! A persistent, insertion-ordered hash map and multimap built on a
//! Hash Array Mapped Trie.
//!
//! ## Overview
//!
//! - **Persistent**: every update returns a new map; older snapshots stay
//!   valid and share all untouched structure.
//! - **Insertion ordered**: entries are threaded on a doubly-linked chain,
//!   so iteration follows append order regardless of hash placement.
//! - **Multimap**: [`push`](persistent::OrderedHashMap::push) stores several
//!   values under one key, each with its own position in the chain.
//! - **Transient**: batch updates run on an owned builder that mutates the
//!   nodes it already owns instead of copying them.
//!
//! ## Feature Flags
//!
//! - `arc`: share nodes with `Arc` so immutable maps are `Send + Sync`
//! - `fxhash`: use `rustc-hash` for the default key hash
//! - `ahash`: use fixed-seed `ahash` for the default key hash
//! - `tracing`: emit trace events for node expansion, packing and
//!   transient scopes
//!
//! ## Example
//!
//! ```rust
//! use ordered_hamt::prelude::*;
//!
//! let map = OrderedHashMap::new()
//!     .insert("a", 1)
//!     .insert("b", 2)
//!     .insert("a", 3);
//!
//! assert_eq!(map.get(&"a"), Some(&3));
//! assert_eq!(map.len(), 2);
//!
//! let entries: Vec<(&&str, &i32)> = map.iter().collect();
//! assert_eq!(entries, vec![(&"a", &3), (&"b", &2)]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use ordered_hamt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::persistent::*;
}

#[macro_use]
mod macros;

pub mod persistent;
