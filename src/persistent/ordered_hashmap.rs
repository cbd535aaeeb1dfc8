//! Persistent insertion-ordered hash map and its transient builder.
//!
//! [`OrderedHashMap`] is an immutable HAMT whose leaves are threaded on a
//! doubly-linked chain in append order. Every update returns a new map and
//! leaves the receiver untouched; the two share every node off the updated
//! path.
//!
//! [`TransientOrderedHashMap`] applies the same operations in place. It owns
//! an epoch, and nodes created under that epoch are mutated directly when it
//! touches them again instead of being copied.
//!
//! # Multimap
//!
//! [`push`](OrderedHashMap::push) stores another value under an existing key.
//! The values of one key form a group; each member has its own position in
//! the order chain. Plain single-value operations on a group act on its
//! newest member.
//!
//! # Time Complexity
//!
//! | Operation        | Complexity               |
//! |------------------|--------------------------|
//! | `new`            | O(1)                     |
//! | `get`            | O(log32 N)               |
//! | `insert`         | O(log32 N)               |
//! | `remove`         | O(log32 N)               |
//! | `push`           | O(log32 N + group size)  |
//! | `first` / `last` | O(log32 N)               |
//! | `iter` (full)    | O(N log32 N)             |
//! | `len`            | O(1)                     |

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::mem;
use std::rc::Rc;

use smallvec::SmallVec;

use super::ReferenceCounter;
use super::chain::{Relink, Side, relink, resolve};
use super::config::{DefaultKeyConfig, KeyConfig};
use super::iter::OrderedHashMapIterator;
use super::node::{
    Edit, Leaf, Link, Modification, Node, NodeRef, Update, find, fresh_edit, modify,
};

// =============================================================================
// Lookup result
// =============================================================================

/// Every value stored under one key.
///
/// # Examples
///
/// ```rust
/// use ordered_hamt::persistent::{Lookup, OrderedHashMap};
///
/// let map = OrderedHashMap::new().insert("a", 1).push("b", 2).push("b", 3);
///
/// assert_eq!(map.lookup(&"a"), Some(Lookup::Single(&1)));
/// match map.lookup(&"b") {
///     Some(Lookup::Multi(values)) => assert_eq!(values.as_slice(), &[&2, &3]),
///     other => panic!("unexpected lookup result: {other:?}"),
/// }
/// assert_eq!(map.lookup(&"c"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a, V> {
    /// The key holds one value.
    Single(&'a V),
    /// The key holds a group of values, oldest first.
    Multi(SmallVec<[&'a V; 4]>),
}

impl<'a, V> Lookup<'a, V> {
    /// Returns `true` for a multimap group.
    #[must_use]
    pub const fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// Returns the values, oldest first.
    #[must_use]
    pub fn into_vec(self) -> Vec<&'a V> {
        match self {
            Self::Single(value) => vec![value],
            Self::Multi(values) => values.into_vec(),
        }
    }
}

// =============================================================================
// Trie state shared by both map flavours
// =============================================================================

/// Chain neighbours of an entry about to be removed.
struct Neighbours<K> {
    prev: Option<Link<K>>,
    next: Option<Link<K>>,
}

struct Trie<K, V, C> {
    config: ReferenceCounter<C>,
    root: NodeRef<K, V>,
    /// Shared `Empty` node of this map lineage.
    empty: NodeRef<K, V>,
    size: usize,
    /// Oldest entry.
    start: Option<Link<K>>,
    /// Newest entry, the chain tail.
    insert: Option<Link<K>>,
}

impl<K: Clone, V, C> Clone for Trie<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            root: self.root.clone(),
            empty: self.empty.clone(),
            size: self.size,
            start: self.start.clone(),
            insert: self.insert.clone(),
        }
    }
}

impl<K, V, C> Trie<K, V, C> {
    fn new(config: C) -> Self {
        let empty = ReferenceCounter::new(Node::Empty);
        Self {
            config: ReferenceCounter::new(config),
            root: empty.clone(),
            empty,
            size: 0,
            start: None,
            insert: None,
        }
    }
}

impl<K, V, C: KeyConfig<K>> Trie<K, V, C> {
    fn hash(&self, key: &K) -> u32 {
        self.config.hash(key)
    }

    fn find(&self, hash: u32, key: &K) -> Option<&Node<K, V>> {
        find(&self.root, &*self.config, hash, key)
    }

    /// The leaf a single-value operation on `key` addresses: the entry
    /// itself, or a group member (by id, or the newest one).
    fn member(&self, hash: u32, key: &K, member: Option<u32>) -> Option<&Leaf<K, V>> {
        match (self.find(hash, key)?, member) {
            (Node::Leaf(leaf), _) => Some(leaf),
            (Node::Multi { children, .. }, Some(id)) => children
                .iter()
                .filter_map(|child| child.leaf())
                .find(|leaf| leaf.id == id),
            (Node::Multi { children, .. }, None) => children.last().and_then(|child| child.leaf()),
            _ => None,
        }
    }

    fn lookup(&self, hash: u32, key: &K) -> Option<Lookup<'_, V>> {
        match self.find(hash, key)? {
            Node::Leaf(leaf) => Some(Lookup::Single(&leaf.value)),
            Node::Multi { children, .. } => Some(Lookup::Multi(
                children
                    .iter()
                    .filter_map(|child| child.leaf())
                    .map(|leaf| &leaf.value)
                    .collect(),
            )),
            _ => None,
        }
    }

    fn resolve(&self, link: Option<&Link<K>>) -> Option<&Leaf<K, V>> {
        resolve(&self.root, &*self.config, link?)
    }

    fn iter(&self) -> OrderedHashMapIterator<'_, K, V, C> {
        OrderedHashMapIterator::new(&self.root, &self.config, self.start.as_ref(), self.size)
    }
}

impl<K: Clone, V: Clone, C: KeyConfig<K>> Trie<K, V, C> {
    /// Runs `update` against `key` (or one of its group members) and keeps
    /// the order chain in step with the outcome.
    fn update<F>(&mut self, edit: Option<Edit>, hash: u32, key: &K, member: Option<u32>, update: F)
    where
        F: FnOnce(Option<&V>) -> Update<V>,
    {
        let neighbours = self.member(hash, key, member).map(|leaf| Neighbours {
            prev: leaf.prev.clone(),
            next: leaf.next.clone(),
        });
        let before = self.size;

        let root = mem::replace(&mut self.root, self.empty.clone());
        let mut op = Modification::new(
            edit,
            &*self.config,
            hash,
            key,
            before,
            self.empty.clone(),
            update,
        );
        op.insert = self.insert.clone();
        op.member = member;
        self.root = modify(root, 0, &mut op);
        self.size = op.size;

        if self.size < before {
            if let Some(neighbours) = neighbours {
                self.unlink(edit, neighbours);
            }
        } else if self.size > before {
            self.link_tail(
                edit,
                Link {
                    hash,
                    key: key.clone(),
                    id: 0,
                },
            );
        }
    }

    /// Adds `value` as the newest member of `key`'s group.
    fn push(&mut self, edit: Option<Edit>, hash: u32, key: &K, value: V) {
        let id = match self.find(hash, key) {
            Some(Node::Leaf(leaf)) => leaf.id + 1,
            Some(Node::Multi { children, .. }) => children
                .last()
                .and_then(|child| child.leaf())
                .map_or(0, |leaf| leaf.id + 1),
            _ => 0,
        };
        let before = self.size;

        let root = mem::replace(&mut self.root, self.empty.clone());
        let mut op = Modification::new(
            edit,
            &*self.config,
            hash,
            key,
            before,
            self.empty.clone(),
            move |_: Option<&V>| Update::Set(value),
        );
        op.insert = self.insert.clone();
        op.push = Some(id);
        self.root = modify(root, 0, &mut op);
        self.size = op.size;

        if self.size > before {
            self.link_tail(
                edit,
                Link {
                    hash,
                    key: key.clone(),
                    id,
                },
            );
        }
    }

    fn remove(&mut self, edit: Option<Edit>, hash: u32, key: &K) -> bool {
        let before = self.size;
        self.update(edit, hash, key, None, |_| Update::Remove);
        self.size < before
    }

    /// Removes the oldest member of `key` whose value equals `value`.
    fn remove_value(&mut self, edit: Option<Edit>, hash: u32, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        let member = match self.find(hash, key) {
            Some(Node::Leaf(leaf)) if leaf.value == *value => Some(leaf.id),
            Some(Node::Multi { children, .. }) => children
                .iter()
                .filter_map(|child| child.leaf())
                .find(|leaf| leaf.value == *value)
                .map(|leaf| leaf.id),
            _ => None,
        };
        let Some(id) = member else {
            return false;
        };
        let before = self.size;
        self.update(edit, hash, key, Some(id), |_| Update::Remove);
        self.size < before
    }

    /// Drops every entry for `key`, then adds `value` at the chain tail.
    fn append(&mut self, edit: Option<Edit>, hash: u32, key: &K, value: V) {
        while self.find(hash, key).is_some() {
            if !self.remove(edit, hash, key) {
                break;
            }
        }
        self.update(edit, hash, key, None, move |_| Update::Set(value));
    }

    fn unlink(&mut self, edit: Option<Edit>, neighbours: Neighbours<K>) {
        let Neighbours { prev, next } = neighbours;
        match &prev {
            Some(prev_link) => self.set_link(edit, prev_link, Side::Next, next.clone()),
            None => self.start.clone_from(&next),
        }
        match &next {
            Some(next_link) => self.set_link(edit, next_link, Side::Prev, prev),
            None => self.insert = prev,
        }
    }

    fn link_tail(&mut self, edit: Option<Edit>, link: Link<K>) {
        match self.insert.take() {
            Some(tail) => self.set_link(edit, &tail, Side::Next, Some(link.clone())),
            None => self.start = Some(link.clone()),
        }
        self.insert = Some(link);
    }

    fn set_link(&mut self, edit: Option<Edit>, target: &Link<K>, side: Side, link: Option<Link<K>>) {
        let root = mem::replace(&mut self.root, self.empty.clone());
        let mut task = Relink {
            edit,
            config: &*self.config,
            target,
            side,
            link,
            empty: &self.empty,
        };
        self.root = relink(root, 0, &mut task);
    }
}

// =============================================================================
// OrderedHashMap Definition
// =============================================================================

/// A persistent hash map that iterates in insertion order.
///
/// # Examples
///
/// ```rust
/// use ordered_hamt::persistent::OrderedHashMap;
///
/// let map = OrderedHashMap::new()
///     .insert("a", 1)
///     .insert("b", 2)
///     .insert("a", 3);
///
/// assert_eq!(map.get(&"a"), Some(&3));
/// assert_eq!(map.get(&"b"), Some(&2));
/// assert_eq!(map.len(), 2);
///
/// // Updating an existing key keeps its position
/// let entries: Vec<_> = map.iter().collect();
/// assert_eq!(entries, vec![(&"a", &3), (&"b", &2)]);
/// ```
pub struct OrderedHashMap<K, V, C = DefaultKeyConfig> {
    trie: Trie<K, V, C>,
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(OrderedHashMap<String, i32>: Send, Sync);

#[cfg(not(feature = "arc"))]
static_assertions::assert_not_impl_any!(OrderedHashMap<String, i32>: Send, Sync);

impl<K, V> OrderedHashMap<K, V> {
    /// Creates an empty map that hashes keys with [`DefaultKeyConfig`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map: OrderedHashMap<String, i32> = OrderedHashMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DefaultKeyConfig)
    }
}

impl<K, V, C> OrderedHashMap<K, V, C> {
    /// Creates an empty map that hashes and compares keys through `config`.
    ///
    /// Every map derived from the result shares the same configuration.
    #[must_use]
    pub fn with_config(config: C) -> Self {
        Self {
            trie: Trie::new(config),
        }
    }

    /// Returns the number of entries, counting every multimap member.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.trie.size
    }

    /// Alias of [`len`](Self::len).
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.trie.size
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.trie.size == 0
    }

    /// Returns the key configuration.
    #[must_use]
    pub fn config(&self) -> &C {
        &self.trie.config
    }
}

impl<K, V, C: KeyConfig<K>> OrderedHashMap<K, V, C> {
    /// Returns the value stored for `key`.
    ///
    /// For a multimap group this is the newest member; use
    /// [`lookup`](Self::lookup) or [`get_all`](Self::get_all) to see them all.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map = OrderedHashMap::new().insert("one", 1);
    /// assert_eq!(map.get(&"one"), Some(&1));
    /// assert_eq!(map.get(&"two"), None);
    /// ```
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_with_hash(self.trie.hash(key), key)
    }

    /// [`get`](Self::get) with a caller-computed hash.
    #[must_use]
    pub fn get_with_hash(&self, hash: u32, key: &K) -> Option<&V> {
        self.trie.member(hash, key, None).map(|leaf| &leaf.value)
    }

    /// Returns the value stored for `key`, or `default` when there is none.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map = OrderedHashMap::new().insert("one", 1);
    /// assert_eq!(map.try_get(&"one", &0), &1);
    /// assert_eq!(map.try_get(&"two", &0), &0);
    /// ```
    #[must_use]
    pub fn try_get<'a>(&'a self, key: &K, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    /// [`try_get`](Self::try_get) with a caller-computed hash.
    #[must_use]
    pub fn try_get_with_hash<'a>(&'a self, hash: u32, key: &K, default: &'a V) -> &'a V {
        self.get_with_hash(hash, key).unwrap_or(default)
    }

    /// Returns `true` if the map holds an entry for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.contains_key_with_hash(self.trie.hash(key), key)
    }

    /// [`contains_key`](Self::contains_key) with a caller-computed hash.
    #[must_use]
    pub fn contains_key_with_hash(&self, hash: u32, key: &K) -> bool {
        self.trie.find(hash, key).is_some()
    }

    /// Returns every value stored under `key`.
    #[must_use]
    pub fn lookup(&self, key: &K) -> Option<Lookup<'_, V>> {
        self.lookup_with_hash(self.trie.hash(key), key)
    }

    /// [`lookup`](Self::lookup) with a caller-computed hash.
    #[must_use]
    pub fn lookup_with_hash(&self, hash: u32, key: &K) -> Option<Lookup<'_, V>> {
        self.trie.lookup(hash, key)
    }

    /// Returns every value stored under `key`, oldest first; empty if the key
    /// is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map = OrderedHashMap::new().push("k", 1).push("k", 2);
    /// assert_eq!(map.get_all(&"k"), vec![&1, &2]);
    /// assert!(map.get_all(&"missing").is_empty());
    /// ```
    #[must_use]
    pub fn get_all(&self, key: &K) -> Vec<&V> {
        self.lookup(key).map_or_else(Vec::new, Lookup::into_vec)
    }

    /// Returns the oldest entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map = OrderedHashMap::new().insert("x", 1).insert("y", 2);
    /// assert_eq!(map.first(), Some((&"x", &1)));
    /// assert_eq!(map.last(), Some((&"y", &2)));
    /// ```
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.trie
            .resolve(self.trie.start.as_ref())
            .map(|leaf| (&leaf.key, &leaf.value))
    }

    /// Returns the newest entry.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.trie
            .resolve(self.trie.insert.as_ref())
            .map(|leaf| (&leaf.key, &leaf.value))
    }

    /// Returns the entry that follows `key` in insertion order.
    ///
    /// For a multimap group the newest member's successor is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map = OrderedHashMap::new().insert(1, 'a').insert(2, 'b');
    /// assert_eq!(map.successor(&1), Some((&2, &'b')));
    /// assert_eq!(map.successor(&2), None);
    /// ```
    #[must_use]
    pub fn successor(&self, key: &K) -> Option<(&K, &V)> {
        let leaf = self.trie.member(self.trie.hash(key), key, None)?;
        self.trie
            .resolve(leaf.next.as_ref())
            .map(|next| (&next.key, &next.value))
    }

    /// Returns an iterator over the entries in insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map = OrderedHashMap::new().insert(3, "c").insert(1, "a").insert(2, "b");
    /// let keys: Vec<i32> = map.iter().map(|(key, _)| *key).collect();
    /// assert_eq!(keys, vec![3, 1, 2]);
    /// ```
    pub fn iter(&self) -> OrderedHashMapIterator<'_, K, V, C> {
        self.trie.iter()
    }

    /// Alias of [`iter`](Self::iter).
    pub fn entries(&self) -> OrderedHashMapIterator<'_, K, V, C> {
        self.trie.iter()
    }

    /// Returns an iterator over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Folds the entries in insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map = OrderedHashMap::new().insert("a", 1).insert("b", 2);
    /// let joined = map.fold(String::new(), |mut accumulator, value, key| {
    ///     accumulator.push_str(&format!("{key}={value};"));
    ///     accumulator
    /// });
    /// assert_eq!(joined, "a=1;b=2;");
    /// ```
    pub fn fold<A, F>(&self, init: A, mut function: F) -> A
    where
        F: FnMut(A, &V, &K) -> A,
    {
        self.iter()
            .fold(init, |accumulator, (key, value)| function(accumulator, value, key))
    }

    /// Calls `function` on every entry in insertion order.
    pub fn for_each<F>(&self, mut function: F)
    where
        F: FnMut(&V, &K),
    {
        self.iter().for_each(|(key, value)| function(value, key));
    }
}

impl<K: Clone, V: Clone, C: KeyConfig<K>> OrderedHashMap<K, V, C> {
    fn derive(&self, operation: impl FnOnce(&mut Trie<K, V, C>)) -> Self {
        let mut trie = self.trie.clone();
        operation(&mut trie);
        Self { trie }
    }

    /// Returns a map with `key` set to `value`.
    ///
    /// An existing key keeps its position in the order chain; a new key is
    /// appended at the tail.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map1 = OrderedHashMap::new().insert("key", 1);
    /// let map2 = map1.insert("key", 2);
    ///
    /// assert_eq!(map1.get(&"key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get(&"key"), Some(&2)); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        self.insert_with_hash(self.trie.hash(&key), key, value)
    }

    /// [`insert`](Self::insert) with a caller-computed hash.
    #[must_use]
    pub fn insert_with_hash(&self, hash: u32, key: K, value: V) -> Self {
        self.derive(|trie| trie.update(None, hash, &key, None, move |_| Update::Set(value)))
    }

    /// Returns a map with the entry for `key` replaced by the outcome of
    /// `function`, which receives the current value if there is one.
    ///
    /// [`Update::Keep`] leaves the map unchanged.
    #[must_use]
    pub fn modify<F>(&self, key: K, function: F) -> Self
    where
        F: FnOnce(Option<&V>) -> Update<V>,
    {
        self.modify_with_hash(self.trie.hash(&key), key, function)
    }

    /// [`modify`](Self::modify) with a caller-computed hash.
    #[must_use]
    pub fn modify_with_hash<F>(&self, hash: u32, key: K, function: F) -> Self
    where
        F: FnOnce(Option<&V>) -> Update<V>,
    {
        self.derive(|trie| trie.update(None, hash, &key, None, function))
    }

    /// Returns a map without the entry for `key`.
    ///
    /// For a multimap group only the newest member is removed. Removing an
    /// absent key returns an equal map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map = OrderedHashMap::new().insert(1, "one").insert(2, "two");
    /// let removed = map.remove(&1);
    ///
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(removed.len(), 1);
    /// assert_eq!(removed.get(&1), None);
    /// ```
    #[must_use]
    pub fn remove(&self, key: &K) -> Self {
        self.remove_with_hash(self.trie.hash(key), key)
    }

    /// [`remove`](Self::remove) with a caller-computed hash.
    #[must_use]
    pub fn remove_with_hash(&self, hash: u32, key: &K) -> Self {
        self.derive(|trie| {
            trie.remove(None, hash, key);
        })
    }

    /// Returns a map without the oldest entry of `key` whose value equals
    /// `value`.
    #[must_use]
    pub fn remove_value(&self, key: &K, value: &V) -> Self
    where
        V: PartialEq,
    {
        self.remove_value_with_hash(self.trie.hash(key), key, value)
    }

    /// [`remove_value`](Self::remove_value) with a caller-computed hash.
    #[must_use]
    pub fn remove_value_with_hash(&self, hash: u32, key: &K, value: &V) -> Self
    where
        V: PartialEq,
    {
        self.derive(|trie| {
            trie.remove_value(None, hash, key, value);
        })
    }

    /// Returns a map with `value` stored under `key` at the end of the order
    /// chain.
    ///
    /// Unlike [`insert`](Self::insert), an existing key is moved: all of its
    /// entries are removed first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let map = OrderedHashMap::new().insert("a", 1).insert("b", 2).append("a", 3);
    /// let keys: Vec<&&str> = map.keys().collect();
    /// assert_eq!(keys, vec![&"b", &"a"]);
    /// ```
    #[must_use]
    pub fn append(&self, key: K, value: V) -> Self {
        self.append_with_hash(self.trie.hash(&key), key, value)
    }

    /// [`append`](Self::append) with a caller-computed hash.
    #[must_use]
    pub fn append_with_hash(&self, hash: u32, key: K, value: V) -> Self {
        self.derive(|trie| trie.append(None, hash, &key, value))
    }

    /// Returns a map with `value` added to the values of `key`.
    ///
    /// The new value gets its own position at the end of the order chain.
    #[must_use]
    pub fn push(&self, key: K, value: V) -> Self {
        self.push_with_hash(self.trie.hash(&key), key, value)
    }

    /// [`push`](Self::push) with a caller-computed hash.
    #[must_use]
    pub fn push_with_hash(&self, hash: u32, key: K, value: V) -> Self {
        self.derive(|trie| trie.push(None, hash, &key, value))
    }

    /// Opens a transient scope on a copy of this map.
    ///
    /// The transient owns a fresh epoch; this map is never affected by it.
    #[must_use]
    pub fn begin_mutation(&self) -> TransientOrderedHashMap<K, V, C> {
        let edit = fresh_edit();
        trace_event!(edit = edit.get(), depth = 1, "began transient scope");
        TransientOrderedHashMap {
            trie: self.trie.clone(),
            edit,
            depth: 1,
            _marker: PhantomData,
        }
    }

    /// Applies a batch of updates through a transient and returns the
    /// result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::OrderedHashMap;
    ///
    /// let base = OrderedHashMap::new().insert("a", 1);
    /// let updated = base.mutate(|transient| {
    ///     transient.insert("b", 2);
    ///     transient.remove(&"a");
    /// });
    ///
    /// assert_eq!(base.len(), 1);
    /// assert_eq!(updated.get(&"a"), None);
    /// assert_eq!(updated.get(&"b"), Some(&2));
    /// ```
    #[must_use]
    pub fn mutate<F>(&self, function: F) -> Self
    where
        F: FnOnce(&mut TransientOrderedHashMap<K, V, C>),
    {
        let mut transient = self.begin_mutation();
        function(&mut transient);
        transient.persistent()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<K: Clone, V, C> Clone for OrderedHashMap<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            trie: self.trie.clone(),
        }
    }
}

impl<K, V, C: Default> Default for OrderedHashMap<K, V, C> {
    fn default() -> Self {
        Self::with_config(C::default())
    }
}

impl<K, V, C> FromIterator<(K, V)> for OrderedHashMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: KeyConfig<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::default().mutate(|transient| transient.extend(iter))
    }
}

impl<'a, K, V, C: KeyConfig<K>> IntoIterator for &'a OrderedHashMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = OrderedHashMapIterator<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: PartialEq, V: PartialEq, C: KeyConfig<K>> PartialEq for OrderedHashMap<K, V, C> {
    /// Two maps are equal when they hold equal entries in the same order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C: KeyConfig<K>> Eq for OrderedHashMap<K, V, C> {}

impl<K: fmt::Debug, V: fmt::Debug, C: KeyConfig<K>> fmt::Debug for OrderedHashMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Hash + Eq + Clone, V: Clone> From<Vec<(K, V)>> for OrderedHashMap<K, V> {
    fn from(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

// =============================================================================
// TransientOrderedHashMap Definition
// =============================================================================

/// An owned, mutable view of an [`OrderedHashMap`] for batch updates.
///
/// Created by [`OrderedHashMap::begin_mutation`] or inside
/// [`OrderedHashMap::mutate`]. The first touch of a node in a scope copies
/// it; later touches of that copy mutate it in place.
///
/// Scopes nest: [`begin_mutation`](Self::begin_mutation) on a transient
/// deepens the scope and [`end_mutation`](Self::end_mutation) returns
/// [`Mutation::Sealed`] only once the outermost scope has ended.
///
/// # Examples
///
/// ```rust
/// use ordered_hamt::persistent::{Mutation, OrderedHashMap};
///
/// let base: OrderedHashMap<&str, i32> = OrderedHashMap::new();
/// let mut transient = base.begin_mutation();
/// transient.insert("a", 1);
/// transient.push("a", 2);
///
/// let Mutation::Sealed(map) = transient.end_mutation() else {
///     panic!("single scope should seal");
/// };
/// assert_eq!(map.get_all(&"a"), vec![&1, &2]);
/// assert!(base.is_empty());
/// ```
pub struct TransientOrderedHashMap<K, V, C = DefaultKeyConfig> {
    trie: Trie<K, V, C>,
    edit: Edit,
    depth: usize,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientOrderedHashMap<i32, i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientOrderedHashMap<String, String>: Send, Sync);

/// Outcome of [`TransientOrderedHashMap::end_mutation`].
pub enum Mutation<K, V, C = DefaultKeyConfig> {
    /// Outer scopes are still open.
    Open(TransientOrderedHashMap<K, V, C>),
    /// The outermost scope ended.
    Sealed(OrderedHashMap<K, V, C>),
}

impl<K, V, C> Mutation<K, V, C> {
    /// Returns `true` while scopes remain open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: KeyConfig<K>> fmt::Debug for Mutation<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(transient) => formatter.debug_tuple("Open").field(transient).finish(),
            Self::Sealed(map) => formatter.debug_tuple("Sealed").field(map).finish(),
        }
    }
}

impl<K, V, C> TransientOrderedHashMap<K, V, C> {
    /// Returns the number of entries, counting every multimap member.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.trie.size
    }

    /// Returns `true` if the transient holds no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.trie.size == 0
    }

    /// Returns the number of open scopes.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Opens a nested scope.
    pub fn begin_mutation(&mut self) {
        self.depth += 1;
        trace_event!(edit = self.edit.get(), depth = self.depth, "began nested transient scope");
    }

    /// Closes the innermost scope.
    ///
    /// Returns the transient while outer scopes remain, otherwise the sealed
    /// map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordered_hamt::persistent::{Mutation, OrderedHashMap};
    ///
    /// let mut transient = OrderedHashMap::<u8, u8>::new().begin_mutation();
    /// transient.begin_mutation();
    /// transient.insert(1, 1);
    ///
    /// let Mutation::Open(transient) = transient.end_mutation() else {
    ///     panic!("outer scope is still open");
    /// };
    /// assert!(matches!(transient.end_mutation(), Mutation::Sealed(_)));
    /// ```
    pub fn end_mutation(mut self) -> Mutation<K, V, C> {
        self.depth = self.depth.saturating_sub(1);
        trace_event!(edit = self.edit.get(), depth = self.depth, "ended transient scope");
        if self.depth == 0 {
            Mutation::Sealed(OrderedHashMap { trie: self.trie })
        } else {
            Mutation::Open(self)
        }
    }

    /// Seals the transient regardless of open scopes.
    #[must_use]
    pub fn persistent(self) -> OrderedHashMap<K, V, C> {
        trace_event!(edit = self.edit.get(), depth = self.depth, "sealed transient");
        OrderedHashMap { trie: self.trie }
    }
}

impl<K, V, C: KeyConfig<K>> TransientOrderedHashMap<K, V, C> {
    /// Returns the value stored for `key`, the newest member for a group.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_with_hash(self.trie.hash(key), key)
    }

    /// [`get`](Self::get) with a caller-computed hash.
    #[must_use]
    pub fn get_with_hash(&self, hash: u32, key: &K) -> Option<&V> {
        self.trie.member(hash, key, None).map(|leaf| &leaf.value)
    }

    /// Returns `true` if the transient holds an entry for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        let hash = self.trie.hash(key);
        self.trie.find(hash, key).is_some()
    }

    /// Returns every value stored under `key`.
    #[must_use]
    pub fn lookup(&self, key: &K) -> Option<Lookup<'_, V>> {
        self.trie.lookup(self.trie.hash(key), key)
    }

    /// Returns an iterator over the entries in insertion order.
    pub fn iter(&self) -> OrderedHashMapIterator<'_, K, V, C> {
        self.trie.iter()
    }
}

impl<K: Clone, V: Clone, C: KeyConfig<K>> TransientOrderedHashMap<K, V, C> {
    /// Sets `key` to `value`, keeping the position of an existing key.
    pub fn insert(&mut self, key: K, value: V) {
        let hash = self.trie.hash(&key);
        self.insert_with_hash(hash, key, value);
    }

    /// [`insert`](Self::insert) with a caller-computed hash.
    pub fn insert_with_hash(&mut self, hash: u32, key: K, value: V) {
        self.trie
            .update(Some(self.edit), hash, &key, None, move |_| Update::Set(value));
    }

    /// Replaces the entry for `key` with the outcome of `function`.
    pub fn modify<F>(&mut self, key: K, function: F)
    where
        F: FnOnce(Option<&V>) -> Update<V>,
    {
        let hash = self.trie.hash(&key);
        self.modify_with_hash(hash, key, function);
    }

    /// [`modify`](Self::modify) with a caller-computed hash.
    pub fn modify_with_hash<F>(&mut self, hash: u32, key: K, function: F)
    where
        F: FnOnce(Option<&V>) -> Update<V>,
    {
        self.trie.update(Some(self.edit), hash, &key, None, function);
    }

    /// Removes the entry for `key` (the newest member for a group).
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&mut self, key: &K) -> bool {
        let hash = self.trie.hash(key);
        self.remove_with_hash(hash, key)
    }

    /// [`remove`](Self::remove) with a caller-computed hash.
    pub fn remove_with_hash(&mut self, hash: u32, key: &K) -> bool {
        self.trie.remove(Some(self.edit), hash, key)
    }

    /// Removes the oldest entry of `key` whose value equals `value`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove_value(&mut self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        let hash = self.trie.hash(key);
        self.remove_value_with_hash(hash, key, value)
    }

    /// [`remove_value`](Self::remove_value) with a caller-computed hash.
    pub fn remove_value_with_hash(&mut self, hash: u32, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.trie.remove_value(Some(self.edit), hash, key, value)
    }

    /// Stores `value` under `key` at the end of the order chain, dropping any
    /// earlier entries for `key`.
    pub fn append(&mut self, key: K, value: V) {
        let hash = self.trie.hash(&key);
        self.append_with_hash(hash, key, value);
    }

    /// [`append`](Self::append) with a caller-computed hash.
    pub fn append_with_hash(&mut self, hash: u32, key: K, value: V) {
        self.trie.append(Some(self.edit), hash, &key, value);
    }

    /// Adds `value` to the values of `key`.
    pub fn push(&mut self, key: K, value: V) {
        let hash = self.trie.hash(&key);
        self.push_with_hash(hash, key, value);
    }

    /// [`push`](Self::push) with a caller-computed hash.
    pub fn push_with_hash(&mut self, hash: u32, key: K, value: V) {
        self.trie.push(Some(self.edit), hash, &key, value);
    }
}

impl<K: Clone, V: Clone, C: KeyConfig<K>> Extend<(K, V)> for TransientOrderedHashMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: KeyConfig<K>> fmt::Debug for TransientOrderedHashMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
