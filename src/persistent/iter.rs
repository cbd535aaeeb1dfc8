//! Insertion-order traversal.

use std::iter::FusedIterator;

use super::chain::resolve;
use super::config::{DefaultKeyConfig, KeyConfig};
use super::node::{Link, Node};

/// An iterator over the entries of an
/// [`OrderedHashMap`](super::OrderedHashMap) in insertion order.
///
/// The iterator starts at the oldest entry and follows each entry's `next`
/// link, re-resolving it through the trie. It borrows the map, so it always
/// walks the chain of the snapshot it was created from.
pub struct OrderedHashMapIterator<'a, K, V, C = DefaultKeyConfig> {
    root: &'a Node<K, V>,
    config: &'a C,
    cursor: Option<&'a Link<K>>,
    remaining: usize,
}

impl<'a, K, V, C> OrderedHashMapIterator<'a, K, V, C> {
    pub(crate) const fn new(
        root: &'a Node<K, V>,
        config: &'a C,
        start: Option<&'a Link<K>>,
        remaining: usize,
    ) -> Self {
        Self {
            root,
            config,
            cursor: start,
            remaining,
        }
    }
}

impl<'a, K, V, C: KeyConfig<K>> Iterator for OrderedHashMapIterator<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.cursor.take()?;
        let leaf = resolve(self.root, self.config, link)?;
        self.cursor = leaf.next.as_ref();
        self.remaining = self.remaining.saturating_sub(1);
        Some((&leaf.key, &leaf.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, C: KeyConfig<K>> ExactSizeIterator for OrderedHashMapIterator<'_, K, V, C> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V, C: KeyConfig<K>> FusedIterator for OrderedHashMapIterator<'_, K, V, C> {}
