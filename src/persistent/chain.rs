//! Insertion-order chain maintenance.
//!
//! Each leaf names its chain neighbours through [`Link`] identities. A link
//! is followed by descending the trie again with the link's hash, which keeps
//! the chain valid across structural sharing at the cost of one lookup per
//! step.

use super::bits::{BITS_PER_LEVEL, from_bitmap, hash_fragment, to_bitmap};
use super::config::KeyConfig;
use super::node::{
    Edit, Leaf, Link, Node, NodeRef, descend, find, replace_child, rewrite_leaf,
};

/// Which neighbour field of a leaf to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Prev,
    Next,
}

/// One neighbour-link rewrite.
pub(crate) struct Relink<'a, K, V, C: ?Sized> {
    pub(crate) edit: Option<Edit>,
    pub(crate) config: &'a C,
    /// Entry whose link changes.
    pub(crate) target: &'a Link<K>,
    pub(crate) side: Side,
    pub(crate) link: Option<Link<K>>,
    pub(crate) empty: &'a NodeRef<K, V>,
}

enum Step {
    Stop,
    Rewrite,
    Child { index: usize, shift: u32 },
}

/// Sets the `prev` or `next` link of the leaf identified by `task.target`
/// and returns the new subtree. Only the path to that leaf is copied.
pub(crate) fn relink<K, V, C>(
    mut node: NodeRef<K, V>,
    shift: u32,
    task: &mut Relink<'_, K, V, C>,
) -> NodeRef<K, V>
where
    K: Clone,
    V: Clone,
    C: KeyConfig<K> + ?Sized,
{
    let target = task.target;
    let config = task.config;
    let step = match &*node {
        Node::Empty => Step::Stop,
        Node::Leaf(leaf) => {
            if leaf.is(target, config) {
                Step::Rewrite
            } else {
                Step::Stop
            }
        }
        Node::Collision { hash, children, .. } => {
            if *hash == target.hash {
                children
                    .iter()
                    .position(|child| {
                        child
                            .terminal_key()
                            .is_some_and(|key| config.key_eq(key, &target.key))
                    })
                    .map_or(Step::Stop, |index| Step::Child { index, shift })
            } else {
                Step::Stop
            }
        }
        Node::Indexed { bitmap, .. } => {
            let bit = to_bitmap(hash_fragment(shift, target.hash));
            if bitmap & bit == 0 {
                Step::Stop
            } else {
                Step::Child {
                    index: from_bitmap(*bitmap, bit),
                    shift: shift + BITS_PER_LEVEL,
                }
            }
        }
        Node::Array { .. } => Step::Child {
            index: hash_fragment(shift, target.hash) as usize,
            shift: shift + BITS_PER_LEVEL,
        },
        Node::Multi {
            hash,
            key,
            children,
            ..
        } => {
            if *hash == target.hash && config.key_eq(key, &target.key) {
                children
                    .iter()
                    .position(|child| child.leaf().is_some_and(|leaf| leaf.id == target.id))
                    .map_or(Step::Stop, |index| Step::Child { index, shift })
            } else {
                Step::Stop
            }
        }
    };

    match step {
        Step::Stop => node,
        Step::Rewrite => {
            let link = task.link.take();
            let side = task.side;
            rewrite_leaf(node, task.edit, move |leaf| match side {
                Side::Prev => leaf.prev = link,
                Side::Next => leaf.next = link,
            })
        }
        Step::Child { index, shift } => {
            let edit = task.edit;
            let empty = task.empty;
            match descend(&mut node, edit, empty, index, |child| {
                relink(child, shift, task)
            }) {
                Some(child) => replace_child(node, edit, index, child),
                None => node,
            }
        }
    }
}

/// Follows a link to the leaf it names.
pub(crate) fn resolve<'a, K, V, C: KeyConfig<K> + ?Sized>(
    root: &'a Node<K, V>,
    config: &C,
    link: &Link<K>,
) -> Option<&'a Leaf<K, V>> {
    match find(root, config, link.hash, &link.key)? {
        Node::Leaf(leaf) => (leaf.id == link.id).then_some(leaf),
        Node::Multi { children, .. } => children
            .iter()
            .filter_map(|child| child.leaf())
            .find(|leaf| leaf.id == link.id),
        _ => None,
    }
}
