//! Trie nodes and the modify protocol.
//!
//! # Node kinds
//!
//! - `Empty`: no entry
//! - `Leaf`: one entry, with its order-chain links
//! - `Collision`: entries sharing a full hash but not a key
//! - `Indexed`: sparse branch, bitmap plus dense child array
//! - `Array`: dense branch, 32 slots addressed by fragment
//! - `Multi`: multimap group, leaves sharing a key, ordered by id
//!
//! # Editing discipline
//!
//! Every node but `Empty` carries the epoch it was created in. A node may be
//! changed in place only when its epoch is the epoch of the running
//! transient scope and nobody else holds a reference to it. Everything else
//! is copied, and the copy is stamped with the running epoch so the next
//! touch in the same scope can reuse it. Persistent operations run without an
//! epoch and therefore always copy.

use std::borrow::Cow;
use std::mem;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ReferenceCounter;
use super::array::{array_splice_in, array_splice_out, array_update};
use super::bits::{
    BITS_PER_LEVEL, BUCKET_SIZE, MAX_INDEX_NODE, MIN_ARRAY_NODE, from_bitmap, hash_fragment,
    to_bitmap,
};
use super::config::KeyConfig;

// =============================================================================
// Epochs
// =============================================================================

/// Identifier of one transient scope.
pub(crate) type Edit = NonZeroU64;

static NEXT_EDIT: AtomicU64 = AtomicU64::new(1);

/// Returns an epoch no other scope in this process has used.
pub(crate) fn fresh_edit() -> Edit {
    NonZeroU64::new(NEXT_EDIT.fetch_add(1, Ordering::Relaxed)).unwrap_or(NonZeroU64::MIN)
}

// =============================================================================
// Update instruction
// =============================================================================

/// Outcome of an update function passed to
/// [`OrderedHashMap::modify`](super::OrderedHashMap::modify).
///
/// # Examples
///
/// ```rust
/// use ordered_hamt::persistent::{OrderedHashMap, Update};
///
/// let map = OrderedHashMap::new().insert("hits", 1);
/// let map = map.modify("hits", |current| match current {
///     Some(count) => Update::Set(count + 1),
///     None => Update::Set(1),
/// });
/// assert_eq!(map.get(&"hits"), Some(&2));
///
/// let map = map.modify("hits", |_| Update::Remove);
/// assert!(map.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update<V> {
    /// Store this value.
    Set(V),
    /// Delete the entry.
    Remove,
    /// Leave the map untouched.
    Keep,
}

// =============================================================================
// Node Definition
// =============================================================================

/// Stable address of one entry: `(hash, key, id)`.
///
/// Order links name their neighbours by identity instead of by pointer,
/// because persistent updates replace the nodes a pointer would refer to.
#[derive(Debug, Clone)]
pub(crate) struct Link<K> {
    pub(crate) hash: u32,
    pub(crate) key: K,
    pub(crate) id: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct Leaf<K, V> {
    pub(crate) edit: Option<Edit>,
    pub(crate) hash: u32,
    pub(crate) key: K,
    pub(crate) value: V,
    /// Position within a multimap group, 0 for plain entries.
    pub(crate) id: u32,
    pub(crate) prev: Option<Link<K>>,
    pub(crate) next: Option<Link<K>>,
}

impl<K, V> Leaf<K, V> {
    /// Returns `true` if `link` names this leaf.
    pub(crate) fn is<C: KeyConfig<K> + ?Sized>(&self, link: &Link<K>, config: &C) -> bool {
        self.hash == link.hash && self.id == link.id && config.key_eq(&self.key, &link.key)
    }
}

pub(crate) type NodeRef<K, V> = ReferenceCounter<Node<K, V>>;

#[derive(Debug, Clone)]
pub(crate) enum Node<K, V> {
    Empty,
    Leaf(Leaf<K, V>),
    /// Terminal children (`Leaf` or `Multi`) with one hash and distinct keys.
    Collision {
        edit: Option<Edit>,
        hash: u32,
        children: Vec<NodeRef<K, V>>,
    },
    /// Invariant: `bitmap.count_ones() == children.len()`.
    Indexed {
        edit: Option<Edit>,
        bitmap: u32,
        children: Vec<NodeRef<K, V>>,
    },
    /// Exactly 32 slots; `size` counts the non-empty ones.
    Array {
        edit: Option<Edit>,
        size: usize,
        children: Vec<NodeRef<K, V>>,
    },
    /// `Leaf` children with one key, in increasing id order.
    Multi {
        edit: Option<Edit>,
        hash: u32,
        key: K,
        children: Vec<NodeRef<K, V>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Empty,
    Leaf,
    Collision,
    Indexed,
    Array,
    Multi,
}

/// Header field to change alongside a child array.
#[derive(Debug, Clone, Copy)]
enum Header {
    Keep,
    Bitmap(u32),
    Size(usize),
}

impl<K, V> Node<K, V> {
    pub(crate) const fn kind(&self) -> Kind {
        match self {
            Self::Empty => Kind::Empty,
            Self::Leaf(_) => Kind::Leaf,
            Self::Collision { .. } => Kind::Collision,
            Self::Indexed { .. } => Kind::Indexed,
            Self::Array { .. } => Kind::Array,
            Self::Multi { .. } => Kind::Multi,
        }
    }

    pub(crate) const fn edit(&self) -> Option<Edit> {
        match self {
            Self::Empty => None,
            Self::Leaf(leaf) => leaf.edit,
            Self::Collision { edit, .. }
            | Self::Indexed { edit, .. }
            | Self::Array { edit, .. }
            | Self::Multi { edit, .. } => *edit,
        }
    }

    pub(crate) const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Nodes that hold entries directly rather than branching on fragments.
    pub(crate) const fn is_leaf_like(&self) -> bool {
        !matches!(self, Self::Indexed { .. } | Self::Array { .. })
    }

    pub(crate) const fn leaf(&self) -> Option<&Leaf<K, V>> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Key of a `Leaf` or `Multi` node.
    pub(crate) const fn terminal_key(&self) -> Option<&K> {
        match self {
            Self::Leaf(leaf) => Some(&leaf.key),
            Self::Multi { key, .. } => Some(key),
            _ => None,
        }
    }

    pub(crate) fn children(&self) -> &[NodeRef<K, V>] {
        match self {
            Self::Empty | Self::Leaf(_) => &[],
            Self::Collision { children, .. }
            | Self::Indexed { children, .. }
            | Self::Array { children, .. }
            | Self::Multi { children, .. } => children,
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<NodeRef<K, V>>> {
        match self {
            Self::Empty | Self::Leaf(_) => None,
            Self::Collision { children, .. }
            | Self::Indexed { children, .. }
            | Self::Array { children, .. }
            | Self::Multi { children, .. } => Some(children),
        }
    }

    fn apply_header(&mut self, header: Header) {
        match (self, header) {
            (Self::Indexed { bitmap, .. }, Header::Bitmap(value)) => *bitmap = value,
            (Self::Array { size, .. }, Header::Size(value)) => *size = value,
            _ => {}
        }
    }
}

impl<K: Clone, V: Clone> Node<K, V> {
    /// Copy of this branch or group with new children, stamped with `edit`.
    fn rebuild(&self, edit: Option<Edit>, children: Vec<NodeRef<K, V>>, header: Header) -> Self {
        let mut node = match self {
            Self::Collision { hash, .. } => Self::Collision {
                edit,
                hash: *hash,
                children,
            },
            Self::Indexed { bitmap, .. } => Self::Indexed {
                edit,
                bitmap: *bitmap,
                children,
            },
            Self::Array { size, .. } => Self::Array {
                edit,
                size: *size,
                children,
            },
            Self::Multi { hash, key, .. } => Self::Multi {
                edit,
                hash: *hash,
                key: key.clone(),
                children,
            },
            Self::Empty | Self::Leaf(_) => self.clone(),
        };
        node.apply_header(header);
        node
    }
}

// =============================================================================
// Copy-or-mutate helpers
// =============================================================================

/// Returns the node for in-place editing if it belongs to `edit` and is not
/// shared.
fn owned_mut<K, V>(node: &mut NodeRef<K, V>, edit: Option<Edit>) -> Option<&mut Node<K, V>> {
    match edit {
        Some(edit) if node.edit() == Some(edit) => ReferenceCounter::get_mut(node),
        _ => None,
    }
}

/// Rewrites the child array of a branch or group node, in place when owned.
fn rewrite_children<K: Clone, V: Clone>(
    mut node: NodeRef<K, V>,
    edit: Option<Edit>,
    header: Header,
    rewrite: impl FnOnce(Cow<'_, [NodeRef<K, V>]>) -> Vec<NodeRef<K, V>>,
) -> NodeRef<K, V> {
    if let Some(inner) = owned_mut(&mut node, edit) {
        if let Some(children) = inner.children_mut() {
            let owned = mem::take(children);
            *children = rewrite(Cow::Owned(owned));
        }
        inner.apply_header(header);
        return node;
    }
    let children = rewrite(Cow::Borrowed(node.children()));
    ReferenceCounter::new(node.rebuild(edit, children, header))
}

/// Replaces one child of a branch or group node.
pub(crate) fn replace_child<K: Clone, V: Clone>(
    node: NodeRef<K, V>,
    edit: Option<Edit>,
    index: usize,
    child: NodeRef<K, V>,
) -> NodeRef<K, V> {
    rewrite_children(node, edit, Header::Keep, |children| {
        array_update(children, index, child)
    })
}

/// Applies `rewrite` to a leaf, in place when owned.
pub(crate) fn rewrite_leaf<K: Clone, V: Clone>(
    mut node: NodeRef<K, V>,
    edit: Option<Edit>,
    rewrite: impl FnOnce(&mut Leaf<K, V>),
) -> NodeRef<K, V> {
    if let Some(Node::Leaf(leaf)) = owned_mut(&mut node, edit) {
        rewrite(leaf);
        return node;
    }
    match &*node {
        Node::Leaf(leaf) => {
            let mut copy = leaf.clone();
            copy.edit = edit;
            rewrite(&mut copy);
            ReferenceCounter::new(Node::Leaf(copy))
        }
        _ => node,
    }
}

/// Stores a new value in a leaf, keeping its identity and links.
fn set_leaf_value<K: Clone, V: Clone>(
    mut node: NodeRef<K, V>,
    edit: Option<Edit>,
    value: V,
) -> NodeRef<K, V> {
    if let Some(Node::Leaf(leaf)) = owned_mut(&mut node, edit) {
        leaf.value = value;
        return node;
    }
    match &*node {
        Node::Leaf(leaf) => ReferenceCounter::new(Node::Leaf(Leaf {
            edit,
            hash: leaf.hash,
            key: leaf.key.clone(),
            value,
            id: leaf.id,
            prev: leaf.prev.clone(),
            next: leaf.next.clone(),
        })),
        _ => node,
    }
}

/// Runs `step` on the child at `index`.
///
/// An owned parent hands the child over (leaving `placeholder` in the slot)
/// so the child can be edited in place as well; the result must then be
/// written back. A shared parent keeps its child, and `None` reports that
/// `step` returned it unchanged.
pub(crate) fn descend<K, V>(
    node: &mut NodeRef<K, V>,
    edit: Option<Edit>,
    placeholder: &NodeRef<K, V>,
    index: usize,
    step: impl FnOnce(NodeRef<K, V>) -> NodeRef<K, V>,
) -> Option<NodeRef<K, V>> {
    if let Some(children) = owned_mut(node, edit).and_then(|inner| inner.children_mut()) {
        let child = mem::replace(&mut children[index], placeholder.clone());
        return Some(step(child));
    }
    let child = node.children()[index].clone();
    let updated = step(child);
    (!ReferenceCounter::ptr_eq(&updated, &node.children()[index])).then_some(updated)
}

// =============================================================================
// Lookup
// =============================================================================

/// Finds the `Leaf` or `Multi` node holding `key`.
pub(crate) fn find<'a, K, V, C: KeyConfig<K> + ?Sized>(
    root: &'a Node<K, V>,
    config: &C,
    hash: u32,
    key: &K,
) -> Option<&'a Node<K, V>> {
    let mut node = root;
    let mut shift = 0;
    loop {
        match node {
            Node::Empty => return None,
            Node::Leaf(leaf) => {
                return (leaf.hash == hash && config.key_eq(&leaf.key, key)).then_some(node);
            }
            Node::Multi {
                hash: group_hash,
                key: group_key,
                ..
            } => {
                return (*group_hash == hash && config.key_eq(group_key, key)).then_some(node);
            }
            Node::Collision {
                hash: group_hash,
                children,
                ..
            } => {
                if *group_hash != hash {
                    return None;
                }
                return children.iter().map(|child| &**child).find(|child| {
                    child
                        .terminal_key()
                        .is_some_and(|child_key| config.key_eq(child_key, key))
                });
            }
            Node::Indexed {
                bitmap, children, ..
            } => {
                let bit = to_bitmap(hash_fragment(shift, hash));
                if bitmap & bit == 0 {
                    return None;
                }
                node = &*children[from_bitmap(*bitmap, bit)];
                shift += BITS_PER_LEVEL;
            }
            Node::Array { children, .. } => {
                node = &*children[hash_fragment(shift, hash) as usize];
                shift += BITS_PER_LEVEL;
            }
        }
    }
}

// =============================================================================
// Modify protocol
// =============================================================================

/// State threaded through one modify descent.
pub(crate) struct Modification<'a, K, V, C: ?Sized, F> {
    pub(crate) edit: Option<Edit>,
    pub(crate) config: &'a C,
    pub(crate) hash: u32,
    pub(crate) key: &'a K,
    /// Live entry count, adjusted when a leaf appears or disappears.
    pub(crate) size: usize,
    /// `prev` link given to a newly created leaf.
    pub(crate) insert: Option<Link<K>>,
    /// Id of the multimap member to add; `None` for plain updates.
    pub(crate) push: Option<u32>,
    /// Id of the multimap member to update; `None` targets the newest.
    pub(crate) member: Option<u32>,
    pub(crate) empty: NodeRef<K, V>,
    update: Option<F>,
}

impl<'a, K, V, C, F> Modification<'a, K, V, C, F>
where
    K: Clone,
    C: KeyConfig<K> + ?Sized,
    F: FnOnce(Option<&V>) -> Update<V>,
{
    pub(crate) fn new(
        edit: Option<Edit>,
        config: &'a C,
        hash: u32,
        key: &'a K,
        size: usize,
        empty: NodeRef<K, V>,
        update: F,
    ) -> Self {
        Self {
            edit,
            config,
            hash,
            key,
            size,
            insert: None,
            push: None,
            member: None,
            empty,
            update: Some(update),
        }
    }

    /// Calls the update function; it runs at most once per descent.
    fn apply(&mut self, current: Option<&V>) -> Update<V> {
        self.update
            .take()
            .map_or(Update::Keep, |update| update(current))
    }

    fn matches(&self, hash: u32, key: &K) -> bool {
        hash == self.hash && self.config.key_eq(key, self.key)
    }

    fn new_leaf(&self, value: V, id: u32) -> NodeRef<K, V> {
        ReferenceCounter::new(Node::Leaf(Leaf {
            edit: self.edit,
            hash: self.hash,
            key: self.key.clone(),
            value,
            id,
            prev: self.insert.clone(),
            next: None,
        }))
    }

    fn new_id(&self) -> u32 {
        self.push.unwrap_or(0)
    }
}

/// Applies the modification to the subtree at `node` (which sits at `shift`)
/// and returns the new subtree.
///
/// In persistent mode an unchanged subtree is returned as the same pointer.
pub(crate) fn modify<K, V, C, F>(
    node: NodeRef<K, V>,
    shift: u32,
    op: &mut Modification<'_, K, V, C, F>,
) -> NodeRef<K, V>
where
    K: Clone,
    V: Clone,
    C: KeyConfig<K> + ?Sized,
    F: FnOnce(Option<&V>) -> Update<V>,
{
    match node.kind() {
        Kind::Empty => modify_empty(node, op),
        Kind::Leaf => modify_leaf(node, shift, op),
        Kind::Collision => modify_collision(node, shift, op),
        Kind::Indexed => modify_indexed(node, shift, op),
        Kind::Array => modify_array(node, shift, op),
        Kind::Multi => modify_multi(node, shift, op),
    }
}

fn modify_empty<K, V, C, F>(
    node: NodeRef<K, V>,
    op: &mut Modification<'_, K, V, C, F>,
) -> NodeRef<K, V>
where
    K: Clone,
    C: KeyConfig<K> + ?Sized,
    F: FnOnce(Option<&V>) -> Update<V>,
{
    match op.apply(None) {
        Update::Set(value) => {
            op.size += 1;
            op.new_leaf(value, op.new_id())
        }
        Update::Remove | Update::Keep => node,
    }
}

fn modify_leaf<K, V, C, F>(
    node: NodeRef<K, V>,
    shift: u32,
    op: &mut Modification<'_, K, V, C, F>,
) -> NodeRef<K, V>
where
    K: Clone,
    V: Clone,
    C: KeyConfig<K> + ?Sized,
    F: FnOnce(Option<&V>) -> Update<V>,
{
    let Node::Leaf(leaf) = &*node else {
        return node;
    };
    if !op.matches(leaf.hash, &leaf.key) {
        let hash = leaf.hash;
        return insert_beside(node, hash, shift, op);
    }
    if let Some(id) = op.push {
        let key = leaf.key.clone();
        return match op.apply(None) {
            Update::Set(value) => {
                op.size += 1;
                let member = op.new_leaf(value, id);
                ReferenceCounter::new(Node::Multi {
                    edit: op.edit,
                    hash: op.hash,
                    key,
                    children: vec![node, member],
                })
            }
            Update::Remove | Update::Keep => node,
        };
    }
    let update = op.apply(Some(&leaf.value));
    match update {
        Update::Keep => node,
        Update::Remove => {
            op.size -= 1;
            op.empty.clone()
        }
        Update::Set(value) => set_leaf_value(node, op.edit, value),
    }
}

/// Adds a new leaf next to a terminal node whose key differs.
fn insert_beside<K, V, C, F>(
    node: NodeRef<K, V>,
    hash: u32,
    shift: u32,
    op: &mut Modification<'_, K, V, C, F>,
) -> NodeRef<K, V>
where
    K: Clone,
    C: KeyConfig<K> + ?Sized,
    F: FnOnce(Option<&V>) -> Update<V>,
{
    match op.apply(None) {
        Update::Set(value) => {
            op.size += 1;
            let leaf = op.new_leaf(value, op.new_id());
            merge_leaves(op.edit, shift, hash, node, op.hash, leaf)
        }
        Update::Remove | Update::Keep => node,
    }
}

/// Joins two terminal nodes with different keys under a new subtree.
fn merge_leaves<K, V>(
    edit: Option<Edit>,
    shift: u32,
    first_hash: u32,
    first: NodeRef<K, V>,
    second_hash: u32,
    second: NodeRef<K, V>,
) -> NodeRef<K, V> {
    if first_hash == second_hash {
        return ReferenceCounter::new(Node::Collision {
            edit,
            hash: first_hash,
            children: vec![first, second],
        });
    }
    let first_fragment = hash_fragment(shift, first_hash);
    let second_fragment = hash_fragment(shift, second_hash);
    let children = if first_fragment == second_fragment {
        vec![merge_leaves(
            edit,
            shift + BITS_PER_LEVEL,
            first_hash,
            first,
            second_hash,
            second,
        )]
    } else if first_fragment < second_fragment {
        vec![first, second]
    } else {
        vec![second, first]
    };
    ReferenceCounter::new(Node::Indexed {
        edit,
        bitmap: to_bitmap(first_fragment) | to_bitmap(second_fragment),
        children,
    })
}

/// Stores the modified member of a group, dropping it if it became empty.
/// A group left with one member is replaced by that member.
fn replace_member<K: Clone, V: Clone>(
    node: NodeRef<K, V>,
    edit: Option<Edit>,
    index: usize,
    child: NodeRef<K, V>,
) -> NodeRef<K, V> {
    if !child.is_empty() {
        return replace_child(node, edit, index, child);
    }
    if node.children().len() == 2 {
        return node.children()[index ^ 1].clone();
    }
    rewrite_children(node, edit, Header::Keep, |children| {
        array_splice_out(children, index)
    })
}

fn modify_collision<K, V, C, F>(
    mut node: NodeRef<K, V>,
    shift: u32,
    op: &mut Modification<'_, K, V, C, F>,
) -> NodeRef<K, V>
where
    K: Clone,
    V: Clone,
    C: KeyConfig<K> + ?Sized,
    F: FnOnce(Option<&V>) -> Update<V>,
{
    let Node::Collision { hash, children, .. } = &*node else {
        return node;
    };
    let hash = *hash;
    if hash != op.hash {
        return insert_beside(node, hash, shift, op);
    }
    let len = children.len();
    let position = children.iter().position(|child| {
        child
            .terminal_key()
            .is_some_and(|key| op.config.key_eq(key, op.key))
    });
    let Some(index) = position else {
        return match op.apply(None) {
            Update::Set(value) => {
                op.size += 1;
                let leaf = op.new_leaf(value, op.new_id());
                rewrite_children(node, op.edit, Header::Keep, |children| {
                    array_splice_in(children, len, leaf)
                })
            }
            Update::Remove | Update::Keep => node,
        };
    };
    let edit = op.edit;
    let empty = op.empty.clone();
    match descend(&mut node, edit, &empty, index, |child| modify(child, shift, op)) {
        Some(child) => replace_member(node, edit, index, child),
        None => node,
    }
}

fn modify_indexed<K, V, C, F>(
    mut node: NodeRef<K, V>,
    shift: u32,
    op: &mut Modification<'_, K, V, C, F>,
) -> NodeRef<K, V>
where
    K: Clone,
    V: Clone,
    C: KeyConfig<K> + ?Sized,
    F: FnOnce(Option<&V>) -> Update<V>,
{
    let Node::Indexed {
        bitmap, children, ..
    } = &*node
    else {
        return node;
    };
    let bitmap = *bitmap;
    let len = children.len();
    let fragment = hash_fragment(shift, op.hash);
    let bit = to_bitmap(fragment);
    let index = from_bitmap(bitmap, bit);
    let edit = op.edit;
    let empty = op.empty.clone();

    if bitmap & bit == 0 {
        let child = modify(empty.clone(), shift + BITS_PER_LEVEL, op);
        if child.is_empty() {
            return node;
        }
        if len >= MAX_INDEX_NODE {
            return expand(edit, fragment, child, bitmap, node.children(), &empty);
        }
        return rewrite_children(node, edit, Header::Bitmap(bitmap | bit), |children| {
            array_splice_in(children, index, child)
        });
    }

    let Some(child) = descend(&mut node, edit, &empty, index, |child| {
        modify(child, shift + BITS_PER_LEVEL, op)
    }) else {
        return node;
    };
    if !child.is_empty() {
        return replace_child(node, edit, index, child);
    }
    let remaining = bitmap & !bit;
    if remaining == 0 {
        return empty;
    }
    if len == 2 && node.children()[index ^ 1].is_leaf_like() {
        return node.children()[index ^ 1].clone();
    }
    rewrite_children(node, edit, Header::Bitmap(remaining), |children| {
        array_splice_out(children, index)
    })
}

fn modify_array<K, V, C, F>(
    mut node: NodeRef<K, V>,
    shift: u32,
    op: &mut Modification<'_, K, V, C, F>,
) -> NodeRef<K, V>
where
    K: Clone,
    V: Clone,
    C: KeyConfig<K> + ?Sized,
    F: FnOnce(Option<&V>) -> Update<V>,
{
    let Node::Array { size, children, .. } = &*node else {
        return node;
    };
    let size = *size;
    let fragment = hash_fragment(shift, op.hash) as usize;
    let was_empty = children[fragment].is_empty();
    let edit = op.edit;
    let empty = op.empty.clone();

    let Some(child) = descend(&mut node, edit, &empty, fragment, |child| {
        modify(child, shift + BITS_PER_LEVEL, op)
    }) else {
        return node;
    };
    let header = match (was_empty, child.is_empty()) {
        (true, false) => Header::Size(size + 1),
        (false, true) if size - 1 <= MIN_ARRAY_NODE => {
            return pack(edit, fragment, node.children());
        }
        (false, true) => Header::Size(size - 1),
        _ => Header::Keep,
    };
    rewrite_children(node, edit, header, |children| {
        array_update(children, fragment, child)
    })
}

fn modify_multi<K, V, C, F>(
    mut node: NodeRef<K, V>,
    shift: u32,
    op: &mut Modification<'_, K, V, C, F>,
) -> NodeRef<K, V>
where
    K: Clone,
    V: Clone,
    C: KeyConfig<K> + ?Sized,
    F: FnOnce(Option<&V>) -> Update<V>,
{
    let Node::Multi {
        hash, key, children, ..
    } = &*node
    else {
        return node;
    };
    if !op.matches(*hash, key) {
        let hash = *hash;
        return insert_beside(node, hash, shift, op);
    }
    let len = children.len();
    if let Some(id) = op.push {
        return match op.apply(None) {
            Update::Set(value) => {
                op.size += 1;
                let member = op.new_leaf(value, id);
                rewrite_children(node, op.edit, Header::Keep, |children| {
                    array_splice_in(children, len, member)
                })
            }
            Update::Remove | Update::Keep => node,
        };
    }
    let target = match op.member {
        Some(id) => children
            .iter()
            .position(|child| child.leaf().is_some_and(|leaf| leaf.id == id)),
        None => len.checked_sub(1),
    };
    let Some(index) = target else {
        return node;
    };
    let edit = op.edit;
    let empty = op.empty.clone();
    match descend(&mut node, edit, &empty, index, |child| modify(child, shift, op)) {
        Some(child) => replace_member(node, edit, index, child),
        None => node,
    }
}

/// Turns an indexed node that is about to gain its seventeenth child into an
/// array node.
fn expand<K, V>(
    edit: Option<Edit>,
    fragment: u32,
    child: NodeRef<K, V>,
    bitmap: u32,
    children: &[NodeRef<K, V>],
    empty: &NodeRef<K, V>,
) -> NodeRef<K, V> {
    let mut slots = vec![empty.clone(); BUCKET_SIZE];
    let mut count = 0;
    for (slot_fragment, slot) in (0u32..).zip(slots.iter_mut()) {
        if bitmap & to_bitmap(slot_fragment) != 0 {
            *slot = children[count].clone();
            count += 1;
        }
    }
    slots[fragment as usize] = child;
    trace_event!(children = count + 1, "expanded indexed node into array node");
    ReferenceCounter::new(Node::Array {
        edit,
        size: count + 1,
        children: slots,
    })
}

/// Turns an array node into an indexed node, leaving out slot `removed`.
fn pack<K, V>(edit: Option<Edit>, removed: usize, elements: &[NodeRef<K, V>]) -> NodeRef<K, V> {
    let mut bitmap = 0;
    let mut children = Vec::with_capacity(MIN_ARRAY_NODE);
    for (slot_fragment, (slot, element)) in (0u32..).zip(elements.iter().enumerate()) {
        if slot != removed && !element.is_empty() {
            children.push(element.clone());
            bitmap |= to_bitmap(slot_fragment);
        }
    }
    trace_event!(children = children.len(), "packed array node into indexed node");
    ReferenceCounter::new(Node::Indexed {
        edit,
        bitmap,
        children,
    })
}

// =============================================================================
// Structural checks (tests only)
// =============================================================================

/// Checks the structural invariants of a subtree and returns its entry count.
#[cfg(test)]
pub(crate) fn validate<K, V>(node: &Node<K, V>) -> usize {
    match node {
        Node::Empty => 0,
        Node::Leaf(_) => 1,
        Node::Collision { hash, children, .. } => {
            assert!(children.len() >= 2, "collision node with a single member");
            children
                .iter()
                .map(|child| {
                    assert!(matches!(child.kind(), Kind::Leaf | Kind::Multi));
                    let child_hash = match &**child {
                        Node::Leaf(leaf) => leaf.hash,
                        Node::Multi { hash, .. } => *hash,
                        _ => unreachable!(),
                    };
                    assert_eq!(child_hash, *hash, "collision member with a foreign hash");
                    validate(child)
                })
                .sum()
        }
        Node::Indexed {
            bitmap, children, ..
        } => {
            assert_eq!(bitmap.count_ones() as usize, children.len());
            assert!(children.len() <= MAX_INDEX_NODE);
            children
                .iter()
                .map(|child| {
                    assert!(!child.is_empty(), "indexed node with an empty child");
                    validate(child)
                })
                .sum()
        }
        Node::Array { size, children, .. } => {
            assert_eq!(children.len(), BUCKET_SIZE);
            let live = children.iter().filter(|child| !child.is_empty()).count();
            assert_eq!(live, *size, "array node size out of sync");
            assert!(live > MIN_ARRAY_NODE, "array node should have been packed");
            children.iter().map(|child| validate(child)).sum()
        }
        Node::Multi { hash, children, .. } => {
            assert!(children.len() >= 2, "multimap group with a single member");
            let mut previous_id = None;
            for child in children {
                let Node::Leaf(leaf) = &**child else {
                    panic!("multimap group member is not a leaf");
                };
                assert_eq!(leaf.hash, *hash);
                assert!(previous_id < Some(leaf.id), "member ids out of order");
                previous_id = Some(leaf.id);
            }
            children.len()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
