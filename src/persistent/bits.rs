//! Hash and bitmap utilities for the trie.
//!
//! The trie consumes a 32-bit hash five bits at a time: the fragment at
//! `shift` selects one of 32 slots in a node. Sparse nodes record occupied
//! slots in a 32-bit bitmap and store children densely, so a slot's position
//! in the child array is the number of occupied slots below it.

use std::hash::{BuildHasher, Hash};

// =============================================================================
// Constants
// =============================================================================

/// Bits of hash consumed per trie level.
pub const BITS_PER_LEVEL: u32 = 5;

/// Branching factor (2^5 = 32).
pub const BUCKET_SIZE: usize = 1 << BITS_PER_LEVEL;

/// Mask for extracting a fragment.
const MASK: u32 = (BUCKET_SIZE - 1) as u32;

/// An indexed node holding this many children expands into an array node
/// when another child is added.
pub const MAX_INDEX_NODE: usize = BUCKET_SIZE / 2;

/// An array node whose live children drop to this count packs back into an
/// indexed node.
pub const MIN_ARRAY_NODE: usize = BUCKET_SIZE / 4;

// =============================================================================
// Hashing
// =============================================================================

#[cfg(feature = "fxhash")]
fn build_hasher() -> impl BuildHasher {
    rustc_hash::FxBuildHasher
}

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
fn build_hasher() -> impl BuildHasher {
    ahash::RandomState::with_seeds(
        0x243F_6A88_85A3_08D3,
        0x1319_8A2E_0370_7344,
        0xA409_3822_299F_31D0,
        0x082E_FA98_EC4E_6C89,
    )
}

#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
fn build_hasher() -> impl BuildHasher {
    std::hash::BuildHasherDefault::<std::collections::hash_map::DefaultHasher>::default()
}

/// Computes the 32-bit hash of a key.
///
/// The 64-bit hasher output is folded in half so every input bit influences
/// the fragments. The result is deterministic for the lifetime of the
/// process, which is what every snapshot derived from one map relies on.
///
/// # Examples
///
/// ```rust
/// use ordered_hamt::persistent::bits::hash;
///
/// assert_eq!(hash("key"), hash("key"));
/// ```
#[must_use]
pub fn hash<K: Hash + ?Sized>(key: &K) -> u32 {
    let wide = build_hasher().hash_one(key);
    #[allow(clippy::cast_possible_truncation)]
    let folded = (wide ^ (wide >> 32)) as u32;
    folded
}

/// Content hash of a string: `h = h * 31 + unit` over its UTF-16 code units,
/// with wrapping arithmetic.
///
/// Distinct strings collide under this hash often enough to be useful for
/// exercising collision nodes, e.g. `"Aa"` and `"BB"`.
///
/// # Examples
///
/// ```rust
/// use ordered_hamt::persistent::bits::string_hash;
///
/// assert_eq!(string_hash(""), 0);
/// assert_eq!(string_hash("Aa"), string_hash("BB"));
/// ```
#[must_use]
pub fn string_hash(value: &str) -> u32 {
    value.encode_utf16().fold(0u32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(u32::from(unit))
    })
}

// =============================================================================
// Bit Operations
// =============================================================================

/// Hamming weight of a bitmap.
#[inline]
#[must_use]
pub const fn popcount(bitmap: u32) -> u32 {
    bitmap.count_ones()
}

/// Extracts the 5-bit fragment of `hash` starting at bit `shift`.
///
/// Shifts past the width of the hash yield fragment 0.
#[inline]
#[must_use]
pub const fn hash_fragment(shift: u32, hash: u32) -> u32 {
    match hash.checked_shr(shift) {
        Some(shifted) => shifted & MASK,
        None => 0,
    }
}

/// Returns the single-bit flag for a fragment.
#[inline]
#[must_use]
pub const fn to_bitmap(fragment: u32) -> u32 {
    1 << fragment
}

/// Returns the compacted array position of `bit` within `bitmap`.
#[inline]
#[must_use]
pub const fn from_bitmap(bitmap: u32, bit: u32) -> usize {
    popcount(bitmap & (bit - 1)) as usize
}

// =============================================================================
// Tests
// =============================================================================
