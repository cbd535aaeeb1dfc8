//! Key hashing and equality configuration.
//!
//! A map hashes and compares keys through a [`KeyConfig`]. The configuration
//! is fixed when the map is created and shared by every snapshot and
//! transient derived from it.
//!
//! # Hash stability
//!
//! A configuration must return the same hash for the same key for as long
//! as any derived map is alive, and keys that compare equal must hash
//! equally. Violations are not detected: lookups and order links silently
//! stop finding entries.

use std::fmt;
use std::hash::Hash;

use super::bits;

/// Hashing and equality for map keys.
///
/// # Examples
///
/// ```rust
/// use ordered_hamt::persistent::{KeyConfig, OrderedHashMap};
///
/// /// Case-insensitive ASCII keys.
/// #[derive(Clone, Copy, Default)]
/// struct IgnoreCase;
///
/// impl KeyConfig<String> for IgnoreCase {
///     fn hash(&self, key: &String) -> u32 {
///         ordered_hamt::persistent::bits::hash(&key.to_ascii_lowercase())
///     }
///
///     fn key_eq(&self, left: &String, right: &String) -> bool {
///         left.eq_ignore_ascii_case(right)
///     }
/// }
///
/// let map = OrderedHashMap::with_config(IgnoreCase).insert("Key".to_string(), 1);
/// assert_eq!(map.get(&"KEY".to_string()), Some(&1));
/// ```
pub trait KeyConfig<K: ?Sized> {
    /// Returns the 32-bit hash of `key`.
    fn hash(&self, key: &K) -> u32;

    /// Returns `true` if both keys denote the same entry.
    fn key_eq(&self, left: &K, right: &K) -> bool;
}

/// Hashes keys with [`bits::hash`] and compares them with `Eq`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultKeyConfig;

impl<K: Hash + Eq + ?Sized> KeyConfig<K> for DefaultKeyConfig {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        bits::hash(key)
    }

    #[inline]
    fn key_eq(&self, left: &K, right: &K) -> bool {
        left == right
    }
}

/// Hashes string keys with [`bits::string_hash`] and compares them with `Eq`.
///
/// # Examples
///
/// ```rust
/// use ordered_hamt::persistent::{OrderedHashMap, StringKeyConfig};
///
/// // "Aa" and "BB" share a content hash and end up in one collision node
/// let map = OrderedHashMap::with_config(StringKeyConfig)
///     .insert("Aa", 1)
///     .insert("BB", 2);
/// assert_eq!(map.get(&"Aa"), Some(&1));
/// assert_eq!(map.get(&"BB"), Some(&2));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringKeyConfig;

impl<K: AsRef<str> + Eq + ?Sized> KeyConfig<K> for StringKeyConfig {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        bits::string_hash(key.as_ref())
    }

    #[inline]
    fn key_eq(&self, left: &K, right: &K) -> bool {
        left == right
    }
}

/// A caller-supplied hash function with `Eq` key comparison.
///
/// # Examples
///
/// ```rust
/// use ordered_hamt::persistent::{CustomHash, OrderedHashMap};
///
/// // Numeric keys hashed to themselves
/// let map = OrderedHashMap::with_config(CustomHash::new(|key: &u32| *key))
///     .insert(7, "seven");
/// assert_eq!(map.get(&7), Some(&"seven"));
/// ```
#[derive(Clone, Copy)]
pub struct CustomHash<H> {
    hash: H,
}

impl<H> CustomHash<H> {
    /// Wraps a hash function.
    #[must_use]
    pub const fn new(hash: H) -> Self {
        Self { hash }
    }
}

impl<K: Eq + ?Sized, H: Fn(&K) -> u32> KeyConfig<K> for CustomHash<H> {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        (self.hash)(key)
    }

    #[inline]
    fn key_eq(&self, left: &K, right: &K) -> bool {
        left == right
    }
}

impl<H> fmt::Debug for CustomHash<H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("CustomHash").finish_non_exhaustive()
    }
}

/// Caller-supplied hash and equality functions.
#[derive(Clone, Copy)]
pub struct FnKeyConfig<H, E> {
    hash: H,
    key_eq: E,
}

impl<H, E> FnKeyConfig<H, E> {
    /// Wraps a hash function and a key equality predicate.
    #[must_use]
    pub const fn new(hash: H, key_eq: E) -> Self {
        Self { hash, key_eq }
    }
}

impl<K: ?Sized, H, E> KeyConfig<K> for FnKeyConfig<H, E>
where
    H: Fn(&K) -> u32,
    E: Fn(&K, &K) -> bool,
{
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        (self.hash)(key)
    }

    #[inline]
    fn key_eq(&self, left: &K, right: &K) -> bool {
        (self.key_eq)(left, right)
    }
}

impl<H, E> fmt::Debug for FnKeyConfig<H, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("FnKeyConfig").finish_non_exhaustive()
    }
}
