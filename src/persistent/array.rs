//! Copy-on-write array edits.
//!
//! Every change to a node's child array goes through one of these three
//! functions. The `Cow` variant decides between editing in place
//! (`Cow::Owned`, the node belongs to the current transient epoch) and
//! producing a fresh array while the original stays shared
//! (`Cow::Borrowed`).

use std::borrow::Cow;

/// Replaces the element at `index`.
pub(crate) fn array_update<T: Clone>(array: Cow<'_, [T]>, index: usize, value: T) -> Vec<T> {
    match array {
        Cow::Owned(mut out) => {
            out[index] = value;
            out
        }
        Cow::Borrowed(slice) => {
            let mut out = Vec::with_capacity(slice.len());
            out.extend_from_slice(&slice[..index]);
            out.push(value);
            out.extend_from_slice(&slice[index + 1..]);
            out
        }
    }
}

/// Inserts `value` at `index`, shifting later elements right.
pub(crate) fn array_splice_in<T: Clone>(array: Cow<'_, [T]>, index: usize, value: T) -> Vec<T> {
    match array {
        Cow::Owned(mut out) => {
            out.insert(index, value);
            out
        }
        Cow::Borrowed(slice) => {
            let mut out = Vec::with_capacity(slice.len() + 1);
            out.extend_from_slice(&slice[..index]);
            out.push(value);
            out.extend_from_slice(&slice[index..]);
            out
        }
    }
}

/// Removes the element at `index`, shifting later elements left.
pub(crate) fn array_splice_out<T: Clone>(array: Cow<'_, [T]>, index: usize) -> Vec<T> {
    match array {
        Cow::Owned(mut out) => {
            out.remove(index);
            out
        }
        Cow::Borrowed(slice) => {
            let mut out = Vec::with_capacity(slice.len() - 1);
            out.extend_from_slice(&slice[..index]);
            out.extend_from_slice(&slice[index + 1..]);
            out
        }
    }
}
