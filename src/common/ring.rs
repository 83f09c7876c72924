//! Cyclic interval arithmetic over the identifier ring.
//!
//! All functions take canonical values, already reduced modulo the ring size,
//! so containment is decided by ordering alone.

use std::cmp::Ordering;

use crate::common::Id;

/// Returns `true` if `id` lies in the half open interval `[start, end)` walking
/// clockwise from `start`.
///
/// If `start < end` this is a contiguous range, if `start > end` the interval
/// wraps through zero. `start == end` is the interval of length zero and
/// contains nothing.
pub fn contains<T: Ord>(id: &T, start: &T, end: &T) -> bool {
    match start.cmp(end) {
        Ordering::Less => start <= id && id < end,
        Ordering::Greater => id >= start || id < end,
        Ordering::Equal => false,
    }
}

impl Id {
    /// Returns `true` if `self` lies in the open interval `(start, end)`.
    ///
    /// `(a, a)` is the whole ring except `a`.
    pub fn in_open(&self, start: &Id, end: &Id) -> bool {
        contains(self, &start.wrapping_add(&Id::ONE), end)
    }

    /// Returns `true` if `self` lies in `(start, end]`, the interval a node at
    /// `end` owns when its predecessor is `start`.
    ///
    /// `(a, a]` is the whole ring: a node that is its own predecessor owns
    /// every identifier.
    pub fn in_half_open_right(&self, start: &Id, end: &Id) -> bool {
        if start == end {
            return true;
        }

        contains(
            self,
            &start.wrapping_add(&Id::ONE),
            &end.wrapping_add(&Id::ONE),
        )
    }
}
