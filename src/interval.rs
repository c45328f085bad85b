//! Canonical interval sets over integer-like domains.
//!
//! An [`IntervalSet`] keeps a sorted list of closed, pairwise-disjoint
//! intervals in which no two neighbours are mergeable-adjacent. Every
//! operation preserves that canonical form, so two sets describing the same
//! collection of elements always compare equal. The element type only has to
//! provide a total order plus successor/predecessor, which lets the same
//! engine back both IP address ranges and peer index ranges.

use std::cmp::{max, min, Ordering};
use std::fmt;

/// An element of a domain an [`IntervalSet`] can range over.
///
/// `successor`/`predecessor` return `None` at a domain boundary. Domains
/// with disjoint sub-ranges (IP versions, index segments) return `None` at
/// each sub-range boundary, which keeps intervals from different sub-ranges
/// from ever being merged.
pub trait IntervalElement: Copy + Ord {
    /// The next element, or `None` at a domain boundary
    fn successor(&self) -> Option<Self>;
    /// The previous element, or `None` at a domain boundary
    fn predecessor(&self) -> Option<Self>;
}

macro_rules! impl_interval_element_for_uint {
    ($($t:ty),*) => {
        $(impl IntervalElement for $t {
            fn successor(&self) -> Option<Self> {
                self.checked_add(1)
            }
            fn predecessor(&self) -> Option<Self> {
                self.checked_sub(1)
            }
        })*
    };
}

impl_interval_element_for_uint!(u32, u64, u128);

/// A closed range `[start, end]`, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval<T> {
    pub start: T,
    pub end: T,
}

impl<T: IntervalElement> Interval<T> {
    pub fn new(start: T, end: T) -> Self {
        debug_assert!(start <= end, "interval start must not exceed end");
        Self { start, end }
    }

    /// Single-element interval
    pub fn point(elem: T) -> Self {
        Self::new(elem, elem)
    }

    pub fn contains(&self, elem: T) -> bool {
        self.start <= elem && elem <= self.end
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn is_subset_of(&self, other: &Self) -> bool {
        other.start <= self.start && self.end <= other.end
    }

    /// Overlapping or immediately adjacent (no element fits between them)
    pub fn touches(&self, other: &Self) -> bool {
        if self.overlaps(other) {
            return true;
        }
        if self.end < other.start {
            self.end.successor() == Some(other.start)
        } else {
            other.end.successor() == Some(self.start)
        }
    }
}

/// A canonical set of disjoint closed intervals
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntervalSet<T> {
    intervals: Vec<Interval<T>>,
}

impl<T> Default for IntervalSet<T> {
    fn default() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }
}

impl<T: IntervalElement> IntervalSet<T> {
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    pub fn from_interval(interval: Interval<T>) -> Self {
        Self {
            intervals: vec![interval],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of disjoint intervals in canonical form
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Ordered iteration over the disjoint intervals
    pub fn iter(&self) -> std::slice::Iter<'_, Interval<T>> {
        self.intervals.iter()
    }

    pub fn contains(&self, elem: T) -> bool {
        self.intervals
            .binary_search_by(|interval| {
                if interval.end < elem {
                    Ordering::Less
                } else if elem < interval.start {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Merge-insert an interval, absorbing every existing interval it
    /// overlaps or is adjacent to.
    pub fn add_interval(&mut self, interval: Interval<T>) {
        let mut out = Vec::with_capacity(self.intervals.len() + 1);
        let mut pending = Some(interval);
        for existing in self.intervals.drain(..) {
            match pending {
                Some(p) if p.touches(&existing) => {
                    pending = Some(Interval::new(
                        min(p.start, existing.start),
                        max(p.end, existing.end),
                    ));
                }
                Some(p) if p.end < existing.start => {
                    out.push(p);
                    pending = None;
                    out.push(existing);
                }
                _ => out.push(existing),
            }
        }
        if let Some(p) = pending {
            out.push(p);
        }
        self.intervals = out;
    }

    /// Remove a sub-range, splitting intervals that straddle the hole
    pub fn add_hole(&mut self, hole: Interval<T>) {
        let mut out = Vec::with_capacity(self.intervals.len() + 1);
        for existing in self.intervals.drain(..) {
            if !existing.overlaps(&hole) {
                out.push(existing);
                continue;
            }
            if existing.start < hole.start {
                if let Some(left_end) = hole.start.predecessor() {
                    out.push(Interval::new(existing.start, left_end));
                }
            }
            if hole.end < existing.end {
                if let Some(right_start) = hole.end.successor() {
                    out.push(Interval::new(right_start, existing.end));
                }
            }
        }
        self.intervals = out;
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut res = self.clone();
        for interval in &other.intervals {
            res.add_interval(*interval);
        }
        res
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let a = self.intervals[i];
            let b = other.intervals[j];
            let start = max(a.start, b.start);
            let end = min(a.end, b.end);
            if start <= end {
                out.push(Interval::new(start, end));
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { intervals: out }
    }

    pub fn difference(&self, other: &Self) -> Self {
        let mut res = self.clone();
        for interval in &other.intervals {
            res.add_hole(*interval);
        }
        res
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let a = self.intervals[i];
            let b = other.intervals[j];
            if a.overlaps(&b) {
                return true;
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// Whether every element of `self` is also in `other`. In canonical
    /// form each of our intervals must fit inside a single interval of
    /// `other`, so one forward scan suffices.
    pub fn contained_in(&self, other: &Self) -> bool {
        let mut j = 0;
        'next: for a in &self.intervals {
            while j < other.intervals.len() {
                let b = other.intervals[j];
                if a.is_subset_of(&b) {
                    continue 'next;
                }
                if b.end < a.start {
                    j += 1;
                } else {
                    return false;
                }
            }
            return false;
        }
        true
    }
}

impl<T: IntervalElement> std::ops::BitOr for &IntervalSet<T> {
    type Output = IntervalSet<T>;

    fn bitor(self, rhs: Self) -> IntervalSet<T> {
        self.union(rhs)
    }
}

impl<T: IntervalElement> std::ops::BitAnd for &IntervalSet<T> {
    type Output = IntervalSet<T>;

    fn bitand(self, rhs: Self) -> IntervalSet<T> {
        self.intersection(rhs)
    }
}

impl<T: IntervalElement> std::ops::Sub for &IntervalSet<T> {
    type Output = IntervalSet<T>;

    fn sub(self, rhs: Self) -> IntervalSet<T> {
        self.difference(rhs)
    }
}

impl<'a, T> IntoIterator for &'a IntervalSet<T> {
    type Item = &'a Interval<T>;
    type IntoIter = std::slice::Iter<'a, Interval<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

impl<T: IntervalElement + fmt::Display> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl<T: IntervalElement + fmt::Display> fmt::Display for IntervalSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.is_empty() {
            return write!(f, "Empty");
        }
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", interval)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ranges: &[(u32, u32)]) -> IntervalSet<u32> {
        let mut res = IntervalSet::new();
        for &(start, end) in ranges {
            res.add_interval(Interval::new(start, end));
        }
        res
    }

    fn assert_canonical(s: &IntervalSet<u32>) {
        let intervals: Vec<_> = s.iter().copied().collect();
        for w in intervals.windows(2) {
            assert!(w[0].end < w[1].start, "intervals out of order or overlapping");
            assert_ne!(
                w[0].end.successor(),
                Some(w[1].start),
                "adjacent intervals left unmerged"
            );
        }
    }

    #[test]
    fn test_add_interval_merges_overlap() {
        let s = set(&[(1, 5), (3, 10)]);
        assert_eq!(s.len(), 1);
        assert_eq!(s, set(&[(1, 10)]));
    }

    #[test]
    fn test_add_interval_merges_adjacency() {
        // 5 and 6 touch, so a single interval must result
        let s = set(&[(1, 5), (6, 10)]);
        assert_eq!(s.len(), 1);
        assert!(s.contains(5));
        assert!(s.contains(6));
        assert_canonical(&s);
    }

    #[test]
    fn test_add_interval_keeps_gaps() {
        let s = set(&[(1, 5), (7, 10)]);
        assert_eq!(s.len(), 2);
        assert!(!s.contains(6));
        assert_canonical(&s);
    }

    #[test]
    fn test_add_interval_absorbs_several() {
        let s = set(&[(1, 2), (4, 5), (8, 9), (3, 8)]);
        assert_eq!(s, set(&[(1, 9)]));
        assert_canonical(&s);
    }

    #[test]
    fn test_add_hole_splits() {
        let mut s = set(&[(1, 10)]);
        s.add_hole(Interval::new(4, 6));
        assert_eq!(s, set(&[(1, 3), (7, 10)]));
        assert_canonical(&s);
    }

    #[test]
    fn test_add_hole_at_edges() {
        let mut s = set(&[(1, 10)]);
        s.add_hole(Interval::new(1, 3));
        s.add_hole(Interval::new(9, 10));
        assert_eq!(s, set(&[(4, 8)]));
    }

    #[test]
    fn test_add_hole_removes_whole_intervals() {
        let mut s = set(&[(1, 3), (5, 7), (9, 11)]);
        s.add_hole(Interval::new(2, 10));
        assert_eq!(s, set(&[(1, 1), (11, 11)]));
    }

    #[test]
    fn test_canonical_after_mixed_mutations() {
        let mut s = IntervalSet::new();
        s.add_interval(Interval::new(10u32, 20));
        s.add_hole(Interval::new(12, 14));
        s.add_interval(Interval::new(13, 13));
        s.add_interval(Interval::new(0, 9));
        assert_canonical(&s);
        assert!(s.contains(13));
        assert!(!s.contains(12));
        // 0-9 must have merged with 10-...
        assert!(s.iter().next().is_some_and(|iv| iv.start == 0 && iv.end == 11));
    }

    #[test]
    fn test_algebra_laws() {
        let a = set(&[(1, 10), (20, 30)]);
        let b = set(&[(5, 25)]);
        let c = set(&[(8, 40), (50, 60)]);

        assert_eq!(a.union(&b), b.union(&a));
        assert_eq!(a.intersection(&b), b.intersection(&a));
        assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
        assert_eq!(
            a.intersection(&b).intersection(&c),
            a.intersection(&b.intersection(&c))
        );
        // A & B == A - (A - B)
        assert_eq!(a.intersection(&b), a.difference(&a.difference(&b)));
        // A is always contained in A | B
        assert!(a.contained_in(&a.union(&b)));
    }

    #[test]
    fn test_operators_match_methods() {
        let a = set(&[(1, 10)]);
        let b = set(&[(5, 15)]);
        assert_eq!(&a | &b, a.union(&b));
        assert_eq!(&a & &b, a.intersection(&b));
        assert_eq!(&a - &b, a.difference(&b));
    }

    #[test]
    fn test_containment_and_overlap() {
        let a = set(&[(5, 8)]);
        let b = set(&[(1, 10), (20, 30)]);
        assert!(a.contained_in(&b));
        assert!(!b.contained_in(&a));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&set(&[(9, 12)])));
        assert!(set(&[]).contained_in(&a));
    }

    #[test]
    fn test_domain_boundary_never_merges() {
        // u32::MAX has no successor; inserting around it must not panic and
        // the two intervals below stay mergeable only through real adjacency
        let mut s = IntervalSet::new();
        s.add_interval(Interval::new(u32::MAX - 1, u32::MAX));
        s.add_interval(Interval::new(0u32, 5));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_display() {
        let s = set(&[(1, 1), (3, 7)]);
        assert_eq!(s.to_string(), "1, 3-7");
        assert_eq!(IntervalSet::<u32>::new().to_string(), "Empty");
    }
}
