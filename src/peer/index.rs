//! The peer index domain: one linear axis for symbolic reasoning.
//!
//! Symbolic collaborators need every peer — concrete endpoint or address
//! range — projected onto a single ordered axis. The axis is partitioned
//! into three fixed segments: the IPv4 space, the IPv6 space, and the
//! concrete-endpoint positions. Segment bounds are fixed at compile time
//! from the address-space sizes; successors stop at each segment's top, so
//! intervals from different segments can never be merged into one.

use std::fmt;

use crate::interval::{Interval, IntervalElement, IntervalSet};

/// Upper bound on concrete endpoints in a peer set, and the width of the
/// endpoint index segment
pub const MAX_ENDPOINT_COUNT: usize = 10_000;

/// A point on the peer index axis. Ordered by (segment, offset):
/// every IPv4 index < every IPv6 index < every endpoint index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeerIndex {
    /// An IPv4 address by value
    V4(u32),
    /// An IPv6 address by value
    V6(u128),
    /// A position in the sorted concrete-endpoint list
    Endpoint(u32),
}

impl IntervalElement for PeerIndex {
    fn successor(&self) -> Option<Self> {
        match *self {
            Self::V4(v) => v.checked_add(1).map(Self::V4),
            Self::V6(v) => v.checked_add(1).map(Self::V6),
            Self::Endpoint(v) => {
                let next = v.checked_add(1)?;
                ((next as usize) < MAX_ENDPOINT_COUNT).then_some(Self::Endpoint(next))
            }
        }
    }

    fn predecessor(&self) -> Option<Self> {
        match *self {
            Self::V4(v) => v.checked_sub(1).map(Self::V4),
            Self::V6(v) => v.checked_sub(1).map(Self::V6),
            Self::Endpoint(v) => v.checked_sub(1).map(Self::Endpoint),
        }
    }
}

impl fmt::Display for PeerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(v) => write!(f, "ip4:{}", v),
            Self::V6(v) => write!(f, "ip6:{}", v),
            Self::Endpoint(v) => write!(f, "ep:{}", v),
        }
    }
}

/// The full bounds of all three index segments as one interval domain
pub fn all_peers_and_ip_blocks_interval() -> IntervalSet<PeerIndex> {
    let mut res = IntervalSet::new();
    res.add_interval(Interval::new(PeerIndex::V4(0), PeerIndex::V4(u32::MAX)));
    res.add_interval(Interval::new(PeerIndex::V6(0), PeerIndex::V6(u128::MAX)));
    res.add_interval(Interval::new(
        PeerIndex::Endpoint(0),
        PeerIndex::Endpoint(MAX_ENDPOINT_COUNT as u32 - 1),
    ));
    res
}
