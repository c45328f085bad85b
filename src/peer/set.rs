//! Peer sets: boolean algebra over mixed endpoints and address ranges.
//!
//! A [`PeerSet`] holds concrete endpoints and IpBlocks side by side. The
//! algebra treats them separately: concrete members combine with plain set
//! operations while all IpBlock members are first merged into one canonical
//! block, combined through the interval engine, and re-split into one peer
//! per resulting range. The set also carries the index bridge that projects
//! its members onto the [`PeerIndex`] axis and back.

use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{ModelError, Result};
use crate::interval::{Interval, IntervalSet};
use crate::ip::{IpBlock, NetworkAddress};
use crate::peer::index::{PeerIndex, MAX_ENDPOINT_COUNT};
use crate::peer::{Endpoint, Peer, PeerCapability};

/// A set of peers, unique by content identity.
///
/// The sorted concrete-endpoint ordering used by the index bridge is cached
/// and keyed by a version counter bumped on every mutation, so a mutation
/// that leaves the cardinality unchanged still invalidates it.
#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    peers: HashSet<Peer>,
    endpoint_count: usize,
    version: u64,
    sorted_endpoints: Vec<Endpoint>,
    sorted_built_at: u64,
}

impl PeerSet {
    pub fn new() -> Self {
        Self {
            version: 1,
            ..Self::default()
        }
    }

    /// Build from peers, enforcing the concrete-endpoint bound
    pub fn from_peers(peers: impl IntoIterator<Item = Peer>) -> Result<Self> {
        let mut res = Self::new();
        for peer in peers {
            res.insert(peer)?;
        }
        Ok(res)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    /// The concrete (non-IpBlock) members
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.peers.iter().filter_map(Peer::as_endpoint)
    }

    fn ip_blocks(&self) -> impl Iterator<Item = &IpBlock> {
        self.peers.iter().filter_map(Peer::as_ip_block)
    }

    fn endpoint_refs(&self) -> HashSet<&Endpoint> {
        self.endpoints().collect()
    }

    /// Add a peer. Fails with a capacity error when it would push the
    /// concrete-endpoint count past [`MAX_ENDPOINT_COUNT`]; IpBlock
    /// members are unbounded.
    pub fn insert(&mut self, peer: Peer) -> Result<bool> {
        if peer.as_endpoint().is_some()
            && !self.peers.contains(&peer)
            && self.endpoint_count >= MAX_ENDPOINT_COUNT
        {
            return Err(ModelError::Capacity {
                limit: MAX_ENDPOINT_COUNT,
            });
        }
        Ok(self.insert_unchecked(peer))
    }

    // Used for algebra results, whose endpoints all come from operands that
    // already satisfied the bound.
    fn insert_unchecked(&mut self, peer: Peer) -> bool {
        let is_endpoint = peer.as_endpoint().is_some();
        let added = self.peers.insert(peer);
        if added {
            if is_endpoint {
                self.endpoint_count += 1;
            }
            self.version += 1;
        }
        added
    }

    pub fn remove(&mut self, peer: &Peer) -> bool {
        let removed = self.peers.remove(peer);
        if removed {
            if peer.as_endpoint().is_some() {
                self.endpoint_count -= 1;
            }
            self.version += 1;
        }
        removed
    }

    /// Membership test. An IpBlock argument is a member when it is
    /// contained in any member IpBlock, not only when present verbatim.
    pub fn contains(&self, peer: &Peer) -> bool {
        match peer {
            Peer::IpBlock(block) => self.ip_blocks().any(|member| block.contained_in(member)),
            Peer::Endpoint(_) => self.peers.contains(peer),
        }
    }

    /// A display name for some member, empty set giving `None`
    pub fn representative(&self) -> Option<String> {
        self.peers.iter().next().map(Peer::to_string)
    }

    /// Full names of the concrete members
    pub fn get_peer_names_list(&self) -> Vec<String> {
        self.endpoints().map(Endpoint::full_name).collect()
    }

    /// All members that are not IpBlocks, as a new set
    pub fn get_set_without_ip_block(&self) -> PeerSet {
        let mut res = PeerSet::new();
        for ep in self.endpoints() {
            res.insert_unchecked(Peer::Endpoint(ep.clone()));
        }
        res
    }

    /// All IpBlock members merged into one canonical block
    pub fn get_ip_block_canonical_form(&self) -> IpBlock {
        let mut res = IpBlock::new();
        for block in self.ip_blocks() {
            res.merge(block);
        }
        res
    }

    fn assemble(endpoints: Vec<&Endpoint>, merged_blocks: IpBlock) -> PeerSet {
        let mut res = PeerSet::new();
        for ep in endpoints {
            res.insert_unchecked(Peer::Endpoint(ep.clone()));
        }
        for block in merged_blocks.split() {
            res.insert_unchecked(Peer::IpBlock(block));
        }
        debug_assert!(res.endpoint_count <= MAX_ENDPOINT_COUNT);
        res
    }

    pub fn union(&self, other: &Self) -> PeerSet {
        let endpoints = self
            .endpoint_refs()
            .union(&other.endpoint_refs())
            .copied()
            .collect();
        let blocks = self
            .get_ip_block_canonical_form()
            .union(&other.get_ip_block_canonical_form());
        Self::assemble(endpoints, blocks)
    }

    pub fn intersection(&self, other: &Self) -> PeerSet {
        let endpoints = self
            .endpoint_refs()
            .intersection(&other.endpoint_refs())
            .copied()
            .collect();
        let blocks = self
            .get_ip_block_canonical_form()
            .intersection(&other.get_ip_block_canonical_form());
        Self::assemble(endpoints, blocks)
    }

    pub fn difference(&self, other: &Self) -> PeerSet {
        let endpoints = self
            .endpoint_refs()
            .difference(&other.endpoint_refs())
            .copied()
            .collect();
        let blocks = self
            .get_ip_block_canonical_form()
            .difference(&other.get_ip_block_canonical_form());
        Self::assemble(endpoints, blocks)
    }

    /// Restrict every IpBlock member to its intersection with `mask`,
    /// dropping members that do not overlap it at all
    pub fn filter_ipv6_blocks(&mut self, mask: &IpBlock) {
        let peers = std::mem::take(&mut self.peers);
        let mut out = HashSet::with_capacity(peers.len());
        for peer in peers {
            match peer {
                Peer::IpBlock(mut block) => {
                    if block.overlaps(mask) {
                        block.restrict_to(mask);
                        out.insert(Peer::IpBlock(block));
                    }
                }
                endpoint => {
                    out.insert(endpoint);
                }
            }
        }
        self.peers = out;
        self.version += 1;
    }

    fn refresh_sorted_endpoints(&mut self) {
        if self.sorted_built_at == self.version {
            return;
        }
        let mut sorted: Vec<Endpoint> = self.endpoints().cloned().collect();
        sorted.sort_by_key(Endpoint::full_name);
        self.sorted_endpoints = sorted;
        self.sorted_built_at = self.version;
    }

    /// Project a subset of this set onto the peer index axis: each concrete
    /// member becomes a single-point interval at its position in this set's
    /// sorted ordering, each IpBlock range lands in its version's segment.
    pub fn get_peer_interval_of(&mut self, subset: &PeerSet) -> IntervalSet<PeerIndex> {
        self.refresh_sorted_endpoints();
        let mut res = IntervalSet::new();
        let subset_endpoints = subset.endpoint_refs();
        for (position, ep) in self.sorted_endpoints.iter().enumerate() {
            if subset_endpoints.contains(ep) {
                res.add_interval(Interval::point(PeerIndex::Endpoint(position as u32)));
            }
        }
        for block in subset.ip_blocks() {
            for range in block.ranges() {
                match (range.start, range.end) {
                    (NetworkAddress::V4(start), NetworkAddress::V4(end)) => {
                        res.add_interval(Interval::new(
                            PeerIndex::V4(start.into()),
                            PeerIndex::V4(end.into()),
                        ));
                    }
                    (NetworkAddress::V6(start), NetworkAddress::V6(end)) => {
                        res.add_interval(Interval::new(
                            PeerIndex::V6(start.into()),
                            PeerIndex::V6(end.into()),
                        ));
                    }
                    _ => debug_assert!(false, "range spans IP versions"),
                }
            }
        }
        res
    }

    /// The exact inverse of [`PeerSet::get_peer_interval_of`]: address
    /// segments become IpBlocks, endpoint positions are clipped to the
    /// current ordering and resolved back to concrete peers.
    pub fn get_peer_set_by_indices(
        &mut self,
        intervals: &IntervalSet<PeerIndex>,
    ) -> Result<PeerSet> {
        self.refresh_sorted_endpoints();
        let mut res = PeerSet::new();
        for interval in intervals {
            match (interval.start, interval.end) {
                (PeerIndex::V4(start), PeerIndex::V4(end)) => {
                    res.insert_unchecked(Peer::IpBlock(IpBlock::from_range(
                        Ipv4Addr::from(start).into(),
                        Ipv4Addr::from(end).into(),
                    )));
                }
                (PeerIndex::V6(start), PeerIndex::V6(end)) => {
                    res.insert_unchecked(Peer::IpBlock(IpBlock::from_range(
                        Ipv6Addr::from(start).into(),
                        Ipv6Addr::from(end).into(),
                    )));
                }
                (PeerIndex::Endpoint(start), PeerIndex::Endpoint(end)) => {
                    if end as usize >= MAX_ENDPOINT_COUNT {
                        return Err(ModelError::IndexRange {
                            interval: interval.to_string(),
                        });
                    }
                    if self.sorted_endpoints.is_empty() {
                        continue;
                    }
                    let top = self.sorted_endpoints.len() - 1;
                    for position in (start as usize).min(top)..=(end as usize).min(top) {
                        res.insert(Peer::Endpoint(self.sorted_endpoints[position].clone()))?;
                    }
                }
                // a mixed-segment interval cannot come from this set's own
                // projection and has no peer meaning
                _ => {
                    return Err(ModelError::IndexRange {
                        interval: interval.to_string(),
                    });
                }
            }
        }
        Ok(res)
    }
}

// Concrete members compare as a plain set; IpBlock members compare merged,
// never by raw membership.
impl PartialEq for PeerSet {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint_refs() == other.endpoint_refs()
            && self.get_ip_block_canonical_form() == other.get_ip_block_canonical_form()
    }
}

impl Eq for PeerSet {}

impl std::ops::BitOr for &PeerSet {
    type Output = PeerSet;

    fn bitor(self, rhs: Self) -> PeerSet {
        self.union(rhs)
    }
}

impl std::ops::BitAnd for &PeerSet {
    type Output = PeerSet;

    fn bitand(self, rhs: Self) -> PeerSet {
        self.intersection(rhs)
    }
}

impl std::ops::Sub for &PeerSet {
    type Output = PeerSet;

    fn sub(self, rhs: Self) -> PeerSet {
        self.difference(rhs)
    }
}

impl IpBlock {
    /// This block as a peer set: a singleton, or empty when the block is
    /// empty
    pub fn get_peer_set(&self) -> PeerSet {
        let mut res = PeerSet::new();
        if !self.is_empty() {
            res.insert_unchecked(Peer::IpBlock(self.clone()));
        }
        res
    }

    /// The full address space as a singleton peer set
    pub fn all_ips_block_peer_set(exclude_ipv6: bool) -> PeerSet {
        Self::all_ips_block(exclude_ipv6, false).get_peer_set()
    }
}
