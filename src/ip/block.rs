//! IP range sets with CIDR construction and disjointification.
//!
//! An [`IpBlock`] is a canonical interval set over [`NetworkAddress`]
//! together with the peer-facing metadata (name, namespace, global flag)
//! that lets it stand in for an external-range peer. CIDR strings are
//! parsed loosely: host bits are normalized away and bare IP literals are
//! accepted as single-address ranges.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use ipnet::{IpNet, Ipv4Subnets, Ipv6Subnets};

use crate::error::{ModelError, Result};
use crate::interval::{Interval, IntervalSet};
use crate::ip::addr::NetworkAddress;

/// A set of IP ranges, usable both as an interval domain and as a peer
#[derive(Debug, Clone, Default)]
pub struct IpBlock {
    ranges: IntervalSet<NetworkAddress>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub is_global: bool,
}

/// Loose CIDR parse: host bits permitted (normalized away), bare IP
/// literals accepted as /32 or /128.
fn parse_cidr(cidr: &str) -> Result<Interval<NetworkAddress>> {
    let trimmed = cidr.trim();
    if trimmed.contains('/') {
        let net: IpNet = trimmed.parse().map_err(|e: ipnet::AddrParseError| {
            ModelError::AddressFormat {
                literal: cidr.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Interval::new(net.network().into(), net.broadcast().into()))
    } else {
        let addr: IpAddr = trimmed
            .parse()
            .map_err(|e: std::net::AddrParseError| ModelError::AddressFormat {
                literal: cidr.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Interval::point(addr.into()))
    }
}

impl IpBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a CIDR with optional exception CIDRs carved out
    pub fn from_cidr(cidr: &str, exceptions: &[&str]) -> Result<Self> {
        let mut res = Self::new();
        res.add_cidr(cidr, exceptions)?;
        Ok(res)
    }

    pub fn from_interval(interval: Interval<NetworkAddress>) -> Self {
        Self {
            ranges: IntervalSet::from_interval(interval),
            ..Self::default()
        }
    }

    pub fn from_range(start: NetworkAddress, end: NetworkAddress) -> Self {
        Self::from_interval(Interval::new(start, end))
    }

    /// The full IPv4 and/or IPv6 address space
    pub fn all_ips_block(exclude_ipv6: bool, exclude_ipv4: bool) -> Self {
        debug_assert!(!(exclude_ipv4 && exclude_ipv6));
        let mut res = Self::new();
        if !exclude_ipv4 {
            res.ranges
                .add_interval(Interval::new(NetworkAddress::MIN_V4, NetworkAddress::MAX_V4));
        }
        if !exclude_ipv6 {
            res.ranges
                .add_interval(Interval::new(NetworkAddress::MIN_V6, NetworkAddress::MAX_V6));
        }
        res
    }

    pub fn ranges(&self) -> &IntervalSet<NetworkAddress> {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Add the range covered by `cidr`, then carve out each exception.
    /// Every exception must be contained in the target CIDR.
    pub fn add_cidr(&mut self, cidr: &str, exceptions: &[&str]) -> Result<()> {
        let target = parse_cidr(cidr)?;
        let mut holes = Vec::with_capacity(exceptions.len());
        for exception in exceptions {
            let hole = parse_cidr(exception)?;
            if !hole.is_subset_of(&target) {
                return Err(ModelError::Containment {
                    cidr: cidr.to_string(),
                    exception: exception.to_string(),
                });
            }
            holes.push(hole);
        }
        self.ranges.add_interval(target);
        for hole in holes {
            self.ranges.add_hole(hole);
        }
        Ok(())
    }

    /// Remove the range covered by `cidr`
    pub fn remove_cidr(&mut self, cidr: &str) -> Result<()> {
        let hole = parse_cidr(cidr)?;
        self.ranges.add_hole(hole);
        Ok(())
    }

    /// Minimal covering CIDR blocks, one run per disjoint range
    pub fn get_cidr_list(&self) -> Vec<String> {
        let mut cidrs = Vec::new();
        for interval in self.ranges.iter() {
            match (interval.start, interval.end) {
                (NetworkAddress::V4(start), NetworkAddress::V4(end)) => {
                    for net in Ipv4Subnets::new(start, end, 0) {
                        cidrs.push(net.to_string());
                    }
                }
                (NetworkAddress::V6(start), NetworkAddress::V6(end)) => {
                    for net in Ipv6Subnets::new(start, end, 0) {
                        cidrs.push(net.to_string());
                    }
                }
                _ => debug_assert!(false, "interval spans IP versions"),
            }
        }
        cidrs
    }

    pub fn get_cidr_list_str(&self) -> String {
        self.get_cidr_list().join(",")
    }

    /// The shorter textual form: ranges when at most half as many as the
    /// covering CIDRs (or when forced), CIDRs otherwise
    pub fn get_ip_range_or_cidr_str(&self, range_only: bool) -> String {
        let num_cidrs = self.get_cidr_list().len();
        let num_ranges = self.ranges.len();
        if range_only || num_ranges * 2 <= num_cidrs {
            self.ranges.to_string()
        } else {
            self.get_cidr_list_str()
        }
    }

    /// Number of addresses covered, saturating at `u128::MAX` (the full
    /// IPv6 space holds one address more than `u128` can count)
    pub fn ip_count(&self) -> u128 {
        self.ranges.iter().fold(0u128, |acc, interval| {
            let span = interval.end.to_bits() - interval.start.to_bits();
            acc.saturating_add(span.saturating_add(1))
        })
    }

    /// Whether the block holds IPv4 addresses only (vacuously true when empty)
    pub fn is_ipv4_block(&self) -> bool {
        self.ranges.iter().all(|interval| interval.start.is_ipv4())
    }

    pub fn is_global_peer(&self) -> bool {
        self.is_global
    }

    /// The name to show for this block: the explicit name when one was
    /// given, the minimal CIDR-list string otherwise
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.get_cidr_list_str(),
        }
    }

    /// One single-range block per disjoint interval
    pub fn split(&self) -> Vec<IpBlock> {
        self.ranges
            .iter()
            .map(|interval| IpBlock::from_interval(*interval))
            .collect()
    }

    /// Absorb another block's ranges, keeping this block's metadata
    pub fn merge(&mut self, other: &IpBlock) {
        for interval in other.ranges.iter() {
            self.ranges.add_interval(*interval);
        }
    }

    /// Drop every address outside `mask`, keeping this block's metadata
    pub fn restrict_to(&mut self, mask: &IpBlock) {
        self.ranges = self.ranges.intersection(&mask.ranges);
    }

    pub fn union(&self, other: &IpBlock) -> IpBlock {
        IpBlock {
            ranges: self.ranges.union(&other.ranges),
            ..IpBlock::default()
        }
    }

    pub fn intersection(&self, other: &IpBlock) -> IpBlock {
        IpBlock {
            ranges: self.ranges.intersection(&other.ranges),
            ..IpBlock::default()
        }
    }

    pub fn difference(&self, other: &IpBlock) -> IpBlock {
        IpBlock {
            ranges: self.ranges.difference(&other.ranges),
            ..IpBlock::default()
        }
    }

    pub fn overlaps(&self, other: &IpBlock) -> bool {
        self.ranges.overlaps(&other.ranges)
    }

    pub fn contained_in(&self, other: &IpBlock) -> bool {
        self.ranges.contained_in(&other.ranges)
    }
}

// Equality and hashing are content-based over the canonical ranges only;
// name, namespace and the global flag carry no set semantics.
impl PartialEq for IpBlock {
    fn eq(&self, other: &Self) -> bool {
        self.ranges == other.ranges
    }
}

impl Eq for IpBlock {}

impl Hash for IpBlock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ranges.hash(state);
    }
}

impl fmt::Display for IpBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ranges)
    }
}

impl std::ops::BitOr for &IpBlock {
    type Output = IpBlock;

    fn bitor(self, rhs: Self) -> IpBlock {
        self.union(rhs)
    }
}

impl std::ops::BitAnd for &IpBlock {
    type Output = IpBlock;

    fn bitand(self, rhs: Self) -> IpBlock {
        self.intersection(rhs)
    }
}

impl std::ops::Sub for &IpBlock {
    type Output = IpBlock;

    fn sub(self, rhs: Self) -> IpBlock {
        self.difference(rhs)
    }
}

/// Fold one candidate into the growing disjoint list: split the
/// intersection off every existing member it overlaps, shrink that member,
/// subtract the intersection from the candidate, and append whatever part
/// of the candidate was never claimed.
fn add_block_to_disjoint_list(mut candidate: IpBlock, disjoint: &mut Vec<IpBlock>) {
    let mut carved = Vec::new();
    for existing in disjoint.iter_mut() {
        if !existing.overlaps(&candidate) {
            continue;
        }
        let intersection = existing.intersection(&candidate);
        candidate = candidate.difference(&intersection);
        if *existing != intersection {
            *existing = existing.difference(&intersection);
            carved.push(intersection);
        }
        if candidate.is_empty() {
            break;
        }
    }
    disjoint.extend(candidate.split());
    disjoint.append(&mut carved);
}

/// Compute the unique minimal set of pairwise-disjoint, maximal blocks
/// whose union equals the union of both inputs and in which every input
/// block is exactly a union of members. The result is never empty: when
/// both inputs are empty the full address space is substituted
/// (`exclude_ipv6` leaves the IPv6 half out).
pub fn disjoint_ip_blocks(
    blocks1: &[IpBlock],
    blocks2: &[IpBlock],
    exclude_ipv6: bool,
) -> Vec<IpBlock> {
    let mut working: Vec<IpBlock> = Vec::new();
    for block in blocks1.iter().chain(blocks2.iter()) {
        if !working.contains(block) {
            working.push(block.clone());
        }
    }
    // smallest blocks first to minimize split churn
    working.sort_by_key(IpBlock::ip_count);

    let mut disjoint: Vec<IpBlock> = Vec::new();
    for block in working {
        add_block_to_disjoint_list(block, &mut disjoint);
    }
    disjoint.retain(|block| !block.is_empty());

    if disjoint.is_empty() {
        log::debug!("disjoint block list came out empty, substituting the full address space");
        disjoint.push(IpBlock::all_ips_block(exclude_ipv6, false));
    }
    disjoint
}
