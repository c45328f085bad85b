//! # Netmodel - Peer and IP-range set algebra for cluster network policy analysis
//!
//! This library models the endpoints and address ranges of a cluster network
//! so that connectivity and policy reasoning can treat concrete workloads
//! and arbitrary IP ranges uniformly, as members of one set algebra. Set
//! operations stay exact over enormous address ranges without ever
//! enumerating individual addresses.
//!
//! ## Overview
//!
//! A policy-evaluation engine constructs [`Peer`](peer::Peer) and
//! [`IpBlock`](ip::IpBlock) values from parsed manifests, composes them
//! into [`PeerSet`](peer::PeerSet)s while evaluating allow/deny rules, and
//! periodically converts a set into interval-index form (and back) so a
//! symbolic backend can combine results over one homogeneous integer axis.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `interval`: canonical, always-merged sets of disjoint closed intervals
//!   over any comparable integer-like domain
//! - `ip`: the unified IPv4/IPv6 address domain, CIDR-built range sets and
//!   the multi-block disjointification algorithm
//! - `peer`: the endpoint identity hierarchy, mixed peer sets with
//!   IpBlock-aware boolean algebra, and the peer index bridge
//! - `error`: structured error types for construction and indexing
//!
//! ## Example Usage
//!
//! ```rust
//! use netmodel::ip::IpBlock;
//! use netmodel::peer::{Peer, PeerSet, Pod};
//!
//! let lan = IpBlock::from_cidr("10.0.0.0/8", &["10.1.0.0/16"])?;
//! let web = Pod::new("web-1", "prod", "web-5d4c8f9b7c", Some("ReplicaSet"), "");
//!
//! let mut allowed = PeerSet::new();
//! allowed.insert(Peer::from(lan))?;
//! allowed.insert(Peer::from(web))?;
//!
//! let denied = IpBlock::from_cidr("10.2.0.0/16", &[])?.get_peer_set();
//! let reachable = &allowed - &denied;
//! assert!(!reachable.is_empty());
//! # Ok::<(), netmodel::error::ModelError>(())
//! ```
//!
//! ## Error Handling
//!
//! Fallible construction and indexing return `Result<T, ModelError>`; the
//! pure set algebra is total and never fails. Non-fatal modeling
//! diagnostics (such as duplicate named-port definitions) are reported
//! through the `log` crate.

pub mod error;
pub mod interval;
pub mod ip;
pub mod peer;

pub use error::{ModelError, Result};
pub use interval::{Interval, IntervalElement, IntervalSet};
pub use ip::{disjoint_ip_blocks, IpBlock, NetworkAddress};
pub use peer::{
    all_peers_and_ip_blocks_interval, ClusterEP, Endpoint, HostEP, NamedPort, Peer,
    PeerCapability, PeerIdentity, PeerIndex, PeerSet, Pod, Protocol, MAX_ENDPOINT_COUNT,
};
