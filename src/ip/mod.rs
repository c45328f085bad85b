//! IP address domain module.
//!
//! This module unifies IPv4 and IPv6 under one comparable address domain
//! and specializes the canonical interval engine to IP ranges, including
//! CIDR construction and the multi-block disjointification used to combine
//! independent rules' address predicates exactly.

pub mod addr;
pub mod block;

// Re-export commonly used types
pub use addr::NetworkAddress;
pub use block::{disjoint_ip_blocks, IpBlock};
