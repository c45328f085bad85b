//! A single comparable domain over IPv4 and IPv6 addresses.

use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::ModelError;
use crate::interval::IntervalElement;

/// An IPv4 or IPv6 address under one total order.
///
/// Ordering is by (version, value): every IPv4 address sorts before every
/// IPv6 address. Arithmetic clamps at the nearest valid address of the same
/// version instead of wrapping or failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkAddress {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl NetworkAddress {
    pub const MIN_V4: Self = Self::V4(Ipv4Addr::new(0, 0, 0, 0));
    pub const MAX_V4: Self = Self::V4(Ipv4Addr::new(255, 255, 255, 255));
    pub const MIN_V6: Self = Self::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0));
    pub const MAX_V6: Self = Self::V6(Ipv6Addr::new(
        0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff,
    ));

    pub fn version(&self) -> u8 {
        match self {
            Self::V4(_) => 4,
            Self::V6(_) => 6,
        }
    }

    pub fn is_ipv4(&self) -> bool {
        matches!(self, Self::V4(_))
    }

    /// Address value as an integer (u32 zero-extended for IPv4)
    pub fn to_bits(&self) -> u128 {
        match self {
            Self::V4(a) => u32::from(*a) as u128,
            Self::V6(a) => u128::from(*a),
        }
    }

    /// Move forward by `offset` addresses, clamping at the top of the
    /// address's own version
    pub fn saturating_add(self, offset: u128) -> Self {
        match self {
            Self::V4(a) => {
                let step = u32::try_from(offset).unwrap_or(u32::MAX);
                Self::V4(Ipv4Addr::from(u32::from(a).saturating_add(step)))
            }
            Self::V6(a) => Self::V6(Ipv6Addr::from(u128::from(a).saturating_add(offset))),
        }
    }

    /// Move backward by `offset` addresses, clamping at the bottom of the
    /// address's own version
    pub fn saturating_sub(self, offset: u128) -> Self {
        match self {
            Self::V4(a) => {
                let step = u32::try_from(offset).unwrap_or(u32::MAX);
                Self::V4(Ipv4Addr::from(u32::from(a).saturating_sub(step)))
            }
            Self::V6(a) => Self::V6(Ipv6Addr::from(u128::from(a).saturating_sub(offset))),
        }
    }
}

impl Ord for NetworkAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::V4(a), Self::V4(b)) => a.cmp(b),
            (Self::V6(a), Self::V6(b)) => a.cmp(b),
            (Self::V4(_), Self::V6(_)) => Ordering::Less,
            (Self::V6(_), Self::V4(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for NetworkAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Successor/predecessor stay inside the address version. The top of the
// IPv4 space therefore has no successor, so IPv4 and IPv6 intervals can
// never be merged into one.
impl IntervalElement for NetworkAddress {
    fn successor(&self) -> Option<Self> {
        match self {
            Self::V4(a) => u32::from(*a).checked_add(1).map(|n| Self::V4(n.into())),
            Self::V6(a) => u128::from(*a).checked_add(1).map(|n| Self::V6(n.into())),
        }
    }

    fn predecessor(&self) -> Option<Self> {
        match self {
            Self::V4(a) => u32::from(*a).checked_sub(1).map(|n| Self::V4(n.into())),
            Self::V6(a) => u128::from(*a).checked_sub(1).map(|n| Self::V6(n.into())),
        }
    }
}

impl From<IpAddr> for NetworkAddress {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => Self::V4(a),
            IpAddr::V6(a) => Self::V6(a),
        }
    }
}

impl From<Ipv4Addr> for NetworkAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self::V4(addr)
    }
}

impl From<Ipv6Addr> for NetworkAddress {
    fn from(addr: Ipv6Addr) -> Self {
        Self::V6(addr)
    }
}

impl FromStr for NetworkAddress {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<IpAddr>()
            .map(Self::from)
            .map_err(|e| ModelError::AddressFormat {
                literal: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(a) => write!(f, "{}", a),
            Self::V6(a) => write!(f, "{}", a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> NetworkAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_order_v4_before_v6() {
        assert!(v4("255.255.255.255") < "::".parse().unwrap());
        assert!(v4("10.0.0.1") < v4("10.0.0.2"));
        let low6: NetworkAddress = "::1".parse().unwrap();
        let high6: NetworkAddress = "ff::".parse().unwrap();
        assert!(low6 < high6);
    }

    #[test]
    fn test_saturating_arithmetic_clamps() {
        assert_eq!(
            NetworkAddress::MAX_V4.saturating_add(1),
            NetworkAddress::MAX_V4
        );
        assert_eq!(
            NetworkAddress::MIN_V4.saturating_sub(10),
            NetworkAddress::MIN_V4
        );
        assert_eq!(
            NetworkAddress::MAX_V6.saturating_add(u128::MAX),
            NetworkAddress::MAX_V6
        );
        assert_eq!(v4("10.0.0.0").saturating_add(256), v4("10.0.1.0"));
    }

    #[test]
    fn test_successor_stops_at_version_boundary() {
        assert_eq!(NetworkAddress::MAX_V4.successor(), None);
        assert_eq!(NetworkAddress::MIN_V6.predecessor(), None);
        assert_eq!(v4("10.0.0.0").successor(), Some(v4("10.0.0.1")));
        assert_eq!(v4("10.0.0.1").predecessor(), Some(v4("10.0.0.0")));
    }

    #[test]
    fn test_parse_failure() {
        let err = "not-an-ip".parse::<NetworkAddress>().unwrap_err();
        assert!(matches!(err, ModelError::AddressFormat { .. }));
    }
}
