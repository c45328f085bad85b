//! Peer identity module.
//!
//! Every endpoint the model reasons about is a [`Peer`]: a concrete
//! cluster endpoint (a pod or a host endpoint) or an external address
//! range ([`IpBlock`]). The hierarchy is composed rather than inherited,
//! and the peer variant space is closed: adding a new endpoint kind means
//! extending [`Endpoint`] and every exhaustive match over it.

pub mod index;
pub mod set;

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ip::IpBlock;

pub use index::{all_peers_and_ip_blocks_interval, PeerIndex, MAX_ENDPOINT_COUNT};
pub use set::PeerSet;

/// The capability surface shared by every peer kind
pub trait PeerCapability {
    /// `"<namespace>/<name>"` when namespaced, plain name otherwise
    fn full_name(&self) -> String;
    /// A string identical for, and only for, peers indistinguishable by
    /// any label/profile-based selector
    fn canonical_form(&self) -> String;
    /// Whether the peer is reachable from anywhere by definition
    fn is_global_peer(&self) -> bool;
}

/// Transport protocol of a named port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

/// A port definition attached to an endpoint under a symbolic name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPort {
    pub number: u16,
    pub protocol: Protocol,
}

/// Name, namespace and label state common to all endpoint kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    pub name: String,
    pub namespace: Option<String>,
    labels: BTreeMap<String, String>,
    extra_labels: BTreeMap<String, String>,
}

impl PeerIdentity {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
            labels: BTreeMap::new(),
            extra_labels: BTreeMap::new(),
        }
    }

    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    /// Record a label that originates from one of the endpoint's profiles
    pub fn set_extra_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra_labels.insert(key.into(), value.into());
    }

    pub fn clear_extra_labels(&mut self) {
        self.extra_labels.clear();
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn extra_labels(&self) -> &BTreeMap<String, String> {
        &self.extra_labels
    }
}

/// An endpoint inside the cluster: identity plus named ports and profiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEP {
    pub identity: PeerIdentity,
    named_ports: BTreeMap<String, NamedPort>,
    profiles: Vec<String>,
}

impl ClusterEP {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            identity: PeerIdentity::new(name, namespace),
            named_ports: BTreeMap::new(),
            profiles: Vec::new(),
        }
    }

    /// Define a named port. The first definition of a name wins; a
    /// redefinition is dropped and, when `warn` is set, logged as a
    /// diagnostic.
    pub fn add_named_port(&mut self, name: &str, port: NamedPort, warn: bool) {
        if name.is_empty() {
            return;
        }
        if self.named_ports.contains_key(name) {
            if warn {
                log::warn!(
                    "a port named '{}' is multiply defined for endpoint {}",
                    name,
                    self.full_name()
                );
            }
            return;
        }
        self.named_ports.insert(name.to_string(), port);
    }

    pub fn named_ports(&self) -> &BTreeMap<String, NamedPort> {
        &self.named_ports
    }

    /// Attach a profile. Order matters: the first profile sets the
    /// endpoint's default behavior, later ones may only add labels.
    pub fn add_profile(&mut self, profile_name: impl Into<String>) {
        self.profiles.push(profile_name.into());
    }

    pub fn has_profiles(&self) -> bool {
        !self.profiles.is_empty()
    }

    pub fn first_profile_name(&self) -> Option<&str> {
        self.profiles.first().map(String::as_str)
    }
}

impl PeerCapability for ClusterEP {
    fn full_name(&self) -> String {
        // in-cluster endpoints go by their bare name
        self.identity.name.clone()
    }

    fn canonical_form(&self) -> String {
        let mut ret = String::new();
        if let Some(first) = self.profiles.first() {
            ret.push(',');
            ret.push_str(first);
            let mut rest: Vec<&String> = self.profiles[1..].iter().collect();
            rest.sort();
            for profile in rest {
                ret.push(',');
                ret.push_str(profile);
            }
        }
        for (key, value) in &self.identity.labels {
            ret.push_str(&format!(",({},{})", key, value));
        }
        ret
    }

    fn is_global_peer(&self) -> bool {
        false
    }
}

/// A pod workload endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    pub ep: ClusterEP,
    pub owner_name: String,
    pub owner_kind: Option<String>,
    pub service_account_name: String,
    /// The workload this pod belongs to, derived from the owner reference
    pub workload_name: String,
    pub replicaset_name: Option<String>,
}

impl Pod {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        owner_name: impl Into<String>,
        owner_kind: Option<&str>,
        service_account_name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let namespace = namespace.into();
        let owner_name = owner_name.into();
        let mut replicaset_name = None;
        let workload_name = if owner_name.is_empty() {
            format!("{}/{}(Pod)", namespace, name)
        } else if owner_kind == Some("ReplicaSet") {
            replicaset_name = Some(format!("{}/{}(ReplicaSet)", namespace, owner_name));
            // A trailing hex suffix on the ReplicaSet name suggests the pod
            // was generated indirectly by a Deployment or StatefulSet; strip
            // it from the workload name. This is a best-effort heuristic: a
            // ReplicaSet whose own name happens to end in hex digits is
            // misclassified.
            match owner_name.rsplit_once('-') {
                Some((base, suffix))
                    if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_hexdigit()) =>
                {
                    format!("{}/{}(Deployment-StatefulSet)", namespace, base)
                }
                _ => format!("{}/{}(ReplicaSet)", namespace, owner_name),
            }
        } else {
            let kind = owner_kind.unwrap_or("Unknown");
            format!("{}/{}({})", namespace, owner_name, kind)
        };
        Self {
            ep: ClusterEP::new(name, Some(namespace)),
            owner_name,
            owner_kind: owner_kind.map(str::to_string),
            service_account_name: service_account_name.into(),
            workload_name,
            replicaset_name,
        }
    }

    fn namespace(&self) -> &str {
        self.ep.identity.namespace.as_deref().unwrap_or_default()
    }

    /// Same as [`ClusterEP::add_named_port`], but redefinition warnings
    /// are suppressed for kube-system, which the user cannot fix
    pub fn add_named_port(&mut self, name: &str, port: NamedPort) {
        let warn = self.namespace() != "kube-system";
        self.ep.add_named_port(name, port, warn);
    }
}

impl PeerCapability for Pod {
    fn full_name(&self) -> String {
        self.ep.identity.full_name()
    }

    fn canonical_form(&self) -> String {
        // pods are isomorphic only within one namespace and workload
        format!(
            "{}_{}_{}",
            self.namespace(),
            self.workload_name,
            self.ep.canonical_form()
        )
    }

    fn is_global_peer(&self) -> bool {
        false
    }
}

/// A host endpoint, reachable from anywhere by definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEP {
    pub ep: ClusterEP,
}

impl HostEP {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            ep: ClusterEP::new(name, namespace),
        }
    }
}

impl PeerCapability for HostEP {
    fn full_name(&self) -> String {
        self.ep.full_name()
    }

    fn canonical_form(&self) -> String {
        self.ep.canonical_form()
    }

    fn is_global_peer(&self) -> bool {
        true
    }
}

impl PeerCapability for IpBlock {
    fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.display_name()),
            None => self.display_name(),
        }
    }

    fn canonical_form(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}_{}", ns, self.display_name()),
            None => self.display_name(),
        }
    }

    fn is_global_peer(&self) -> bool {
        IpBlock::is_global_peer(self)
    }
}

/// A concrete (non-IpBlock) endpoint
#[derive(Debug, Clone)]
pub enum Endpoint {
    Pod(Pod),
    HostEP(HostEP),
}

impl Endpoint {
    fn kind(&self) -> u8 {
        match self {
            Self::Pod(_) => 0,
            Self::HostEP(_) => 1,
        }
    }

    pub fn named_ports(&self) -> &BTreeMap<String, NamedPort> {
        match self {
            Self::Pod(pod) => pod.ep.named_ports(),
            Self::HostEP(hep) => hep.ep.named_ports(),
        }
    }
}

impl PeerCapability for Endpoint {
    fn full_name(&self) -> String {
        match self {
            Self::Pod(pod) => pod.full_name(),
            Self::HostEP(hep) => hep.full_name(),
        }
    }

    fn canonical_form(&self) -> String {
        match self {
            Self::Pod(pod) => pod.canonical_form(),
            Self::HostEP(hep) => hep.canonical_form(),
        }
    }

    fn is_global_peer(&self) -> bool {
        match self {
            Self::Pod(pod) => pod.is_global_peer(),
            Self::HostEP(hep) => hep.is_global_peer(),
        }
    }
}

// Endpoints are identified by kind and full name; labels and ports carry
// no identity.
impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.full_name() == other.full_name()
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.full_name().hash(state);
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Any peer the model reasons about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    Endpoint(Endpoint),
    IpBlock(IpBlock),
}

impl Peer {
    pub fn as_endpoint(&self) -> Option<&Endpoint> {
        match self {
            Self::Endpoint(ep) => Some(ep),
            Self::IpBlock(_) => None,
        }
    }

    pub fn as_ip_block(&self) -> Option<&IpBlock> {
        match self {
            Self::Endpoint(_) => None,
            Self::IpBlock(block) => Some(block),
        }
    }
}

impl PeerCapability for Peer {
    fn full_name(&self) -> String {
        match self {
            Self::Endpoint(ep) => ep.full_name(),
            Self::IpBlock(block) => block.full_name(),
        }
    }

    fn canonical_form(&self) -> String {
        match self {
            Self::Endpoint(ep) => ep.canonical_form(),
            Self::IpBlock(block) => block.canonical_form(),
        }
    }

    fn is_global_peer(&self) -> bool {
        match self {
            Self::Endpoint(ep) => ep.is_global_peer(),
            Self::IpBlock(block) => PeerCapability::is_global_peer(block),
        }
    }
}

impl Hash for Peer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Endpoint(ep) => {
                0u8.hash(state);
                ep.hash(state);
            }
            Self::IpBlock(block) => {
                1u8.hash(state);
                block.hash(state);
            }
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(ep) => write!(f, "{}", ep),
            // an address-range peer displays as its ranges
            Self::IpBlock(block) => write!(f, "{}", block),
        }
    }
}

impl From<Pod> for Peer {
    fn from(pod: Pod) -> Self {
        Self::Endpoint(Endpoint::Pod(pod))
    }
}

impl From<HostEP> for Peer {
    fn from(hep: HostEP) -> Self {
        Self::Endpoint(Endpoint::HostEP(hep))
    }
}

impl From<IpBlock> for Peer {
    fn from(block: IpBlock) -> Self {
        Self::IpBlock(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TCP80: NamedPort = NamedPort {
        number: 80,
        protocol: Protocol::Tcp,
    };

    #[test]
    fn test_full_names() {
        let pod = Pod::new("web-1", "prod", "", None, "");
        assert_eq!(pod.full_name(), "prod/web-1");
        let hep = HostEP::new("node1-eth0", None);
        assert_eq!(hep.full_name(), "node1-eth0");
        let ep = ClusterEP::new("ep", Some("ns".to_string()));
        // in-cluster endpoints go by their bare name even when namespaced
        assert_eq!(ep.full_name(), "ep");
        assert_eq!(ep.identity.full_name(), "ns/ep");
    }

    #[test]
    fn test_workload_name_heuristic() {
        // no owner: the pod is its own workload
        let pod = Pod::new("solo", "ns", "", None, "");
        assert_eq!(pod.workload_name, "ns/solo(Pod)");
        // ReplicaSet with a hex suffix: generated by a higher-level controller
        let pod = Pod::new("web-1", "ns", "web-5d4c8f9b7c", Some("ReplicaSet"), "");
        assert_eq!(pod.workload_name, "ns/web(Deployment-StatefulSet)");
        assert_eq!(
            pod.replicaset_name.as_deref(),
            Some("ns/web-5d4c8f9b7c(ReplicaSet)")
        );
        // ReplicaSet without a hex suffix: generated directly
        let pod = Pod::new("web-1", "ns", "web-standalone", Some("ReplicaSet"), "");
        assert_eq!(pod.workload_name, "ns/web-standalone(ReplicaSet)");
        // any other owner kind
        let pod = Pod::new("job-1", "ns", "batch", Some("Job"), "");
        assert_eq!(pod.workload_name, "ns/batch(Job)");
    }

    #[test]
    fn test_named_port_first_definition_wins() {
        let mut ep = ClusterEP::new("ep", None);
        ep.add_named_port("http", TCP80, true);
        ep.add_named_port(
            "http",
            NamedPort {
                number: 8080,
                protocol: Protocol::Udp,
            },
            true,
        );
        assert_eq!(ep.named_ports().get("http"), Some(&TCP80));
        // empty names are ignored entirely
        ep.add_named_port("", TCP80, true);
        assert_eq!(ep.named_ports().len(), 1);
    }

    #[test]
    fn test_canonical_form_profiles_and_labels() {
        let mut ep = ClusterEP::new("ep", None);
        ep.identity.set_label("role", "db");
        ep.identity.set_label("app", "store");
        // first profile stays first, the rest are sorted
        ep.add_profile("zeta");
        ep.add_profile("beta");
        ep.add_profile("alpha");
        assert_eq!(ep.canonical_form(), ",zeta,alpha,beta,(app,store),(role,db)");
        assert_eq!(ep.first_profile_name(), Some("zeta"));

        // label order does not matter
        let mut other = ClusterEP::new("other", None);
        other.identity.set_label("app", "store");
        other.identity.set_label("role", "db");
        other.add_profile("zeta");
        other.add_profile("beta");
        other.add_profile("alpha");
        assert_eq!(ep.canonical_form(), other.canonical_form());
    }

    #[test]
    fn test_pod_canonical_form_includes_workload() {
        let mut a = Pod::new("web-1", "ns", "web-5d4c8f9b7c", Some("ReplicaSet"), "");
        let mut b = Pod::new("web-2", "ns", "web-7b9d8e0a1f", Some("ReplicaSet"), "");
        a.ep.identity.set_label("app", "web");
        b.ep.identity.set_label("app", "web");
        // same workload and labels: indistinguishable by any selector
        assert_eq!(a.canonical_form(), b.canonical_form());
        let c = Pod::new("web-3", "other", "web-5d4c8f9b7c", Some("ReplicaSet"), "");
        assert_ne!(a.canonical_form(), c.canonical_form());
    }

    #[test]
    fn test_global_peers() {
        assert!(HostEP::new("h", None).is_global_peer());
        assert!(!Pod::new("p", "ns", "", None, "").is_global_peer());
        let mut block = IpBlock::from_cidr("10.0.0.0/8", &[]).unwrap();
        assert!(!PeerCapability::is_global_peer(&block));
        block.is_global = true;
        assert!(PeerCapability::is_global_peer(&block));
    }

    #[test]
    fn test_endpoint_identity_semantics() {
        let a: Peer = Pod::new("p", "ns", "", None, "").into();
        let mut richer = Pod::new("p", "ns", "", None, "");
        richer.ep.identity.set_label("app", "web");
        let b: Peer = richer.into();
        // labels carry no identity
        assert_eq!(a, b);
        // a pod and a host endpoint never compare equal
        let hep: Peer = HostEP::new("ns/p", None).into();
        assert_ne!(a, hep);
    }

    #[test]
    fn test_extra_labels() {
        let mut identity = PeerIdentity::new("ep", None);
        identity.set_extra_label("from-profile", "x");
        assert_eq!(identity.extra_labels().len(), 1);
        identity.clear_extra_labels();
        assert!(identity.extra_labels().is_empty());
        assert!(identity.labels().is_empty());
    }
}
