//! Port topology: logical joint index → physical node address.
//!
//! Each distinct port identifier gets the next unused port index in
//! first-encounter order, so the same joint order always reproduces the
//! same port layout across restarts.

use servo_common::hal::config::JointSpec;
use servo_common::hal::types::NodeAddress;

/// Resolved port layout and one node address per joint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    /// Distinct port identifiers, indexed by port index
    ports: Vec<String>,
    /// Node address per joint, indexed by logical joint index
    addresses: Vec<NodeAddress>,
}

impl Topology {
    /// Build the topology from the ordered joint list.
    pub fn resolve(specs: &[JointSpec]) -> Self {
        let mut ports: Vec<String> = Vec::new();
        let addresses = specs
            .iter()
            .map(|spec| {
                let port = match ports.iter().position(|p| *p == spec.port) {
                    Some(idx) => idx,
                    None => {
                        ports.push(spec.port.clone());
                        ports.len() - 1
                    }
                };
                NodeAddress::new(port, spec.node)
            })
            .collect();

        Self { ports, addresses }
    }

    /// Distinct port identifiers in port-index order.
    #[inline]
    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    /// Node addresses in joint order.
    #[inline]
    pub fn addresses(&self) -> &[NodeAddress] {
        &self.addresses
    }

    /// Address of joint `joint`.
    #[inline]
    pub fn address(&self, joint: usize) -> Option<NodeAddress> {
        self.addresses.get(joint).copied()
    }

    /// Port index assigned to a port identifier.
    pub fn port_index(&self, port: &str) -> Option<usize> {
        self.ports.iter().position(|p| p == port)
    }

    /// Number of distinct ports.
    #[inline]
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }
}
