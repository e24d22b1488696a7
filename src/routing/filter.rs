//! Inbound frame address filtering

use serde::Serialize;

use crate::constants::{MAX_NET, MAX_SUBNET, MAX_UNIVERSE};
use crate::error::ConfigError;
use crate::protocol::PortAddress;

/// Identity of this node on the Art-Net network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeAddress {
    net: u8,
    subnet: u8,
    universe: u8,
}

impl NodeAddress {
    /// Create a validated node address
    pub fn new(net: u8, subnet: u8, universe: u8) -> Result<Self, ConfigError> {
        if net > MAX_NET {
            return Err(ConfigError::NetOutOfRange(net));
        }
        if subnet > MAX_SUBNET {
            return Err(ConfigError::SubnetOutOfRange(subnet));
        }
        if universe > MAX_UNIVERSE {
            return Err(ConfigError::UniverseOutOfRange(universe));
        }
        Ok(Self {
            net,
            subnet,
            universe,
        })
    }

    pub fn net(&self) -> u8 {
        self.net
    }

    pub fn subnet(&self) -> u8 {
        self.subnet
    }

    pub fn universe(&self) -> u8 {
        self.universe
    }
}

/// Accepts frames addressed to this node's net and subnet
///
/// The universe is left to the route table, since one node may take part in
/// several universes.
#[derive(Debug, Clone, Copy)]
pub struct AddressFilter {
    address: NodeAddress,
}

impl AddressFilter {
    pub fn new(address: NodeAddress) -> Self {
        Self { address }
    }

    pub fn accepts(&self, net: u8, subnet: u8, _universe: u8) -> bool {
        net == self.address.net && subnet == self.address.subnet
    }

    pub fn accepts_port(&self, port: PortAddress) -> bool {
        self.accepts(port.net, port.subnet, port.universe)
    }

    pub fn address(&self) -> NodeAddress {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_address_ranges() {
        assert!(NodeAddress::new(127, 15, 15).is_ok());
        assert_eq!(NodeAddress::new(128, 0, 0), Err(ConfigError::NetOutOfRange(128)));
        assert_eq!(NodeAddress::new(0, 16, 0), Err(ConfigError::SubnetOutOfRange(16)));
        assert_eq!(NodeAddress::new(0, 0, 16), Err(ConfigError::UniverseOutOfRange(16)));
    }

    #[test]
    fn test_filter_ignores_universe() {
        let filter = AddressFilter::new(NodeAddress::new(2, 3, 0).unwrap());

        assert!(filter.accepts(2, 3, 0));
        assert!(filter.accepts(2, 3, 15));
        assert!(!filter.accepts(2, 4, 0));
        assert!(!filter.accepts(1, 3, 0));
        assert!(filter.accepts_port(PortAddress::new(2, 3, 7)));
    }
}
