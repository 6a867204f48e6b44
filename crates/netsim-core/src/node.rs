use std::collections::HashMap;

use netsim_types::{Address, LinkId, NodeId};

/// An addressable host: a table of outgoing links keyed by the
/// destination address it forwards toward, plus the set of its own
/// addresses (one per attached link, mirroring a multi-homed host).
#[derive(Debug, Default)]
pub struct Node {
    pub id: NodeId,
    local_addresses: Vec<Address>,
    forwarding_table: HashMap<Address, LinkId>,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            local_addresses: Vec::new(),
            forwarding_table: HashMap::new(),
        }
    }

    pub fn add_local_address(&mut self, address: Address) {
        self.local_addresses.push(address);
    }

    pub fn is_local(&self, address: Address) -> bool {
        self.local_addresses.contains(&address)
    }

    pub fn add_route(&mut self, destination: Address, via: LinkId) {
        self.forwarding_table.insert(destination, via);
    }

    /// Looks up the outgoing link for `destination`. `None` means no
    /// route exists; the caller traces a forwarding miss and drops.
    pub fn route_for(&self, destination: Address) -> Option<LinkId> {
        self.forwarding_table.get(&destination).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_to_registered_destination() {
        let mut node = Node::new(NodeId(0));
        node.add_route(7, LinkId(3));
        assert_eq!(node.route_for(7), Some(LinkId(3)));
        assert_eq!(node.route_for(8), None);
    }

    #[test]
    fn recognizes_its_own_addresses() {
        let mut node = Node::new(NodeId(0));
        node.add_local_address(1);
        assert!(node.is_local(1));
        assert!(!node.is_local(2));
    }
}
