use std::collections::HashMap;

use netsim_types::{Address, ConnId, Port};

/// Key a connection registers under: the local port it listens on, and
/// the specific remote peer it talks to. Demultiplexing an inbound
/// packet is an exact-match lookup on the packet's
/// (destination_port, source_port, source_address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportKey {
    pub local_port: Port,
    pub remote_port: Port,
    pub remote_address: Address,
}

/// Demultiplexer on (destination_port, source_port, source_address),
/// one per node, routing inbound packets to the owning connection.
#[derive(Debug, Default)]
pub struct Transport {
    connections: HashMap<TransportKey, ConnId>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: TransportKey, conn: ConnId) {
        self.connections.insert(key, conn);
    }

    pub fn lookup(&self, key: TransportKey) -> Option<ConnId> {
        self.connections.get(&key).copied()
    }
}
