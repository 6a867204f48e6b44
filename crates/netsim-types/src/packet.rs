use serde::{Deserialize, Serialize};

use crate::ids::{Address, Port};

/// The end-to-end wire record carried by a [`Link`](../../netsim_core/link/struct.Link.html).
///
/// Once in flight, only the three transit delay counters may change; every
/// other field is fixed at construction. `ack_number == 0` means "no ACK
/// field present" unless the packet also carries a body, in which case it
/// is a perfectly ordinary data segment whose sender has not yet received
/// anything back (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Packet {
    pub source_address: Address,
    pub source_port: Port,
    pub destination_address: Address,
    pub destination_port: Port,

    /// Byte offset of the first body byte in the sender's stream.
    pub sequence: u64,
    /// Next byte the receiver expects, or 0 if no ACK is piggybacked.
    pub ack_number: u64,

    pub body: Vec<u8>,

    /// Simulated time the sender posted this packet.
    pub sent_time: f64,

    pub queueing_delay: f64,
    pub transmission_delay: f64,
    pub propagation_delay: f64,
}

impl Packet {
    pub fn new(
        source_address: Address,
        source_port: Port,
        destination_address: Address,
        destination_port: Port,
        sequence: u64,
        ack_number: u64,
        body: Vec<u8>,
        sent_time: f64,
    ) -> Self {
        Self {
            source_address,
            source_port,
            destination_address,
            destination_port,
            sequence,
            ack_number,
            body,
            sent_time,
            queueing_delay: 0.0,
            transmission_delay: 0.0,
            propagation_delay: 0.0,
        }
    }

    pub fn length(&self) -> usize {
        self.body.len()
    }

    pub fn is_ack_only(&self) -> bool {
        self.body.is_empty() && self.ack_number > 0
    }
}
