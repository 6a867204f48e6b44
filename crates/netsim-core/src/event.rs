use netsim_types::{ConnId, LinkId, Packet};

/// Every kind of thing the scheduler can fire, in place of the original's
/// arbitrary callable-per-timer design. Dispatch is a single `match` in
/// [`crate::simulation::Simulation::step`] instead of dynamic dispatch.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// A link's transmission budget has caught up to the head of its
    /// queue and a new packet may start serializing onto the wire.
    LinkDequeue { link: LinkId },
    /// A packet finishes propagation and is delivered to the link's far
    /// endpoint.
    LinkArrival { link: LinkId, packet: Packet },
    /// A connection's retransmission timer has fired. Carries the
    /// sequence number that was outstanding when the timer was armed, so
    /// a stale firing (the data it covers was already ACKed by the time
    /// it pops) can be recognized and ignored without relying on a
    /// generation counter.
    RetransmitTimeout { conn: ConnId, covers_seq: u64 },
    /// A scenario-driven or application-driven request to push more
    /// bytes into a connection's send buffer at a specific time.
    AppSend { conn: ConnId, data: Vec<u8> },
}
