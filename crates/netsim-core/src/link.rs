use netsim_types::{DropReason, LinkId, NodeId, Packet, TraceCategory};
use rand::Rng;
use tracing::trace;

use crate::event::SimEvent;
use crate::scheduler::Scheduler;

/// A one-shot predicate that forces a drop independent of queue state or
/// the random-loss roll, keyed by whatever the caller finds convenient to
/// match on (sequence number for a data segment, ack number for a pure
/// ACK). Consumed on first match.
pub type ForceDropPredicate = Box<dyn FnMut(&Packet) -> bool + Send>;

/// A one-way transmission pipe: bandwidth-limited serialization, a fixed
/// propagation delay, an optionally bounded FIFO queue, and independent
/// random loss. Mirrors the reference simulator's `Link` one-for-one;
/// `busy` is true exactly while a transmission event is outstanding.
pub struct Link {
    pub id: LinkId,
    pub address: u32,
    pub startpoint: NodeId,
    pub endpoint: NodeId,
    pub queue_size: Option<usize>,
    pub bandwidth: f64,
    pub propagation: f64,
    pub loss: f64,
    running: bool,
    busy: bool,
    queue: Vec<(Packet, f64)>,
    force_drop: Option<ForceDropPredicate>,
}

impl Link {
    pub fn new(
        id: LinkId,
        address: u32,
        startpoint: NodeId,
        endpoint: NodeId,
        bandwidth: f64,
        propagation: f64,
        queue_size: Option<usize>,
        loss: f64,
    ) -> Self {
        Self {
            id,
            address,
            startpoint,
            endpoint,
            queue_size,
            bandwidth,
            propagation,
            loss,
            running: true,
            busy: false,
            queue: Vec::new(),
            force_drop: None,
        }
    }

    /// Installs a deterministic test hook: the next packet for which
    /// `pred` returns `true` is dropped regardless of queue state or the
    /// random-loss roll, and the hook is removed. Lets a test force an
    /// exact drop (by sequence or ack number) without depending on the
    /// RNG.
    pub fn set_force_drop(&mut self, pred: ForceDropPredicate) {
        self.force_drop = Some(pred);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn up(&mut self) {
        self.running = true;
    }

    pub fn down(&mut self) {
        self.running = false;
    }

    /// Attempts to admit `packet` to the link. Returns `Some(reason)` if
    /// the packet was dropped instead of queued/transmitted.
    pub fn send_packet(
        &mut self,
        packet: Packet,
        now: f64,
        rng: &mut impl Rng,
        scheduler: &mut Scheduler<SimEvent>,
    ) -> Option<DropReason> {
        if !self.running {
            return Some(DropReason::LinkDown);
        }

        if let Some(pred) = &mut self.force_drop {
            if pred(&packet) {
                self.force_drop = None;
                trace!(target: TraceCategory::Link.target(), seq = packet.sequence, "force drop");
                return Some(DropReason::Deterministic);
            }
        }

        if let Some(limit) = self.queue_size {
            if self.queue.len() == limit {
                trace!(target: TraceCategory::Queue.target(), "queue overflow");
                return Some(DropReason::QueueOverflow);
            }
        }

        if self.loss > 0.0 && rng.random::<f64>() < self.loss {
            trace!(target: TraceCategory::Link.target(), seq = packet.sequence, "random loss");
            return Some(DropReason::RandomLoss);
        }

        if self.queue.is_empty() && !self.busy {
            self.busy = true;
            self.transmit(packet, scheduler);
        } else {
            self.queue.push((packet, now));
            trace!(target: TraceCategory::Queue.target(), len = self.queue.len(), "enqueued");
        }
        None
    }

    /// Transmits a packet that is starting service right now (queueing
    /// delay zero: it never waited behind another packet).
    fn transmit(&mut self, mut packet: Packet, scheduler: &mut Scheduler<SimEvent>) {
        let tx = 8.0 * packet.length() as f64 / self.bandwidth;
        packet.transmission_delay += tx;
        packet.propagation_delay += self.propagation;

        scheduler
            .add(
                tx + self.propagation,
                SimEvent::LinkArrival {
                    link: self.id,
                    packet,
                },
            )
            .expect("transmission delay is non-negative");
        scheduler
            .add(tx, SimEvent::LinkDequeue { link: self.id })
            .expect("transmission delay is non-negative");
    }

    /// Fires when the current transmission's serialization time elapses:
    /// starts the next queued packet, or clears `busy` if none remain.
    pub fn on_dequeue(&mut self, now: f64, scheduler: &mut Scheduler<SimEvent>) {
        if let Some((packet, enqueued_at)) = pop_front(&mut self.queue) {
            let mut packet = packet;
            packet.queueing_delay += now - enqueued_at;
            let tx = 8.0 * packet.length() as f64 / self.bandwidth;
            packet.transmission_delay += tx;
            packet.propagation_delay += self.propagation;
            scheduler
                .add(
                    tx + self.propagation,
                    SimEvent::LinkArrival {
                        link: self.id,
                        packet,
                    },
                )
                .expect("transmission delay is non-negative");
            scheduler
                .add(tx, SimEvent::LinkDequeue { link: self.id })
                .expect("transmission delay is non-negative");
        } else {
            self.busy = false;
        }
    }
}

fn pop_front<T>(v: &mut Vec<T>) -> Option<T> {
    if v.is_empty() {
        None
    } else {
        Some(v.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_types::Packet;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn packet(seq: u64, len: usize) -> Packet {
        Packet::new(1, 100, 2, 200, seq, 0, vec![0u8; len], 0.0)
    }

    #[test]
    fn queue_size_one_drops_second_back_to_back_packet() {
        let mut link = Link::new(LinkId(0), 1, NodeId(0), NodeId(1), 8_000.0, 0.0, Some(1), 0.0);
        let mut sched: Scheduler<SimEvent> = Scheduler::new();
        let mut rng = StdRng::seed_from_u64(1);

        let first = link.send_packet(packet(0, 1000), 0.0, &mut rng, &mut sched);
        assert!(first.is_none());
        assert!(link.queue_len() == 0); // first packet transmits immediately, queue stays empty

        let second = link.send_packet(packet(1000, 1000), 0.0, &mut rng, &mut sched);
        assert_eq!(second, None); // queue_size=1 has room for exactly one queued packet

        let third = link.send_packet(packet(2000, 1000), 0.0, &mut rng, &mut sched);
        assert_eq!(third, Some(DropReason::QueueOverflow));
    }

    #[test]
    fn loss_rate_one_drops_every_packet() {
        let mut link = Link::new(LinkId(0), 1, NodeId(0), NodeId(1), 8_000.0, 0.0, None, 1.0);
        let mut sched: Scheduler<SimEvent> = Scheduler::new();
        let mut rng = StdRng::seed_from_u64(7);

        for seq in 0..10 {
            let reason = link.send_packet(packet(seq * 1000, 1000), 0.0, &mut rng, &mut sched);
            assert_eq!(reason, Some(DropReason::RandomLoss));
        }
    }

    #[test]
    fn down_link_drops_silently_without_consulting_queue_or_loss() {
        let mut link = Link::new(LinkId(0), 1, NodeId(0), NodeId(1), 8_000.0, 0.0, None, 0.0);
        let mut sched: Scheduler<SimEvent> = Scheduler::new();
        let mut rng = StdRng::seed_from_u64(1);
        link.down();
        let reason = link.send_packet(packet(0, 1000), 0.0, &mut rng, &mut sched);
        assert_eq!(reason, Some(DropReason::LinkDown));
    }

    #[test]
    fn force_drop_hook_fires_once_then_clears() {
        let mut link = Link::new(LinkId(0), 1, NodeId(0), NodeId(1), 8_000.0, 0.0, None, 0.0);
        let mut sched: Scheduler<SimEvent> = Scheduler::new();
        let mut rng = StdRng::seed_from_u64(1);
        link.set_force_drop(Box::new(|p: &Packet| p.sequence == 2000));

        let first = link.send_packet(packet(2000, 1000), 0.0, &mut rng, &mut sched);
        assert_eq!(first, Some(DropReason::Deterministic));

        let second = link.send_packet(packet(2000, 1000), 0.0, &mut rng, &mut sched);
        assert_eq!(second, None);
    }
}
