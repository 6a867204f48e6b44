use std::collections::VecDeque;

use netsim_types::{Address, ConnId, Packet, Port};
use tracing::trace;

use crate::buffer::{ReceiveBuffer, SendBuffer};
use crate::scheduler::{Scheduler, SchedulerHandle};
use crate::event::SimEvent;

const RTO_K: f64 = 4.0;
const RTT_ALPHA: f64 = 0.125;
const RTT_BETA: f64 = 0.25;
const RTO_MIN: f64 = 1.0;
const RTO_MAX: f64 = 60.0;
const INITIAL_RTO: f64 = 3.0;
const DEFAULT_MSS: u64 = 1000;

/// RFC 6298-style retransmission timeout estimator, split out of
/// `TcpConnection` so its arithmetic can be exercised without any
/// scheduler or buffer machinery around it.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    pub rto: f64,
    srtt: f64,
    rttvar: f64,
    initialized: bool,
    rto_min: f64,
    rto_max: f64,
}

impl RttEstimator {
    pub fn new() -> Self {
        Self {
            rto: INITIAL_RTO,
            srtt: 0.0,
            rttvar: 0.0,
            initialized: false,
            rto_min: RTO_MIN,
            rto_max: RTO_MAX,
        }
    }

    /// Folds in one new RTT sample. Must never be called with a sample
    /// drawn from a retransmitted segment (Karn's algorithm); enforcing
    /// that is the caller's job, not this estimator's.
    pub fn sample(&mut self, r: f64) {
        if !self.initialized {
            self.srtt = r;
            self.rttvar = r / 2.0;
            self.initialized = true;
        } else {
            self.rttvar = (1.0 - RTT_BETA) * self.rttvar + RTT_BETA * (self.srtt - r).abs();
            self.srtt = (1.0 - RTT_ALPHA) * self.srtt + RTT_ALPHA * r;
        }
        self.rto = self.srtt + RTO_K * self.rttvar;
        self.clamp();
    }

    /// Exponential backoff on timeout: double and clamp.
    pub fn backoff(&mut self) {
        self.rto *= 2.0;
        self.clamp();
    }

    fn clamp(&mut self) {
        self.rto = self.rto.clamp(self.rto_min, self.rto_max);
    }
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Reno-style congestion window: slow start below `threshold`, then a
/// fractional accumulator in congestion avoidance so the window itself
/// stays an integer byte count.
#[derive(Debug, Clone)]
pub struct CongestionWindow {
    pub window: u64,
    pub threshold: u64,
    mss: u64,
    ca_accum: f64,
    /// Every value `window` has taken, in order. Small for any scenario
    /// this simulator is sized for; used by scenario assertions like
    /// "window reached at least N" or "window dropped from >=A to <=B".
    history: Vec<u64>,
}

impl CongestionWindow {
    pub fn new(initial_window: u64, mss: u64) -> Self {
        Self {
            window: initial_window,
            threshold: 100_000,
            mss,
            ca_accum: 0.0,
            history: vec![initial_window],
        }
    }

    pub fn history(&self) -> &[u64] {
        &self.history
    }

    /// Applies a new-ACK increase for `acked` freshly-confirmed bytes.
    pub fn on_new_ack(&mut self, acked: u64) {
        if self.window < self.threshold {
            self.window += acked;
        } else {
            self.ca_accum += self.mss as f64 * acked as f64 / self.window as f64;
            while self.ca_accum >= self.mss as f64 {
                self.ca_accum -= self.mss as f64;
                self.window += self.mss;
            }
        }
        self.history.push(self.window);
    }

    /// Timeout or 3rd duplicate ACK: halve (floor mss) and reset.
    pub fn on_loss(&mut self) {
        self.threshold = (self.window / 2).max(self.mss);
        self.window = self.mss;
        self.ca_accum = 0.0;
        self.history.push(self.window);
    }
}

/// Tracks the last three observed cumulative ACK numbers to detect a
/// fast-retransmit trigger (three consecutive identical values).
#[derive(Debug, Clone, Default)]
struct DupAckHistory {
    history: VecDeque<u64>,
}

impl DupAckHistory {
    fn observe(&mut self, ack_number: u64) -> bool {
        self.history.push_back(ack_number);
        if self.history.len() > 3 {
            self.history.pop_front();
        }
        self.history.len() == 3 && self.history.iter().all(|&a| a == ack_number)
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Idle,
    Sending,
    Retransmitting,
}

/// A full TCP-Reno-style connection endpoint: sender window/RTO state,
/// Reno congestion control, RFC 6298 RTT estimation with Karn's
/// algorithm, fast retransmit, and an in-order byte-stream receiver.
pub struct TcpConnection {
    pub id: ConnId,
    pub source_address: Address,
    pub source_port: Port,
    pub destination_address: Address,
    pub destination_port: Port,

    pub mss: u64,
    send_buffer: SendBuffer,
    receive_buffer: ReceiveBuffer,
    cwnd: CongestionWindow,
    rtt: RttEstimator,
    dup_acks: DupAckHistory,

    /// Highest ACK received so far (cumulative ACK boundary).
    pub sequence: u64,
    /// Next in-order byte expected from the peer.
    pub ack: u64,

    state: TcpState,
    retransmitting: bool,
    /// Byte offset below which every segment has been transmitted
    /// exactly once; set on a retransmit to the covered segment's end
    /// so ACKs for anything below it are excluded from RTT sampling
    /// (Karn's algorithm), without needing a per-packet flag.
    high_water_retransmitted: u64,

    timer: Option<SchedulerHandle>,
}

impl TcpConnection {
    pub fn new(
        id: ConnId,
        source_address: Address,
        source_port: Port,
        destination_address: Address,
        destination_port: Port,
        window: u64,
    ) -> Self {
        Self {
            id,
            source_address,
            source_port,
            destination_address,
            destination_port,
            mss: DEFAULT_MSS,
            send_buffer: SendBuffer::new(),
            receive_buffer: ReceiveBuffer::new(),
            cwnd: CongestionWindow::new(window, DEFAULT_MSS),
            rtt: RttEstimator::new(),
            dup_acks: DupAckHistory::default(),
            sequence: 0,
            ack: 0,
            state: TcpState::Idle,
            retransmitting: false,
            high_water_retransmitted: 0,
            timer: None,
        }
    }

    pub fn window(&self) -> u64 {
        self.cwnd.window
    }

    pub fn threshold(&self) -> u64 {
        self.cwnd.threshold
    }

    pub fn rto(&self) -> f64 {
        self.rtt.rto
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn has_timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    pub fn window_history(&self) -> &[u64] {
        self.cwnd.history()
    }

    /// Application call: append to the send buffer and try to emit.
    /// Returns the packets to hand to Transport.
    pub fn send(&mut self, data: &[u8], now: f64, scheduler: &mut Scheduler<SimEvent>) -> Vec<Packet> {
        self.send_buffer.put(data);
        self.emit(now, scheduler)
    }

    fn emit(&mut self, now: f64, scheduler: &mut Scheduler<SimEvent>) -> Vec<Packet> {
        let mut out = Vec::new();
        while self.send_buffer.available() > 0 && self.send_buffer.outstanding() < self.cwnd.window {
            let Some((data, sequence)) = self.send_buffer.get(self.mss as usize) else {
                break;
            };
            out.push(self.make_packet(data, sequence, now));
            self.state = TcpState::Sending;
            self.restart_timer(scheduler);
        }
        out
    }

    fn make_packet(&self, data: Vec<u8>, sequence: u64, now: f64) -> Packet {
        Packet::new(
            self.source_address,
            self.source_port,
            self.destination_address,
            self.destination_port,
            sequence,
            self.ack,
            data,
            now,
        )
    }

    /// Dispatches an inbound packet to ACK and/or data handling, mirroring
    /// how a packet may piggyback both in the same segment.
    pub fn receive_packet(
        &mut self,
        packet: &Packet,
        now: f64,
        scheduler: &mut Scheduler<SimEvent>,
    ) -> TcpOutcome {
        let mut outcome = TcpOutcome::default();
        if packet.ack_number > 0 {
            outcome.outgoing.extend(self.handle_ack(packet, now, scheduler));
        }
        if packet.length() > 0 {
            let (delivered, ack_packet) = self.handle_data(packet);
            outcome.delivered = delivered;
            outcome.outgoing.push(ack_packet);
        }
        outcome
    }

    fn handle_ack(&mut self, packet: &Packet, now: f64, scheduler: &mut Scheduler<SimEvent>) -> Vec<Packet> {
        let ack_number = packet.ack_number;
        let rtt_sample = now - packet.sent_time;

        self.send_buffer
            .slide(ack_number)
            .expect("ack_number is bounded by what the sender has sent");
        let acked = ack_number.saturating_sub(self.sequence);
        self.sequence = ack_number;

        if self.send_buffer.outstanding() == 0 && self.send_buffer.available() == 0 {
            self.cancel_timer(scheduler);
            self.state = TcpState::Idle;
            return Vec::new();
        }

        if self.dup_acks.observe(ack_number) && !self.retransmitting {
            trace!(target: "tcp", conn = self.id.0, ack = ack_number, "fast retransmit");
            return self.retransmit(now, scheduler);
        }

        if acked == 0 {
            // Duplicate ACK that didn't trigger fast retransmit (fewer than
            // three in a row, or one arriving after retransmission already
            // started): no cumulative advance, so neither cwnd nor the RTT
            // estimator should see it.
            return Vec::new();
        }

        self.retransmitting = false;
        self.state = TcpState::Sending;
        if acked > 0 {
            self.dup_acks.reset();
        }
        self.cwnd.on_new_ack(acked);

        let mut out = self.emit(now, scheduler);

        if ack_number > self.high_water_retransmitted {
            self.rtt.sample(rtt_sample);
        }
        self.restart_timer(scheduler);

        out
    }

    fn handle_data(&mut self, packet: &Packet) -> (Vec<u8>, Packet) {
        self.receive_buffer.put(&packet.body, packet.sequence);
        let (delivered, head) = self.receive_buffer.get();
        self.ack = head;

        // sent_time is echoed from the triggering data packet so the
        // sender's RTT sample covers this exact round trip.
        let ack_packet = Packet::new(
            self.source_address,
            self.source_port,
            self.destination_address,
            self.destination_port,
            self.sequence,
            self.ack,
            Vec::new(),
            packet.sent_time,
        );
        (delivered, ack_packet)
    }

    /// Timer expiry OR fast retransmit: exponential backoff, resend the
    /// oldest outstanding segment, and execute a Reno loss event.
    fn retransmit(&mut self, now: f64, scheduler: &mut Scheduler<SimEvent>) -> Vec<Packet> {
        self.rtt.backoff();
        self.retransmitting = true;
        self.state = TcpState::Retransmitting;

        let (data, sequence) = match self.send_buffer.resend(self.mss as usize) {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        };
        self.high_water_retransmitted = sequence + data.len() as u64;
        let packet = self.make_packet(data, sequence, now);

        self.cwnd.on_loss();
        self.dup_acks.reset();
        self.start_timer(scheduler);

        vec![packet]
    }

    /// Scheduler-driven retransmission timeout. `covers_seq` is ignored
    /// beyond matching against what's currently outstanding: if nothing
    /// is outstanding any more (the timer popped after everything it
    /// covered was already ACKed), this fire is stale and is dropped.
    pub fn on_retransmit_timeout(
        &mut self,
        covers_seq: u64,
        now: f64,
        scheduler: &mut Scheduler<SimEvent>,
    ) -> Vec<Packet> {
        if self.timer.is_none() || self.send_buffer.outstanding() == 0 {
            return Vec::new();
        }
        let _ = covers_seq;
        self.timer = None;
        self.retransmit(now, scheduler)
    }

    fn restart_timer(&mut self, scheduler: &mut Scheduler<SimEvent>) {
        if self.send_buffer.available() == 0 && self.send_buffer.outstanding() == 0 {
            self.cancel_timer(scheduler);
        } else {
            self.start_timer(scheduler);
        }
    }

    fn start_timer(&mut self, scheduler: &mut Scheduler<SimEvent>) {
        if let Some(handle) = self.timer.take() {
            scheduler.cancel(handle);
        }
        let covers_seq = self.send_buffer.base();
        let handle = scheduler
            .add(
                self.rtt.rto,
                SimEvent::RetransmitTimeout {
                    conn: self.id,
                    covers_seq,
                },
            )
            .expect("rto is always non-negative");
        self.timer = Some(handle);
    }

    fn cancel_timer(&mut self, scheduler: &mut Scheduler<SimEvent>) {
        if let Some(handle) = self.timer.take() {
            scheduler.cancel(handle);
        }
    }
}

/// Everything a single inbound packet caused: bytes newly delivered to
/// the application (if any) and packets to hand back to Transport.
#[derive(Debug, Default)]
pub struct TcpOutcome {
    pub delivered: Vec<u8>,
    pub outgoing: Vec<Packet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rtt_estimator_first_sample_matches_worked_example() {
        let mut rtt = RttEstimator::new();
        rtt.sample(0.2);
        assert!((rtt.srtt - 0.2).abs() < 1e-9);
        assert!((rtt.rttvar - 0.1).abs() < 1e-9);
        assert!((rtt.rto - 1.0).abs() < 1e-9); // 0.2+4*0.1=0.6, clamped up to rto_min=1
    }

    #[test]
    fn rtt_estimator_stays_within_bounds_after_many_samples() {
        let mut rtt = RttEstimator::new();
        for i in 0..50 {
            rtt.sample(0.01 + (i as f64) * 5.0);
            assert!(rtt.rto >= RTO_MIN && rtt.rto <= RTO_MAX);
        }
    }

    #[test]
    fn backoff_doubles_and_clamps_at_rto_max() {
        let mut rtt = RttEstimator::new();
        rtt.sample(30.0);
        for _ in 0..10 {
            rtt.backoff();
        }
        assert!((rtt.rto - RTO_MAX).abs() < 1e-9);
    }

    #[test]
    fn slow_start_increments_window_by_full_acked_bytes() {
        let mut cwnd = CongestionWindow::new(1000, 1000);
        cwnd.threshold = 100_000;
        cwnd.on_new_ack(1000);
        assert_eq!(cwnd.window, 2000);
    }

    #[test]
    fn loss_event_halves_threshold_and_resets_window_to_mss() {
        let mut cwnd = CongestionWindow::new(8000, 1000);
        cwnd.on_loss();
        assert_eq!(cwnd.threshold, 4000);
        assert_eq!(cwnd.window, 1000);
    }

    #[test]
    fn loss_event_floors_threshold_at_mss() {
        let mut cwnd = CongestionWindow::new(500, 1000);
        cwnd.on_loss();
        assert_eq!(cwnd.threshold, 1000);
    }

    #[test]
    fn dup_ack_history_fires_on_exactly_third_match() {
        let mut h = DupAckHistory::default();
        assert!(!h.observe(2000));
        assert!(!h.observe(2000));
        assert!(h.observe(2000));
        // a 4th identical ack does not re-fire the same history window incorrectly:
        // once reset, it takes three fresh matches again.
        h.reset();
        assert!(!h.observe(2000));
    }

    #[test]
    fn dup_ack_history_does_not_fire_on_varying_acks() {
        let mut h = DupAckHistory::default();
        assert!(!h.observe(1000));
        assert!(!h.observe(2000));
        assert!(!h.observe(2000));
    }

    #[test]
    fn clean_transfer_end_to_end_window_and_sequence() {
        let mut sched: Scheduler<SimEvent> = Scheduler::new();
        let mut sender = TcpConnection::new(ConnId(0), 1, 5000, 2, 5000, 10_000);
        let mut receiver = TcpConnection::new(ConnId(1), 2, 5000, 1, 5000, 10_000);

        let payload = vec![7u8; 5000];
        let packets = sender.send(&payload, 0.0, &mut sched);
        assert_eq!(packets.len(), 5);

        let mut delivered = Vec::new();
        for p in packets {
            let outcome = receiver.receive_packet(&p, p.sent_time + 0.01, &mut sched);
            delivered.extend(outcome.delivered);
            for ack in outcome.outgoing {
                let sender_outcome = sender.receive_packet(&ack, ack.sent_time + 0.01, &mut sched);
                assert!(sender_outcome.outgoing.is_empty());
            }
        }

        assert_eq!(delivered, payload);
        assert_eq!(sender.sequence, 5000);
    }
}
