use netsim_types::{Address, ConnId, DropReason, LinkId, NodeId, Packet, Port, SimulatorConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace};

use crate::app::Application;
use crate::event::SimEvent;
use crate::link::{ForceDropPredicate, Link};
use crate::node::Node;
use crate::scheduler::Scheduler;
use crate::tcp::TcpConnection;
use crate::trace_writer::TraceWriter;
use crate::transport::{Transport, TransportKey};

/// The top-level orchestrator: owns the event scheduler plus arenas of
/// every component it dispatches events to. Nothing outside this struct
/// holds a cyclic reference; everything communicates by the id types in
/// `netsim_types::ids`, indexed into these arenas at event-fire time.
pub struct Simulation {
    pub config: SimulatorConfig,
    scheduler: Scheduler<SimEvent>,
    rng: StdRng,

    nodes: Vec<Node>,
    links: Vec<Link>,
    transports: Vec<Transport>,
    connections: Vec<TcpConnection>,
    conn_home_node: Vec<NodeId>,
    conn_app: Vec<Box<dyn Application>>,
    data_packets_sent: u64,

    trace: Option<TraceWriter<std::fs::File>>,
}

impl Simulation {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            scheduler: Scheduler::new(),
            rng,
            nodes: Vec::new(),
            links: Vec::new(),
            transports: Vec::new(),
            connections: Vec::new(),
            conn_home_node: Vec::new(),
            conn_app: Vec::new(),
            data_packets_sent: 0,
            trace: None,
        }
    }

    pub fn with_trace_file(mut self, file: std::fs::File) -> Self {
        self.trace = Some(TraceWriter::new(file));
        self
    }

    pub fn current_time(&self) -> f64 {
        self.scheduler.current_time()
    }

    /// Total number of data (non-ACK) segments sent across every
    /// connection so far, retries included.
    pub fn data_packets_sent(&self) -> u64 {
        self.data_packets_sent
    }

    pub fn connection(&self, conn: ConnId) -> &TcpConnection {
        &self.connections[conn.0 as usize]
    }

    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(id));
        self.transports.push(Transport::new());
        id
    }

    /// Adds a one-way link `start -> end`. `start_address` is the
    /// address `start` advertises on this link; `end_address` is the
    /// address `end` owns and that `start` will route toward. Building a
    /// duplex pair between two hosts means calling this twice, once in
    /// each direction.
    #[allow(clippy::too_many_arguments)]
    pub fn add_link(
        &mut self,
        start: NodeId,
        end: NodeId,
        start_address: Address,
        end_address: Address,
        bandwidth: f64,
        propagation: f64,
        queue_size: Option<usize>,
        loss: f64,
    ) -> LinkId {
        let id = LinkId(self.links.len() as u32);
        let link = Link::new(
            id,
            start_address,
            start,
            end,
            bandwidth,
            propagation,
            queue_size,
            loss,
        );
        self.links.push(link);
        self.nodes[start.0 as usize].add_local_address(start_address);
        self.nodes[end.0 as usize].add_local_address(end_address);
        self.nodes[start.0 as usize].add_route(end_address, id);
        id
    }

    pub fn set_force_drop(&mut self, link: LinkId, pred: ForceDropPredicate) {
        self.links[link.0 as usize].set_force_drop(pred);
    }

    pub fn set_link_down(&mut self, link: LinkId) {
        self.links[link.0 as usize].down();
    }

    pub fn set_link_up(&mut self, link: LinkId) {
        self.links[link.0 as usize].up();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_connection(
        &mut self,
        home_node: NodeId,
        source_address: Address,
        source_port: Port,
        destination_address: Address,
        destination_port: Port,
        window: u64,
        app: Box<dyn Application>,
    ) -> ConnId {
        let id = ConnId(self.connections.len() as u32);
        let mut conn = TcpConnection::new(
            id,
            source_address,
            source_port,
            destination_address,
            destination_port,
            window,
        );
        conn.mss = self.config.default_mss;
        self.connections.push(conn);
        self.conn_home_node.push(home_node);
        self.conn_app.push(app);

        self.transports[home_node.0 as usize].register(
            TransportKey {
                local_port: source_port,
                remote_port: destination_port,
                remote_address: destination_address,
            },
            id,
        );
        id
    }

    /// Immediately pushes `data` into a connection's send buffer and
    /// routes whatever it emits. Use for driving a scenario at the
    /// current scheduler time, e.g. from `run()`'s setup phase.
    pub fn app_send_now(&mut self, conn: ConnId, data: Vec<u8>) {
        let now = self.scheduler.current_time();
        let packets = self.connections[conn.0 as usize].send(&data, now, &mut self.scheduler);
        self.route_outgoing(conn, packets);
    }

    /// Schedules a future application send, for scenario-driven staggered
    /// flow starts.
    pub fn schedule_app_send(&mut self, delay: f64, conn: ConnId, data: Vec<u8>) {
        self.scheduler
            .add(delay, SimEvent::AppSend { conn, data })
            .expect("scenario-provided delay must be non-negative");
    }

    /// Runs every scheduled event to completion.
    pub fn run_until_complete(&mut self) {
        while self.step() {}
    }

    /// Pops and dispatches exactly one event. Returns `false` once the
    /// event queue is empty.
    pub fn step(&mut self) -> bool {
        let Some((now, event)) = self.scheduler.pop_next() else {
            return false;
        };
        match event {
            SimEvent::LinkDequeue { link } => {
                self.links[link.0 as usize].on_dequeue(now, &mut self.scheduler);
            }
            SimEvent::LinkArrival { link, packet } => {
                let endpoint = self.links[link.0 as usize].endpoint;
                self.node_receive(endpoint, packet, now);
            }
            SimEvent::RetransmitTimeout { conn, covers_seq } => {
                let packets = self.connections[conn.0 as usize]
                    .on_retransmit_timeout(covers_seq, now, &mut self.scheduler);
                self.route_outgoing(conn, packets);
            }
            SimEvent::AppSend { conn, data } => {
                let packets = self.connections[conn.0 as usize].send(&data, now, &mut self.scheduler);
                self.route_outgoing(conn, packets);
            }
        }
        true
    }

    fn node_receive(&mut self, node: NodeId, packet: Packet, now: f64) {
        if self.nodes[node.0 as usize].is_local(packet.destination_address) {
            self.deliver_to_transport(node, packet, now);
            return;
        }
        match self.nodes[node.0 as usize].route_for(packet.destination_address) {
            Some(link) => {
                self.send_on_link(link, packet, now);
            }
            None => {
                trace!(target: "link", dest = packet.destination_address, "forwarding miss");
            }
        }
    }

    fn deliver_to_transport(&mut self, node: NodeId, packet: Packet, now: f64) {
        let key = TransportKey {
            local_port: packet.destination_port,
            remote_port: packet.source_port,
            remote_address: packet.source_address,
        };
        let Some(conn) = self.transports[node.0 as usize].lookup(key) else {
            trace!(target: "tcp", "no connection matches inbound packet");
            return;
        };

        if packet.ack_number > 0 {
            if let Some(writer) = &mut self.trace {
                let _ = writer.record_ack(now, packet.ack_number);
            }
        }

        let outcome = self.connections[conn.0 as usize].receive_packet(&packet, now, &mut self.scheduler);
        if !outcome.delivered.is_empty() {
            self.conn_app[conn.0 as usize].receive_data(&outcome.delivered);
        }
        self.route_outgoing(conn, outcome.outgoing);
    }

    fn route_outgoing(&mut self, conn: ConnId, packets: Vec<Packet>) {
        let home = self.conn_home_node[conn.0 as usize];
        for packet in packets {
            let now = self.scheduler.current_time();
            let is_data = packet.length() > 0;
            if is_data {
                self.data_packets_sent += 1;
                if let Some(writer) = &mut self.trace {
                    let _ = writer.record_sent(now, packet.sequence);
                }
            }
            match self.nodes[home.0 as usize].route_for(packet.destination_address) {
                Some(link) => self.send_on_link_traced(link, packet, now, is_data),
                None => {
                    debug!(dest = packet.destination_address, "no route for outgoing packet");
                }
            }
        }
    }

    fn send_on_link(&mut self, link: LinkId, packet: Packet, now: f64) {
        let is_data = packet.length() > 0;
        self.send_on_link_traced(link, packet, now, is_data);
    }

    fn send_on_link_traced(&mut self, link: LinkId, packet: Packet, now: f64, is_data: bool) {
        let sequence = packet.sequence;
        let dropped = self.links[link.0 as usize].send_packet(packet, now, &mut self.rng, &mut self.scheduler);
        if let Some(reason) = dropped {
            self.trace_drop(now, sequence, reason, is_data);
        }
    }

    fn trace_drop(&mut self, now: f64, sequence: u64, reason: DropReason, is_data: bool) {
        trace!(target: "link", seq = sequence, reason = reason.as_str(), "dropped");
        if is_data {
            if let Some(writer) = &mut self.trace {
                let _ = writer.record_dropped(now, sequence);
            }
        }
    }
}
