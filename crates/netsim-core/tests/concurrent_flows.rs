use std::cell::RefCell;
use std::rc::Rc;

use netsim_core::app::{Application, CollectingApplication};
use netsim_core::Simulation;
use netsim_types::SimulatorConfig;

#[derive(Default)]
struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl Application for SharedSink {
    fn receive_data(&mut self, data: &[u8]) {
        self.0.borrow_mut().extend_from_slice(data);
    }
}

const STAGGER: [f64; 5] = [0.0, 0.1, 0.2, 0.3, 0.4];

/// Five connections transfer the same file over a lossy shared link with
/// staggered start times; every flow must still arrive byte-identical and
/// the run must terminate in finite simulated time.
#[test]
fn five_staggered_flows_over_a_lossy_link_all_arrive_intact() {
    let mut sim = Simulation::new(SimulatorConfig::default());
    let sender = sim.add_node();
    let receiver = sim.add_node();
    sim.add_link(sender, receiver, 1, 2, 1_000_000.0, 0.001, None, 0.01);
    sim.add_link(receiver, sender, 2, 1, 1_000_000.0, 0.001, None, 0.01);

    let payload = vec![3u8; 10_000];
    let mut sinks = Vec::new();
    let mut conns = Vec::new();

    for (i, delay) in STAGGER.iter().enumerate() {
        let port = 6000 + i as u16;
        let conn = sim.add_connection(sender, 1, port, 2, port, 10_000, Box::new(CollectingApplication::new()));
        let sink = Rc::new(RefCell::new(Vec::new()));
        sim.add_connection(receiver, 2, port, 1, port, 10_000, Box::new(SharedSink(sink.clone())));
        sim.schedule_app_send(*delay, conn, payload.clone());
        conns.push(conn);
        sinks.push(sink);
    }

    sim.run_until_complete();

    assert!(sim.current_time().is_finite());
    for (conn, sink) in conns.iter().zip(sinks.iter()) {
        assert_eq!(*sink.borrow(), payload, "flow on connection {conn:?} lost or corrupted bytes");
    }
}
