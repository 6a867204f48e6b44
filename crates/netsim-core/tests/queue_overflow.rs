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

/// Two connections share one slow, shallow-queued link and both push 20
/// back-to-back segments. The link must drop some of them to queue
/// overflow, and both flows must still fully recover via retransmission.
#[test]
fn two_senders_saturate_a_slow_link_and_still_deliver_everything() {
    let mut sim = Simulation::new(SimulatorConfig::default());
    let sender = sim.add_node();
    let receiver = sim.add_node();
    sim.add_link(sender, receiver, 1, 2, 100_000.0, 0.001, Some(3), 0.0);
    sim.add_link(receiver, sender, 2, 1, 100_000.0, 0.001, Some(3), 0.0);

    let payload_a = vec![1u8; 20_000];
    let payload_b = vec![2u8; 20_000];

    let conn_a = sim.add_connection(sender, 1, 7000, 2, 7000, 20_000, Box::new(CollectingApplication::new()));
    let sink_a = Rc::new(RefCell::new(Vec::new()));
    sim.add_connection(receiver, 2, 7000, 1, 7000, 20_000, Box::new(SharedSink(sink_a.clone())));

    let conn_b = sim.add_connection(sender, 1, 7001, 2, 7001, 20_000, Box::new(CollectingApplication::new()));
    let sink_b = Rc::new(RefCell::new(Vec::new()));
    sim.add_connection(receiver, 2, 7001, 1, 7001, 20_000, Box::new(SharedSink(sink_b.clone())));

    sim.app_send_now(conn_a, payload_a.clone());
    sim.app_send_now(conn_b, payload_b.clone());
    sim.run_until_complete();

    assert_eq!(*sink_a.borrow(), payload_a);
    assert_eq!(*sink_b.borrow(), payload_b);
    assert!(
        sim.data_packets_sent() > 40,
        "expected retransmissions above the 40 original segments, got {}",
        sim.data_packets_sent()
    );
}
