use std::cell::RefCell;
use std::rc::Rc;

use netsim_core::app::{Application, CollectingApplication};
use netsim_core::Simulation;
use netsim_types::SimulatorConfig;
use netsim_topo::{build, parse};

#[derive(Default)]
struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl Application for SharedSink {
    fn receive_data(&mut self, data: &[u8]) {
        self.0.borrow_mut().extend_from_slice(data);
    }
}

const TOPOLOGY: &str = "\
# two hosts, one hop
node A
node B
link A B bandwidth=1000000 propagation=0.001 queue_size=8 loss=0.0
address A B 1
address B A 2
";

#[test]
fn a_parsed_topology_carries_a_real_tcp_transfer() {
    let topo = parse(TOPOLOGY).unwrap();
    let mut sim = Simulation::new(SimulatorConfig::default());
    let nodes = build(&topo, &mut sim).unwrap();

    let a = nodes["A"];
    let b = nodes["B"];

    let sender_conn = sim.add_connection(a, 1, 4000, 2, 4000, 10_000, Box::new(CollectingApplication::new()));
    let received = Rc::new(RefCell::new(Vec::new()));
    sim.add_connection(b, 2, 4000, 1, 4000, 10_000, Box::new(SharedSink(received.clone())));

    let payload = vec![11u8; 4000];
    sim.app_send_now(sender_conn, payload.clone());
    sim.run_until_complete();

    assert_eq!(*received.borrow(), payload);
}
