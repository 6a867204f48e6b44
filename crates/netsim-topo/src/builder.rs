use std::collections::HashMap;

use netsim_core::Simulation;
use netsim_types::NodeId;
use tracing::debug;

use crate::error::TopologyError;
use crate::parser::Topology;

/// Materializes a parsed [`Topology`] into a [`Simulation`]: one
/// `add_node` per declared host, and two directed links per `link`
/// directive (one in each direction), addressed per the `address`
/// table. Returns the hostname → `NodeId` mapping so the caller can wire
/// up connections and application handlers.
pub fn build(topo: &Topology, sim: &mut Simulation) -> Result<HashMap<String, NodeId>, TopologyError> {
    let mut node_ids = HashMap::new();
    for host in &topo.nodes {
        node_ids.insert(host.clone(), sim.add_node());
    }
    debug!(hosts = node_ids.len(), links = topo.links.len(), "building topology");

    for spec in &topo.links {
        let a_id = node_ids[&spec.a];
        let b_id = node_ids[&spec.b];
        let a_addr = address_of(topo, &spec.a, &spec.b)?;
        let b_addr = address_of(topo, &spec.b, &spec.a)?;

        sim.add_link(
            a_id,
            b_id,
            a_addr,
            b_addr,
            spec.bandwidth,
            spec.propagation,
            spec.queue_size,
            spec.loss,
        );
        sim.add_link(
            b_id,
            a_id,
            b_addr,
            a_addr,
            spec.bandwidth,
            spec.propagation,
            spec.queue_size,
            spec.loss,
        );
    }

    Ok(node_ids)
}

fn address_of(topo: &Topology, host: &str, peer: &str) -> Result<u32, TopologyError> {
    topo.addresses
        .get(&(host.to_string(), peer.to_string()))
        .copied()
        .ok_or_else(|| TopologyError::MissingAddress {
            host: host.to_string(),
            peer: peer.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use netsim_types::SimulatorConfig;

    #[test]
    fn builds_two_directed_links_per_undirected_spec() {
        let text = "\
node A
node B
link A B bandwidth=1000000 propagation=0.001
address A B 1
address B A 2
";
        let topo = parse(text).unwrap();
        let mut sim = Simulation::new(SimulatorConfig::default());
        let ids = build(&topo, &mut sim).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains_key("A"));
        assert!(ids.contains_key("B"));
    }

    #[test]
    fn missing_address_is_a_build_error() {
        let text = "node A\nnode B\nlink A B bandwidth=1000 propagation=0.0\n";
        let topo = parse(text).unwrap();
        let mut sim = Simulation::new(SimulatorConfig::default());
        assert!(build(&topo, &mut sim).is_err());
    }
}
