use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use netsim_core::app::{Application, CollectingApplication};
use netsim_core::Simulation;
use netsim_types::{ConnId, SimulatorConfig, TestAction, TestAssertion, TestScenario};

/// Default one-hop topology a scenario runs over unless it names its own.
const DEFAULT_BANDWIDTH: f64 = 1_000_000.0;
const DEFAULT_PROPAGATION: f64 = 0.001;
const DEFAULT_WINDOW: u64 = 10_000;

#[derive(Default)]
struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl Application for SharedSink {
    fn receive_data(&mut self, data: &[u8]) {
        self.0.borrow_mut().extend_from_slice(data);
    }
}

/// Result of running one [`TestScenario`]: every assertion's verdict,
/// plus whether the run passed overall.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub passed: bool,
    pub failures: Vec<String>,
}

/// Runs a scenario end to end against a fresh two-node point-to-point
/// `Simulation` and evaluates its assertions. One TCP connection (plus
/// its receiver-side peer) is created per distinct connection name
/// referenced by the scenario's actions/assertions.
pub fn run_scenario(scenario: &TestScenario) -> Result<ScenarioOutcome> {
    let mut config = SimulatorConfig::default();
    scenario.config.apply_to(&mut config);

    let mut sim = Simulation::new(config);
    let sender_node = sim.add_node();
    let receiver_node = sim.add_node();
    let forward = sim.add_link(sender_node, receiver_node, 2, 1, DEFAULT_BANDWIDTH, DEFAULT_PROPAGATION, None, 0.0);
    let backward = sim.add_link(receiver_node, sender_node, 1, 2, DEFAULT_BANDWIDTH, DEFAULT_PROPAGATION, None, 0.0);

    let mut conn_ids: HashMap<String, ConnId> = HashMap::new();
    let mut received: HashMap<String, Rc<RefCell<Vec<u8>>>> = HashMap::new();
    let mut next_port: u16 = 1;

    let names = connection_names(scenario);
    for name in &names {
        let port = next_port;
        next_port += 1;

        let sink = Rc::new(RefCell::new(Vec::new()));
        received.insert(name.clone(), sink.clone());

        let sender_conn = sim.add_connection(
            sender_node,
            2,
            port,
            1,
            port,
            DEFAULT_WINDOW,
            Box::new(CollectingApplication::new()),
        );
        sim.add_connection(
            receiver_node,
            1,
            port,
            2,
            port,
            DEFAULT_WINDOW,
            Box::new(SharedSink(sink)),
        );
        conn_ids.insert(name.clone(), sender_conn);
    }

    for action in &scenario.actions {
        apply_action(&mut sim, action, &conn_ids, forward, backward)
            .with_context(|| format!("applying action {action:?}"))?;
    }

    sim.run_until_complete();

    let mut failures = Vec::new();
    for assertion in &scenario.assertions {
        if let Err(reason) = check_assertion(&sim, assertion, &conn_ids, &received) {
            failures.push(reason);
        }
    }

    Ok(ScenarioOutcome {
        passed: failures.is_empty(),
        failures,
    })
}

fn connection_names(scenario: &TestScenario) -> Vec<String> {
    let mut names = Vec::new();
    for action in &scenario.actions {
        if let TestAction::AppSend { connection, .. } = action {
            if !names.contains(connection) {
                names.push(connection.clone());
            }
        }
    }
    for assertion in &scenario.assertions {
        if let TestAssertion::DataDelivered { connection, .. } = assertion {
            if !names.contains(connection) {
                names.push(connection.clone());
            }
        }
    }
    if names.is_empty() {
        names.push("default".to_string());
    }
    names
}

fn apply_action(
    sim: &mut Simulation,
    action: &TestAction,
    conn_ids: &HashMap<String, ConnId>,
    forward: netsim_types::LinkId,
    _backward: netsim_types::LinkId,
) -> Result<()> {
    match action {
        TestAction::AppSend { connection, time, data } => {
            let conn = *conn_ids
                .get(connection)
                .with_context(|| format!("unknown connection '{connection}'"))?;
            sim.schedule_app_send(*time, conn, data.clone().into_bytes());
        }
        TestAction::DropNextSeq { seq } => {
            let target = *seq;
            sim.set_force_drop(forward, Box::new(move |p| p.sequence == target));
        }
        TestAction::DropNextAck { ack } => {
            let target = *ack;
            sim.set_force_drop(forward, Box::new(move |p| p.ack_number == target));
        }
    }
    Ok(())
}

fn check_assertion(
    sim: &Simulation,
    assertion: &TestAssertion,
    conn_ids: &HashMap<String, ConnId>,
    received: &HashMap<String, Rc<RefCell<Vec<u8>>>>,
) -> std::result::Result<(), String> {
    match assertion {
        TestAssertion::DataDelivered { connection, data } => {
            let sink = received
                .get(connection)
                .ok_or_else(|| format!("unknown connection '{connection}'"))?;
            let got = sink.borrow();
            if got.as_slice() == data.as_bytes() {
                Ok(())
            } else {
                Err(format!(
                    "connection '{connection}': expected {} bytes delivered, got {}",
                    data.len(),
                    got.len()
                ))
            }
        }
        TestAssertion::SenderPacketCount { min, max } => {
            let count = sim.data_packets_sent();
            check_bounds("sender packet count", count, *min, *max)
        }
        TestAssertion::WindowMax { min, max } => {
            let conn = first_conn(conn_ids)?;
            let observed = sim.connection(conn).window_history().iter().copied().max().unwrap_or(0);
            check_bounds("window max", observed, *min, *max)
        }
        TestAssertion::WindowDrop { from_at_least, to_at_most } => {
            let conn = first_conn(conn_ids)?;
            let history = sim.connection(conn).window_history();
            let dropped = history
                .windows(2)
                .any(|pair| pair[0] >= *from_at_least && pair[1] <= *to_at_most);
            if dropped {
                Ok(())
            } else {
                Err(format!(
                    "expected a window drop from >= {from_at_least} to <= {to_at_most}, history was {history:?}"
                ))
            }
        }
        TestAssertion::MaxDuration { seconds } => {
            if sim.current_time() <= *seconds {
                Ok(())
            } else {
                Err(format!(
                    "simulation ran for {}s, exceeding the {}s budget",
                    sim.current_time(),
                    seconds
                ))
            }
        }
    }
}

fn first_conn(conn_ids: &HashMap<String, ConnId>) -> std::result::Result<ConnId, String> {
    conn_ids
        .values()
        .next()
        .copied()
        .ok_or_else(|| "scenario defines no connections".to_string())
}

fn check_bounds(label: &str, value: u64, min: u64, max: Option<u64>) -> std::result::Result<(), String> {
    if value < min {
        return Err(format!("{label}: {value} is below minimum {min}"));
    }
    if let Some(max) = max {
        if value > max {
            return Err(format!("{label}: {value} exceeds maximum {max}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_toml(body: &str) -> TestScenario {
        toml::from_str(body).expect("valid scenario toml")
    }

    #[test]
    fn clean_transfer_scenario_passes() {
        let scenario = scenario_toml(
            r#"
            name = "clean-transfer"
            description = "small payload, no loss"

            [[actions]]
            type = "app_send"
            connection = "flow"
            time = 0.0
            data = "hello network"

            [[assertions]]
            type = "data_delivered"
            connection = "flow"
            data = "hello network"
            "#,
        );
        let outcome = run_scenario(&scenario).unwrap();
        assert!(outcome.passed, "failures: {:?}", outcome.failures);
    }

    #[test]
    fn forced_drop_is_recovered_by_retransmission() {
        let scenario = scenario_toml(
            r#"
            name = "single-drop-recovered"
            description = "force one drop, expect eventual delivery"

            [[actions]]
            type = "drop_next_seq"
            seq = 0

            [[actions]]
            type = "app_send"
            connection = "flow"
            time = 0.0
            data = "retransmit me please"

            [[assertions]]
            type = "data_delivered"
            connection = "flow"
            data = "retransmit me please"
            "#,
        );
        let outcome = run_scenario(&scenario).unwrap();
        assert!(outcome.passed, "failures: {:?}", outcome.failures);
    }
}
