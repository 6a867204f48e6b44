use serde::Deserialize;

use crate::config::SimulatorConfig;

/// A self-contained scenario file: config overrides plus a list of timed
/// actions and pass/fail assertions, loaded from TOML. Lets an
/// end-to-end network scenario be expressed as data instead of
/// hand-written driver code.
#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub config: SimConfigOverride,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimConfigOverride {
    pub seed: Option<u64>,
    pub default_mss: Option<u64>,
    pub default_window: Option<u64>,
}

impl SimConfigOverride {
    pub fn apply_to(&self, config: &mut SimulatorConfig) {
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.default_mss {
            config.default_mss = v;
        }
        if let Some(v) = self.default_window {
            config.default_window = v;
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAction {
    /// Application sends bytes on a named connection at simulated time `time`.
    AppSend {
        connection: String,
        time: f64,
        data: String,
    },
    /// Deterministically drop the next packet sent with the given sequence.
    DropNextSeq { seq: u64 },
    /// Deterministically drop the next ACK sent with the given ack number.
    DropNextAck { ack: u64 },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    DataDelivered { connection: String, data: String },
    SenderPacketCount { min: u64, max: Option<u64> },
    WindowMax { min: u64, max: Option<u64> },
    WindowDrop { from_at_least: u64, to_at_most: u64 },
    MaxDuration { seconds: f64 },
}
