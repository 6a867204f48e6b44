use serde::{Deserialize, Serialize};

/// Simulation-wide knobs that are not already expressed per-link.
///
/// Per-link properties (bandwidth, propagation, queue size, loss) live on
/// the topology's [`Link`](../../netsim_core/link/struct.Link.html)
/// records instead; this struct only carries things that apply to the
/// run as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Seeds the RNG driving per-link random loss decisions.
    pub seed: u64,
    /// Default maximum segment size for new TCP connections, in bytes.
    pub default_mss: u64,
    /// Default congestion window a new TCP connection starts at, in bytes.
    pub default_window: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            default_mss: 1000,
            default_window: 1000,
        }
    }
}
