pub mod config;
pub mod ids;
pub mod packet;
pub mod scenario;
pub mod trace;

pub use config::SimulatorConfig;
pub use ids::{Address, ConnId, LinkId, NodeId, Port};
pub use packet::Packet;
pub use scenario::{TestAction, TestAssertion, TestScenario};
pub use trace::{DropReason, TraceCategory};
