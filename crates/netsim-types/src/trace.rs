use serde::{Deserialize, Serialize};

/// Tagged debug-trace categories, replacing the original's string-tagged
/// `Sim.trace(category, message)` calls. Each variant is also used as a
/// `tracing` target name so categories stay independently filterable
/// (`RUST_LOG=link=debug,tcp=trace`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceCategory {
    Tcp,
    Link,
    Queue,
    AppHandler,
}

impl TraceCategory {
    pub const fn target(self) -> &'static str {
        match self {
            TraceCategory::Tcp => "tcp",
            TraceCategory::Link => "link",
            TraceCategory::Queue => "queue",
            TraceCategory::AppHandler => "app_handler",
        }
    }
}

/// Why a packet never reached its endpoint. Richer than the single
/// `dropped` bit in the wire trace format (§6); used for `tracing` events
/// and link-level bookkeeping only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    QueueOverflow,
    RandomLoss,
    LinkDown,
    ForwardingMiss,
    Deterministic,
}

impl DropReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            DropReason::QueueOverflow => "queue overflow",
            DropReason::RandomLoss => "random loss",
            DropReason::LinkDown => "link down",
            DropReason::ForwardingMiss => "no route to destination",
            DropReason::Deterministic => "deterministic test drop",
        }
    }
}
