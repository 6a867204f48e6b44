pub mod builder;
pub mod error;
pub mod parser;

pub use builder::build;
pub use error::TopologyError;
pub use parser::{LinkSpec, Topology, parse};
