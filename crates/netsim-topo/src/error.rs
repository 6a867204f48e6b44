use thiserror::Error;

/// Fatal parse or build errors, reported before `run()` starts — a bad
/// topology file is a configuration mistake, not a simulated network
/// condition.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("line {line}: unrecognized directive '{text}'")]
    UnknownDirective { line: usize, text: String },
    #[error("line {line}: '{host}' was not declared with a 'node' directive")]
    UnknownHost { line: usize, host: String },
    #[error("line {line}: missing required attribute '{attr}'")]
    MissingAttribute { line: usize, attr: String },
    #[error("line {line}: '{value}' is not a valid number for '{attr}'")]
    InvalidNumber {
        line: usize,
        attr: String,
        value: String,
    },
    #[error("line {line}: node '{host}' declared more than once")]
    DuplicateNode { line: usize, host: String },
    #[error("no address assigned to '{host}' on its link toward '{peer}'")]
    MissingAddress { host: String, peer: String },
}
