use thiserror::Error;

/// Fatal misuse of the [`Scheduler`](crate::scheduler::Scheduler)'s public
/// contract. Every other data-plane condition (queue overflow, random
/// loss, a down link, a forwarding miss) is silent and traced, never an
/// `Err`.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduled delay {delay} is negative")]
    NegativeDelay { delay: f64 },
}

/// Violations of [`SendBuffer`](crate::buffer::SendBuffer) /
/// [`ReceiveBuffer`](crate::buffer::ReceiveBuffer) invariants. These can
/// only be triggered by a caller bug in the TCP state machine, never by
/// network conditions, so callers are expected to `expect()` them away
/// once the state machine is known to respect the buffer contract.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("slide to {ack_number} is beyond outstanding bound {next}")]
    SlideBeyondNext { ack_number: u64, next: u64 },
    #[error("resend called with nothing outstanding")]
    ResendWithNothingOutstanding,
}
