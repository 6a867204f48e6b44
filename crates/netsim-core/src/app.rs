/// The sink a [`TcpConnection`](crate::tcp::TcpConnection) delivers
/// reassembled bytes to. The core calls `receive_data` with strictly
/// in-order, non-overlapping chunks as they become available; it never
/// re-delivers a byte already handed to a previous call.
pub trait Application {
    fn receive_data(&mut self, data: &[u8]);
}

/// An `Application` that simply accumulates everything it receives, in
/// delivery order. Useful for tests and for scenario-driven assertions
/// that want the whole reassembled stream at the end of a run.
#[derive(Debug, Default)]
pub struct CollectingApplication {
    pub received: Vec<u8>,
}

impl CollectingApplication {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Application for CollectingApplication {
    fn receive_data(&mut self, data: &[u8]) {
        self.received.extend_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_application_appends_in_order() {
        let mut app = CollectingApplication::new();
        app.receive_data(b"hello, ");
        app.receive_data(b"world");
        assert_eq!(app.received, b"hello, world");
    }
}
