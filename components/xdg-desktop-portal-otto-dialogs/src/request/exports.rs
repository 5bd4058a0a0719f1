//! Bookkeeping of the connections a request is exported on.

use tracing::warn;

use crate::request::{RequestBus, Results, ResponseCode};

/// Connections currently observing one request object.
pub struct Exports<B> {
    connections: Vec<B>,
}

impl<B> Default for Exports<B> {
    fn default() -> Self {
        Self {
            connections: Vec::new(),
        }
    }
}

impl<B: RequestBus> Exports<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bus: B) {
        self.connections.push(bus);
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drops every registration record, handing the connections back.
    pub fn take(&mut self) -> Vec<B> {
        std::mem::take(&mut self.connections)
    }

    /// Emits the `Response` signal on every observing connection.
    ///
    /// An empty set is a no-op. Per-connection failures are logged and do not
    /// stop the broadcast. Returns how many connections accepted the signal.
    pub async fn broadcast_response(
        &self,
        destination: &str,
        path: &str,
        code: ResponseCode,
        results: &Results,
    ) -> usize {
        let mut delivered = 0;
        for bus in &self.connections {
            match bus.emit_response(destination, path, code, results).await {
                Ok(()) => delivered += 1,
                Err(err) => warn!(request = %path, %err, "Failed to emit Response signal"),
            }
        }
        delivered
    }
}
