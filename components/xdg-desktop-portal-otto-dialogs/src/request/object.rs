//! D-Bus Request object the frontend can close.

use tracing::{debug, info};
use zbus::fdo;
use zbus::interface;

use crate::request::CloseCallback;

/// Interface name of exported request objects.
pub const REQUEST_INTERFACE: &str = "org.freedesktop.impl.portal.Request";

/// Bus-side registration of a [`Request`](crate::request::Request).
///
/// Holds no reference to the request itself, only the close subscription.
pub struct RequestObject {
    path: String,
    on_close: Option<CloseCallback>,
}

impl RequestObject {
    pub fn new(path: String, on_close: Option<CloseCallback>) -> Self {
        Self { path, on_close }
    }

    /// Fires the close subscription, if there is one.
    pub fn notify_close(&self) {
        match &self.on_close {
            Some(callback) => callback(),
            None => debug!(request = %self.path, "Close requested without a subscriber"),
        }
    }
}

#[interface(name = "org.freedesktop.impl.portal.Request")]
impl RequestObject {
    /// Called by the frontend to cancel the request.
    async fn close(&self) -> fdo::Result<()> {
        info!(request = %self.path, "Request.Close called");
        self.notify_close();
        Ok(())
    }
}
