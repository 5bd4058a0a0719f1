//! Request objects for in-flight portal interactions.
//!
//! Every dialog-based portal call gets one [`Request`]. It is exported on the
//! bus at a path derived from the caller so the frontend can `Close` it, and
//! it carries the single `Response` signal that ends the interaction.
//!
//! Lifecycle: `Created -> Exported -> Unexported`. Going straight from
//! `Created` to `Unexported` is allowed when export fails or never happens;
//! `Unexported` is terminal.

mod bus;
mod exports;
mod object;

pub use bus::RequestBus;
pub use exports::Exports;
pub use object::{RequestObject, REQUEST_INTERFACE};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use zbus::zvariant::OwnedValue;

/// Prefix under which request objects are exported.
pub const REQUEST_PATH_PREFIX: &str = "/org/freedesktop/portal/desktop/request";

/// Portal-specific results carried by a `Response`, opaque to the core.
pub type Results = HashMap<String, OwnedValue>;

/// Callback fired when the frontend calls `Close` on an exported request.
pub type CloseCallback = Arc<dyn Fn() + Send + Sync>;

/// Coarse outcome of an interaction as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResponseCode {
    /// The user accepted the dialog.
    Success = 0,
    /// The user cancelled the dialog.
    Cancelled = 1,
    /// The dialog was dismissed without a choice, or failed.
    Other = 2,
}

impl From<ResponseCode> for u32 {
    fn from(code: ResponseCode) -> Self {
        code as u32
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseCode::Success => "success",
            ResponseCode::Cancelled => "cancelled",
            ResponseCode::Other => "other",
        };
        write!(f, "{name} ({})", *self as u32)
    }
}

/// Conversion of an adapter's result type into the `a{sv}` response payload.
pub trait IntoResults {
    fn into_results(self) -> Results;
}

impl IntoResults for Results {
    fn into_results(self) -> Results {
        self
    }
}

impl IntoResults for () {
    fn into_results(self) -> Results {
        Results::new()
    }
}

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Created,
    Exported,
    Unexported,
}

/// Escapes a unique bus name for use as an object path element.
///
/// The leading `:` is dropped and every `.` becomes `_`, so `:1.23` maps to
/// `1_23`.
pub fn escape_sender(sender: &str) -> String {
    sender
        .strip_prefix(':')
        .unwrap_or(sender)
        .replace('.', "_")
}

/// Object path of the request identified by `(sender, id)`.
///
/// `id` is used verbatim; an illegal token yields an illegal path, which then
/// surfaces as an export failure.
pub fn request_path(sender: &str, id: &str) -> String {
    format!("{REQUEST_PATH_PREFIX}/{}/{id}", escape_sender(sender))
}

/// The bus-addressable handle of one in-flight interaction.
///
/// The owner (a dialog handle) holds the request by value. The bus side only
/// keeps a [`RequestObject`], which is removed synchronously by
/// [`Request::unexport`].
pub struct Request<B> {
    sender: String,
    destination: String,
    app_id: String,
    id: String,
    path: String,
    state: RequestState,
    exports: Exports<B>,
    on_close: Option<CloseCallback>,
}

impl<B: RequestBus> Request<B> {
    /// Creates a request for a call from `sender` on behalf of `app_id`.
    ///
    /// Never fails; `id` is not checked for object path legality here. The
    /// `Response` signal goes to `sender` unless
    /// [`Request::set_destination`] says otherwise.
    pub fn new(sender: impl Into<String>, app_id: impl Into<String>, id: impl Into<String>) -> Self {
        let sender = sender.into();
        let id = id.into();
        let path = request_path(&sender, &id);

        Self {
            destination: sender.clone(),
            sender,
            app_id: app_id.into(),
            id,
            path,
            state: RequestState::Created,
            exports: Exports::new(),
            on_close: None,
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Unique name the `Response` signal is addressed to. Empty broadcasts.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Addresses the `Response` signal to a connection other than the one
    /// the path was derived from, e.g. the frontend relaying the call.
    pub fn set_destination(&mut self, destination: impl Into<String>) {
        self.destination = destination.into();
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_exported(&self) -> bool {
        self.state == RequestState::Exported
    }

    /// Subscribes to `Close` calls on the exported object.
    ///
    /// Must be called before [`Request::export`]; one subscription per request.
    pub fn on_close_requested<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.on_close.is_some() {
            warn!(request = %self.path, "Replacing existing close subscription");
        }
        if self.state != RequestState::Created {
            warn!(
                request = %self.path,
                state = ?self.state,
                "Close subscription added after export has no effect"
            );
        }
        self.on_close = Some(Arc::new(callback));
    }

    /// Registers the request object on `bus` at its derived path.
    ///
    /// Returns whether the request is now exported. Failures are logged and
    /// leave the request unexported.
    pub async fn export(&mut self, bus: &B) -> bool {
        match self.state {
            RequestState::Created => {}
            RequestState::Exported => {
                error!(request = %self.path, "Request is already exported");
                return false;
            }
            RequestState::Unexported => {
                warn!(request = %self.path, "Refusing to export a finished request");
                return false;
            }
        }

        let object = RequestObject::new(self.path.clone(), self.on_close.clone());
        match bus.register(&self.path, object).await {
            Ok(()) => {
                self.exports.insert(bus.clone());
                self.state = RequestState::Exported;
                debug!(
                    request = %self.path,
                    sender = %self.sender,
                    app_id = %self.app_id,
                    "Request exported"
                );
                true
            }
            Err(err) => {
                warn!(request = %self.path, %err, "Error exporting request");
                false
            }
        }
    }

    /// Removes the bus registration and moves the request to `Unexported`.
    ///
    /// The teardown only runs for an exported request; returns whether it ran.
    pub async fn unexport(&mut self) -> bool {
        match self.state {
            RequestState::Exported => {}
            RequestState::Created => {
                self.state = RequestState::Unexported;
                self.on_close = None;
                return false;
            }
            RequestState::Unexported => {
                debug!(request = %self.path, "Request already unexported");
                return false;
            }
        }

        self.state = RequestState::Unexported;
        self.on_close = None;

        for bus in self.exports.take() {
            match bus.unregister(&self.path).await {
                Ok(true) => {}
                Ok(false) => debug!(request = %self.path, "Request object was already gone"),
                Err(err) => warn!(request = %self.path, %err, "Failed to unregister request object"),
            }
        }

        info!(request = %self.path, "Request unexported");
        true
    }

    /// Broadcasts the terminal `Response` signal to every observing connection.
    ///
    /// Only valid while exported; otherwise nothing is sent and `false` is
    /// returned.
    pub async fn emit_response(&self, code: ResponseCode, results: impl IntoResults) -> bool {
        if !self.is_exported() {
            warn!(request = %self.path, %code, "Request is not exported, dropping response");
            return false;
        }

        let results = results.into_results();
        let delivered = self
            .exports
            .broadcast_response(&self.destination, &self.path, code, &results)
            .await;

        info!(request = %self.path, %code, delivered, "Response emitted");
        true
    }
}

impl<B> fmt::Debug for Request<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("sender", &self.sender)
            .field("destination", &self.destination)
            .field("app_id", &self.app_id)
            .field("id", &self.id)
            .field("path", &self.path)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<B> Drop for Request<B> {
    fn drop(&mut self) {
        if self.state == RequestState::Exported {
            error!(request = %self.path, "Request dropped while still exported");
        }
    }
}
