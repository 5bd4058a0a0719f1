//! Error types shared by the request core and the portal adapters.

use zbus::fdo;

/// Failure to make a request reachable on the bus.
///
/// Export failures are never fatal: the request stays unexported and the
/// interaction completes locally without a `Response` signal.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid request path {path}: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: zbus::zvariant::Error,
    },
    #[error("object path {0} is already in use")]
    PathInUse(String),
    #[error(transparent)]
    Bus(#[from] zbus::Error),
}

/// Failure to hand a dialog over to the termination loop.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dialog dispatcher is not running")]
    Stopped,
    #[error("dialog ended without an answer")]
    NoAnswer,
}

impl From<DispatchError> for fdo::Error {
    fn from(err: DispatchError) -> Self {
        fdo::Error::Failed(err.to_string())
    }
}
