//! The seam between requests and the bus they are exported on.

use std::future::Future;

use zbus::zvariant::ObjectPath;
use zbus::Connection;

use crate::error::ExportError;
use crate::request::{RequestObject, Results, ResponseCode, REQUEST_INTERFACE};

/// A connection requests can be registered on and signal through.
///
/// Implemented for [`zbus::Connection`]; the handle is shared, never mutated.
pub trait RequestBus: Clone + Send + Sync + 'static {
    /// Registers `object` at `path`. A path that is already taken is an error.
    fn register(
        &self,
        path: &str,
        object: RequestObject,
    ) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Removes the request object at `path`, returning whether one was there.
    fn unregister(&self, path: &str) -> impl Future<Output = Result<bool, ExportError>> + Send;

    /// Emits `Response(code, results)` from `path` towards `destination`.
    fn emit_response(
        &self,
        destination: &str,
        path: &str,
        code: ResponseCode,
        results: &Results,
    ) -> impl Future<Output = zbus::Result<()>> + Send;
}

impl RequestBus for Connection {
    async fn register(&self, path: &str, object: RequestObject) -> Result<(), ExportError> {
        let object_path = ObjectPath::try_from(path).map_err(|source| ExportError::InvalidPath {
            path: path.to_string(),
            source,
        })?;

        if self.object_server().at(object_path, object).await? {
            Ok(())
        } else {
            Err(ExportError::PathInUse(path.to_string()))
        }
    }

    async fn unregister(&self, path: &str) -> Result<bool, ExportError> {
        Ok(self.object_server().remove::<RequestObject, _>(path).await?)
    }

    async fn emit_response(
        &self,
        destination: &str,
        path: &str,
        code: ResponseCode,
        results: &Results,
    ) -> zbus::Result<()> {
        let destination = (!destination.is_empty()).then_some(destination);
        self.emit_signal(
            destination,
            path,
            REQUEST_INTERFACE,
            "Response",
            &(u32::from(code), results),
        )
        .await
    }
}
