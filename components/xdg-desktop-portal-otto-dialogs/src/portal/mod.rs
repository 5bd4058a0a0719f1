//! Portal module implementing the dialog-based XDG Desktop Portal backends.
//!
//! This module provides D-Bus interface implementations for:
//! - `org.freedesktop.impl.portal.AppChooser`
//! - `org.freedesktop.impl.portal.FileChooser`
//! - `org.freedesktop.impl.portal.Print`
//! - `org.freedesktop.impl.portal.Screenshot`
//! - `org.freedesktop.impl.portal.Access`

mod access;
mod app_chooser;
mod file_chooser;
mod print;
mod screenshot;

pub use access::AccessPortal;
pub use app_chooser::{app_choice_results, AppChooserPortal};
pub use file_chooser::{
    file_chooser_flags, file_selection_results, FileChooserMode, FileChooserPortal,
};
pub use print::PrintPortal;
pub use screenshot::{screenshot_results, ScreenshotPortal};

use std::collections::HashMap;

use tracing::warn;
use url::Url;
use zbus::fdo;
use zbus::message::Header;
use zbus::zvariant::{ObjectPath, OwnedValue, Value};
use zbus::Connection;

use crate::request::{Request, Results, REQUEST_PATH_PREFIX};

/// D-Bus object path for the portal desktop interfaces.
pub const DESKTOP_PATH: &str = "/org/freedesktop/portal/desktop";

/// Returns the D-Bus object path for the portal desktop interfaces.
#[inline]
pub fn desktop_path() -> &'static str {
    DESKTOP_PATH
}

/// Checks that a caller-supplied handle token can be used as a path element.
///
/// Tokens must be non-empty and contain only ASCII alphanumerics and `_`.
pub fn validate_handle_token(token: &str) -> Result<&str, fdo::Error> {
    if !token.is_empty()
        && token
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        Ok(token)
    } else {
        Err(fdo::Error::InvalidArgs(format!(
            "Invalid request handle token {token:?}"
        )))
    }
}

/// Splits a request handle into its escaped sender segment and token.
///
/// The frontend picks the handle; it must be
/// `/org/freedesktop/portal/desktop/request/<sender>/<token>` with both
/// elements made of ASCII alphanumerics and `_`.
pub fn parse_request_handle(handle: &str) -> Result<(&str, &str), fdo::Error> {
    let invalid = || fdo::Error::InvalidArgs(format!("Invalid request handle {handle:?}"));

    let (segment, token) = handle
        .strip_prefix(REQUEST_PATH_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|rest| rest.split_once('/'))
        .ok_or_else(invalid)?;

    let segment = validate_handle_token(segment).map_err(|_| invalid())?;
    let token = validate_handle_token(token).map_err(|_| invalid())?;
    Ok((segment, token))
}

/// Creates the request for an incoming portal call.
///
/// The request is exported at `handle` as the frontend passed it, and its
/// `Response` is addressed to the connection that made the call. Unlike
/// [`Request::new`], malformed handles are rejected here, before any dialog
/// is shown.
pub fn request_from_call(
    header: &Header<'_>,
    app_id: &str,
    handle: &ObjectPath<'_>,
) -> fdo::Result<Request<Connection>> {
    let (segment, token) = parse_request_handle(handle.as_str())?;

    let mut request = Request::new(segment, app_id, token);
    if let Some(sender) = header.sender() {
        request.set_destination(sender.as_str());
    }
    Ok(request)
}

/// Turns a path printed by a helper into a percent-encoded `file://` URI.
///
/// Strings that already carry a scheme are passed through. Relative paths
/// have no URI and yield `None`.
pub fn file_uri(path: &str) -> Option<String> {
    if path.contains("://") {
        return Some(path.to_string());
    }

    match Url::from_file_path(path) {
        Ok(url) => Some(url.into()),
        Err(()) => {
            warn!(path, "Helper returned a path that is not absolute");
            None
        }
    }
}

pub(crate) fn string_option(options: &HashMap<String, OwnedValue>, key: &str) -> Option<String> {
    options
        .get(key)
        .and_then(|value| value.try_clone().ok())
        .and_then(|owned| String::try_from(owned).ok())
}

pub(crate) fn bool_option(options: &HashMap<String, OwnedValue>, key: &str) -> Option<bool> {
    options
        .get(key)
        .and_then(|value| bool::try_from(value).ok())
}

/// Reads a byte-string path option (`ay`, usually NUL-terminated).
pub(crate) fn path_option(options: &HashMap<String, OwnedValue>, key: &str) -> Option<String> {
    let bytes = options
        .get(key)
        .and_then(|value| value.try_clone().ok())
        .and_then(|owned| Vec::<u8>::try_from(Value::from(owned)).ok())?;
    let bytes = bytes.strip_suffix(b"\0").unwrap_or(bytes.as_slice());

    String::from_utf8(bytes.to_vec())
        .ok()
        .filter(|path| !path.is_empty())
}

pub(crate) fn insert_value(results: &mut Results, key: &str, value: Value<'_>) {
    match OwnedValue::try_from(value) {
        Ok(value) => {
            results.insert(key.to_string(), value);
        }
        Err(err) => warn!(key, ?err, "Failed to encode response value"),
    }
}
