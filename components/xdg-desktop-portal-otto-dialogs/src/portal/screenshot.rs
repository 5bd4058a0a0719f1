//! D-Bus interface implementation for `org.freedesktop.impl.portal.Screenshot`.

use std::collections::HashMap;

use tracing::info;
use zbus::fdo;
use zbus::interface;
use zbus::message::Header;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Str};
use zbus::Connection;

use crate::config::{CommandConfig, TemplateVars};
use crate::dialog::{CommandDialog, DispatcherHandle};
use crate::portal::{file_uri, request_from_call};
use crate::request::{ResponseCode, Results};

/// Builds the screenshot results: `uri` is empty unless the user accepted.
pub fn screenshot_results(code: ResponseCode, output: &str) -> Results {
    let path = output.lines().next().unwrap_or_default().trim();
    let uri = if code == ResponseCode::Success && !path.is_empty() {
        file_uri(path).unwrap_or_default()
    } else {
        String::new()
    };

    let mut results = Results::new();
    results.insert("uri".to_string(), OwnedValue::from(Str::from(uri)));
    results
}

#[derive(Clone)]
pub struct ScreenshotPortal {
    dispatcher: DispatcherHandle<Connection>,
    command: CommandConfig,
}

impl ScreenshotPortal {
    pub fn new(dispatcher: DispatcherHandle<Connection>, command: CommandConfig) -> Self {
        Self {
            dispatcher,
            command,
        }
    }
}

#[interface(name = "org.freedesktop.impl.portal.Screenshot")]
impl ScreenshotPortal {
    async fn screenshot(
        &self,
        handle: OwnedObjectPath,
        app_id: &str,
        parent_window: &str,
        options: HashMap<String, OwnedValue>,
        #[zbus(header)] header: Header<'_>,
        #[zbus(connection)] connection: &Connection,
    ) -> fdo::Result<()> {
        info!(handle = %handle.as_str(), app_id, parent_window, ?options, "Screenshot called");

        let request = request_from_call(&header, app_id, &handle)?;

        let mut vars = TemplateVars::new();
        vars.set("app_id", app_id);

        let dialog = CommandDialog::new(self.command.render(&vars), screenshot_results);
        self.dispatcher
            .open(request, Box::new(dialog), connection.clone())
            .await?;

        Ok(())
    }

    #[zbus(property)]
    fn version(&self) -> u32 {
        1
    }
}
