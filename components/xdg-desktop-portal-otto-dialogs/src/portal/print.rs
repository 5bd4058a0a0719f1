//! D-Bus interface implementation for `org.freedesktop.impl.portal.Print`.
//!
//! Only the confirmation dialog lives here; sending the file to a printer is
//! left to the configured helper.

use std::collections::HashMap;

use tracing::info;
use zbus::fdo;
use zbus::interface;
use zbus::message::Header;
use zbus::zvariant::{OwnedObjectPath, OwnedValue};
use zbus::Connection;

use crate::config::{CommandConfig, TemplateVars};
use crate::dialog::{CommandDialog, DispatcherHandle};
use crate::portal::request_from_call;
use crate::request::Results;

#[derive(Clone)]
pub struct PrintPortal {
    dispatcher: DispatcherHandle<Connection>,
    command: CommandConfig,
}

impl PrintPortal {
    pub fn new(dispatcher: DispatcherHandle<Connection>, command: CommandConfig) -> Self {
        Self {
            dispatcher,
            command,
        }
    }
}

#[interface(name = "org.freedesktop.impl.portal.Print")]
impl PrintPortal {
    async fn print_file(
        &self,
        handle: OwnedObjectPath,
        app_id: &str,
        parent_window: &str,
        title: &str,
        filename: &str,
        options: HashMap<String, OwnedValue>,
        #[zbus(header)] header: Header<'_>,
        #[zbus(connection)] connection: &Connection,
    ) -> fdo::Result<()> {
        info!(handle = %handle.as_str(), app_id, parent_window, title, filename, ?options, "PrintFile called");

        let request = request_from_call(&header, app_id, &handle)?;

        let mut vars = TemplateVars::new();
        vars.set("app_id", app_id)
            .set("title", title)
            .set("filename", filename);

        let dialog = CommandDialog::new(self.command.render(&vars), |_, _| Results::new());
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
