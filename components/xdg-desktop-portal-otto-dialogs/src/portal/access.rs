//! D-Bus interface implementation for `org.freedesktop.impl.portal.Access`.
//!
//! Unlike the other dialogs, the answer is the reply of `AccessDialog`
//! itself. The request object is still exported so the frontend can `Close`
//! it, which answers the call with code 2.

use std::collections::HashMap;

use tracing::info;
use zbus::fdo;
use zbus::interface;
use zbus::message::Header;
use zbus::zvariant::{OwnedObjectPath, OwnedValue};
use zbus::Connection;

use crate::config::{CommandConfig, TemplateVars};
use crate::dialog::{CommandDialog, DispatcherHandle};
use crate::portal::{bool_option, request_from_call, string_option};
use crate::request::Results;

/// Body text shown by the helper: the subtitle, then the body if any.
pub(crate) fn access_text(subtitle: &str, body: &str) -> String {
    if body.is_empty() {
        subtitle.to_string()
    } else {
        format!("{subtitle}\n\n{body}")
    }
}

#[derive(Clone)]
pub struct AccessPortal {
    dispatcher: DispatcherHandle<Connection>,
    command: CommandConfig,
}

impl AccessPortal {
    pub fn new(dispatcher: DispatcherHandle<Connection>, command: CommandConfig) -> Self {
        Self {
            dispatcher,
            command,
        }
    }
}

#[interface(name = "org.freedesktop.impl.portal.Access")]
impl AccessPortal {
    async fn access_dialog(
        &self,
        handle: OwnedObjectPath,
        app_id: &str,
        parent_window: &str,
        title: &str,
        subtitle: &str,
        body: &str,
        options: HashMap<String, OwnedValue>,
        #[zbus(header)] header: Header<'_>,
        #[zbus(connection)] connection: &Connection,
    ) -> fdo::Result<(u32, HashMap<String, OwnedValue>)> {
        info!(handle = %handle.as_str(), app_id, parent_window, title, "AccessDialog called");

        let request = request_from_call(&header, app_id, &handle)?;

        let mut flags = Vec::new();
        if bool_option(&options, "modal").unwrap_or(true) {
            flags.push("--modal".to_string());
        }
        if let Some(icon) = string_option(&options, "icon") {
            flags.push(format!("--icon-name={icon}"));
        }

        let mut vars = TemplateVars::new();
        vars.set("app_id", app_id)
            .set("title", title)
            .set("subtitle", subtitle)
            .set("body", body)
            .set("text", access_text(subtitle, body))
            .set(
                "grant_label",
                string_option(&options, "grant_label")
                    .unwrap_or_else(|| "Grant Access".to_string()),
            )
            .set(
                "deny_label",
                string_option(&options, "deny_label").unwrap_or_else(|| "Deny Access".to_string()),
            )
            .set_all("flags", flags);

        let dialog = CommandDialog::new(self.command.render(&vars), |_, _| Results::new());
        let (code, results) = self
            .dispatcher
            .open_with_reply(request, Box::new(dialog), connection.clone())
            .await?;

        info!(handle = %handle.as_str(), app_id, %code, "AccessDialog answered");
        Ok((code.into(), results))
    }

    #[zbus(property)]
    fn version(&self) -> u32 {
        1
    }
}
