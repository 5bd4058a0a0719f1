//! D-Bus interface implementation for `org.freedesktop.impl.portal.AppChooser`.

use std::collections::HashMap;

use tracing::info;
use zbus::fdo;
use zbus::interface;
use zbus::message::Header;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Str};
use zbus::Connection;

use crate::config::{CommandConfig, TemplateVars};
use crate::dialog::{CommandDialog, DispatcherHandle};
use crate::portal::{request_from_call, string_option};
use crate::request::{ResponseCode, Results};

/// Builds the `ChooseApplication` results: `chosen` is only set on success.
pub fn app_choice_results(code: ResponseCode, output: &str) -> Results {
    let mut results = Results::new();
    let chosen = output.lines().next().unwrap_or_default().trim();

    if code == ResponseCode::Success && !chosen.is_empty() {
        results.insert(
            "chosen".to_string(),
            OwnedValue::from(Str::from(chosen.to_string())),
        );
    }

    results
}

#[derive(Clone)]
pub struct AppChooserPortal {
    dispatcher: DispatcherHandle<Connection>,
    command: CommandConfig,
}

impl AppChooserPortal {
    pub fn new(dispatcher: DispatcherHandle<Connection>, command: CommandConfig) -> Self {
        Self {
            dispatcher,
            command,
        }
    }
}

#[interface(name = "org.freedesktop.impl.portal.AppChooser")]
impl AppChooserPortal {
    async fn choose_application(
        &self,
        handle: OwnedObjectPath,
        app_id: &str,
        parent_window: &str,
        choices: Vec<String>,
        options: HashMap<String, OwnedValue>,
        #[zbus(header)] header: Header<'_>,
        #[zbus(connection)] connection: &Connection,
    ) -> fdo::Result<()> {
        info!(handle = %handle.as_str(), app_id, parent_window, ?choices, "ChooseApplication called");

        let request = request_from_call(&header, app_id, &handle)?;

        let mut vars = TemplateVars::new();
        vars.set("app_id", app_id)
            .set(
                "title",
                string_option(&options, "title").unwrap_or_else(|| "Open With".to_string()),
            )
            .set(
                "heading",
                string_option(&options, "heading")
                    .unwrap_or_else(|| "Select application".to_string()),
            )
            .set(
                "accept_label",
                string_option(&options, "accept_label").unwrap_or_else(|| "Select".to_string()),
            )
            .set(
                "latest_choice",
                string_option(&options, "latest-choice").unwrap_or_default(),
            )
            .set_all("choices", choices);

        let dialog = CommandDialog::new(self.command.render(&vars), app_choice_results);
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
