//! D-Bus interface implementation for `org.freedesktop.impl.portal.FileChooser`.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;
use zbus::fdo;
use zbus::interface;
use zbus::message::Header;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};
use zbus::Connection;

use crate::config::{CommandConfig, TemplateVars};
use crate::dialog::{CommandDialog, DispatcherHandle};
use crate::portal::{
    bool_option, file_uri, insert_value, path_option, request_from_call, string_option,
};
use crate::request::{ResponseCode, Results};

/// What the user is asked to pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChooserMode {
    Open,
    OpenMultiple,
    Save,
}

impl FileChooserMode {
    /// Mode of an `OpenFile` call: several files when `multiple` is set.
    pub fn for_open(options: &HashMap<String, OwnedValue>) -> Self {
        if bool_option(options, "multiple").unwrap_or(false) {
            FileChooserMode::OpenMultiple
        } else {
            FileChooserMode::Open
        }
    }

    fn default_accept_label(self) -> &'static str {
        match self {
            FileChooserMode::Open | FileChooserMode::OpenMultiple => "Open",
            FileChooserMode::Save => "Save",
        }
    }
}

/// File the save dialog starts on, from `current_folder` and `current_name`.
fn initial_save_target(folder: Option<&str>, name: Option<&str>) -> Option<String> {
    let name = name.filter(|name| !name.is_empty());
    match (folder, name) {
        (Some(folder), Some(name)) => Some(Path::new(folder).join(name).display().to_string()),
        (Some(folder), None) => Some(format!("{}/", folder.trim_end_matches('/'))),
        (None, name) => name.map(str::to_string),
    }
}

/// Helper flags for a call in `mode` with the caller's `options`.
pub fn file_chooser_flags(
    mode: FileChooserMode,
    options: &HashMap<String, OwnedValue>,
) -> Vec<String> {
    match mode {
        FileChooserMode::Open => Vec::new(),
        FileChooserMode::OpenMultiple => {
            vec!["--multiple".to_string(), "--separator=\n".to_string()]
        }
        FileChooserMode::Save => {
            let folder = path_option(options, "current_folder");
            let name = string_option(options, "current_name");

            let mut flags = vec!["--save".to_string()];
            if let Some(target) = initial_save_target(folder.as_deref(), name.as_deref()) {
                flags.push(format!("--filename={target}"));
            }
            flags
        }
    }
}

/// Builds the file chooser results.
///
/// `uris` holds one URI per non-empty output line on success and is empty
/// otherwise. `writable` is never granted.
pub fn file_selection_results(code: ResponseCode, output: &str) -> Results {
    let uris: Vec<String> = if code == ResponseCode::Success {
        output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(file_uri)
            .collect()
    } else {
        Vec::new()
    };

    let mut results = Results::new();
    insert_value(&mut results, "uris", Value::new(uris));
    results.insert("writable".to_string(), OwnedValue::from(false));
    results
}

#[derive(Clone)]
pub struct FileChooserPortal {
    dispatcher: DispatcherHandle<Connection>,
    command: CommandConfig,
}

impl FileChooserPortal {
    pub fn new(dispatcher: DispatcherHandle<Connection>, command: CommandConfig) -> Self {
        Self {
            dispatcher,
            command,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn show(
        &self,
        mode: FileChooserMode,
        handle: &ObjectPath<'_>,
        app_id: &str,
        title: &str,
        options: &HashMap<String, OwnedValue>,
        header: &Header<'_>,
        connection: &Connection,
    ) -> fdo::Result<()> {
        let request = request_from_call(header, app_id, handle)?;

        let mut vars = TemplateVars::new();
        vars.set("app_id", app_id)
            .set("title", title)
            .set(
                "accept_label",
                string_option(options, "accept_label")
                    .unwrap_or_else(|| mode.default_accept_label().to_string()),
            )
            .set(
                "current_name",
                string_option(options, "current_name").unwrap_or_default(),
            )
            .set(
                "current_folder",
                path_option(options, "current_folder").unwrap_or_default(),
            )
            .set_all("flags", file_chooser_flags(mode, options));

        let dialog = CommandDialog::new(self.command.render(&vars), file_selection_results);
        self.dispatcher
            .open(request, Box::new(dialog), connection.clone())
            .await?;

        Ok(())
    }
}

#[interface(name = "org.freedesktop.impl.portal.FileChooser")]
impl FileChooserPortal {
    async fn open_file(
        &self,
        handle: OwnedObjectPath,
        app_id: &str,
        parent_window: &str,
        title: &str,
        options: HashMap<String, OwnedValue>,
        #[zbus(header)] header: Header<'_>,
        #[zbus(connection)] connection: &Connection,
    ) -> fdo::Result<()> {
        let mode = FileChooserMode::for_open(&options);
        info!(handle = %handle.as_str(), app_id, parent_window, title, ?mode, "OpenFile called");
        self.show(mode, &handle, app_id, title, &options, &header, connection)
            .await
    }

    async fn save_file(
        &self,
        handle: OwnedObjectPath,
        app_id: &str,
        parent_window: &str,
        title: &str,
        options: HashMap<String, OwnedValue>,
        #[zbus(header)] header: Header<'_>,
        #[zbus(connection)] connection: &Connection,
    ) -> fdo::Result<()> {
        info!(handle = %handle.as_str(), app_id, parent_window, title, "SaveFile called");
        self.show(
            FileChooserMode::Save,
            &handle,
            app_id,
            title,
            &options,
            &header,
            connection,
        )
        .await
    }

    #[zbus(property)]
    fn version(&self) -> u32 {
        1
    }
}
