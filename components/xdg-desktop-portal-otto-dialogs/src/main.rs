//! Dialog portal backend for Otto.
//!
//! This binary serves the AppChooser, FileChooser, Print, Screenshot and
//! Access `org.freedesktop.impl.portal` interfaces on the session bus.

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zbus::{Connection, ConnectionBuilder};

use xdg_desktop_portal_otto_dialogs::config::Config;
use xdg_desktop_portal_otto_dialogs::dialog::Dispatcher;
use xdg_desktop_portal_otto_dialogs::portal::{
    desktop_path, AccessPortal, AppChooserPortal, FileChooserPortal, PrintPortal, ScreenshotPortal,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load();

    let connection = ConnectionBuilder::session()?
        .name(config.dbus_name.as_str())?
        .build()
        .await?;
    info!("Connected to D-Bus session bus");

    let (dispatcher, dialogs) = Dispatcher::<Connection>::new();
    let mut dispatcher_task = tokio::spawn(dispatcher.run());

    let object_server = connection.object_server();
    let mut served = Vec::new();

    if config.app_chooser.enabled {
        let portal = AppChooserPortal::new(dialogs.clone(), config.app_chooser.command.clone());
        object_server.at(desktop_path(), portal).await?;
        served.push("AppChooser");
    }
    if config.file_chooser.enabled {
        let portal = FileChooserPortal::new(dialogs.clone(), config.file_chooser.command.clone());
        object_server.at(desktop_path(), portal).await?;
        served.push("FileChooser");
    }
    if config.print.enabled {
        let portal = PrintPortal::new(dialogs.clone(), config.print.command.clone());
        object_server.at(desktop_path(), portal).await?;
        served.push("Print");
    }
    if config.screenshot.enabled {
        let portal = ScreenshotPortal::new(dialogs.clone(), config.screenshot.command.clone());
        object_server.at(desktop_path(), portal).await?;
        served.push("Screenshot");
    }
    if config.access.enabled {
        let portal = AccessPortal::new(dialogs.clone(), config.access.command.clone());
        object_server.at(desktop_path(), portal).await?;
        served.push("Access");
    }
    drop(dialogs);

    info!(name = %config.dbus_name, portals = ?served, "Dialog portal backend running");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown requested");
        }
        result = &mut dispatcher_task => {
            if let Err(err) = result {
                error!(%err, "Dialog dispatcher task failed");
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
