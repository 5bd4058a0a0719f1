//! Configuration of the dialog portal backend.
//!
//! Defaults are serialized to TOML and the user file is merged on top of
//! them, so a file only needs the keys it changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::{Deserialize, Serialize};
use toml::map::Entry;
use tracing::{debug, warn};

/// Well-known D-Bus name requested by default.
pub const DEFAULT_DBUS_NAME: &str = "org.freedesktop.impl.portal.desktop.otto.dialogs";

/// Environment variable pointing at an explicit configuration file.
pub const CONFIG_ENV: &str = "OTTO_PORTAL_CONFIG";

const SCREENSHOT_SCRIPT: &str = r#"file="${XDG_RUNTIME_DIR:-/tmp}/otto-screenshot-$$.png" && grim "$file" && zenity --question --title=Screenshot --text="Share this screenshot with ${1:-the application}?" && printf '%s\n' "$file""#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize default configuration: {0}")]
    Defaults(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dbus_name: String,
    pub app_chooser: PortalConfig,
    pub file_chooser: PortalConfig,
    pub print: PortalConfig,
    pub screenshot: PortalConfig,
    pub access: PortalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dbus_name: DEFAULT_DBUS_NAME.to_string(),
            app_chooser: PortalConfig::new(CommandConfig::new(
                "zenity",
                &[
                    "--list",
                    "--title={title}",
                    "--text={heading}",
                    "--ok-label={accept_label}",
                    "--column=Application",
                    "--hide-header",
                    "{choices}",
                ],
            )),
            file_chooser: PortalConfig::new(CommandConfig::new(
                "zenity",
                &["--file-selection", "--title={title}", "{flags}"],
            )),
            print: PortalConfig::new(CommandConfig::new(
                "zenity",
                &[
                    "--question",
                    "--title={title}",
                    "--text=Print {filename}?",
                    "--ok-label=Print",
                ],
            )),
            screenshot: PortalConfig::new(CommandConfig::new(
                "sh",
                &["-c", SCREENSHOT_SCRIPT, "otto-screenshot", "{app_id}"],
            )),
            access: PortalConfig::new(CommandConfig::new(
                "zenity",
                &[
                    "--question",
                    "--title={title}",
                    "--text={text}",
                    "--ok-label={grant_label}",
                    "--cancel-label={deny_label}",
                    "{flags}",
                ],
            )),
        }
    }
}

impl Config {
    /// Loads the configuration from the first location that applies.
    ///
    /// A missing file means defaults; an unreadable or invalid one is logged
    /// and also falls back to defaults.
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_overrides(&content).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "Falling back to default portal config");
                Self::default()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No portal config file, using defaults");
                Self::default()
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "Failed to read portal config");
                Self::default()
            }
        }
    }

    /// Merges TOML `content` over the defaults.
    pub fn from_overrides(content: &str) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::try_from(Self::default())?;
        let overrides = content.parse::<toml::Value>()?;
        merge_value(&mut merged, overrides);
        Ok(merged.try_into()?)
    }
}

/// Settings of one portal interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub command: CommandConfig,
}

impl PortalConfig {
    fn new(command: CommandConfig) -> Self {
        Self {
            enabled: true,
            command,
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Helper program acting as a portal's UI surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Substitutes `{name}` placeholders in the arguments.
    ///
    /// An argument that is exactly `{name}` expands to one argument per value
    /// (possibly none). Inside a longer argument the values are joined with a
    /// space. Unknown placeholders are kept as written.
    pub fn render(&self, vars: &TemplateVars) -> CommandConfig {
        let mut args = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let whole = arg
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
                .and_then(|name| vars.get(name));

            match whole {
                Some(values) => args.extend(values.iter().cloned()),
                None => args.push(substitute(arg, vars)),
            }
        }

        CommandConfig {
            program: self.program.clone(),
            args,
        }
    }
}

/// Values available to argument templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: BTreeMap<String, Vec<String>>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.to_string(), vec![value.into()]);
        self
    }

    pub fn set_all<I, S>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(Vec::as_slice)
    }
}

fn substitute(arg: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match vars.get(name) {
            Some(values) => out.push_str(&values.join(" ")),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Location of the configuration file, if one can be determined.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    let config_home = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|path| path.is_absolute())
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;

    Some(config_home.join("otto").join("portal.toml"))
}

fn merge_value(base: &mut toml::Value, overrides: toml::Value) {
    match (base, overrides) {
        (toml::Value::Table(base_map), toml::Value::Table(override_map)) => {
            for (key, override_value) in override_map {
                match base_map.entry(key) {
                    Entry::Occupied(mut entry) => merge_value(entry.get_mut(), override_value),
                    Entry::Vacant(entry) => {
                        entry.insert(override_value);
                    }
                }
            }
        }
        (base_value, override_value) => {
            *base_value = override_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_every_portal() {
        let config = Config::default();
        assert_eq!(config.dbus_name, DEFAULT_DBUS_NAME);
        assert!(config.app_chooser.enabled);
        assert!(config.file_chooser.enabled);
        assert!(config.print.enabled);
        assert!(config.screenshot.enabled);
        assert!(config.access.enabled);
    }

    #[test]
    fn overrides_merge_into_defaults() {
        let overrides = r#"
            dbus_name = "org.example.Portal"

            [print]
            enabled = false

            [app_chooser.command]
            program = "fuzzel"
        "#;

        let config = Config::from_overrides(overrides).expect("config should merge");
        assert_eq!(config.dbus_name, "org.example.Portal");
        assert!(!config.print.enabled);
        assert_eq!(config.print.command.program, "zenity");
        assert_eq!(config.app_chooser.command.program, "fuzzel");
        // args were not overridden, so the default template survives
        assert!(config
            .app_chooser
            .command
            .args
            .iter()
            .any(|arg| arg == "{choices}"));
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        assert!(Config::from_overrides("dbus_name = [").is_err());
        assert!(Config::from_overrides("dbus_name = 3").is_err());
    }

    #[test]
    fn render_expands_list_placeholders() {
        let command = CommandConfig::new("zenity", &["--list", "--title={title}", "{choices}"]);
        let mut vars = TemplateVars::new();
        vars.set("title", "Open With")
            .set_all("choices", ["a.desktop", "b.desktop"]);

        let rendered = command.render(&vars);
        assert_eq!(rendered.program, "zenity");
        assert_eq!(
            rendered.args,
            vec!["--list", "--title=Open With", "a.desktop", "b.desktop"]
        );
    }

    #[test]
    fn render_drops_empty_list_and_keeps_unknown_placeholders() {
        let command = CommandConfig::new("sh", &["-c", "echo ${HOME} {name}", "{flags}"]);
        let mut vars = TemplateVars::new();
        vars.set("name", "otto").set_all("flags", Vec::<String>::new());

        let rendered = command.render(&vars);
        assert_eq!(rendered.args, vec!["-c", "echo ${HOME} otto"]);
    }

    #[test]
    fn render_joins_lists_inside_arguments() {
        let command = CommandConfig::new("zenity", &["--text=Pick {choices}", "{unclosed"]);
        let mut vars = TemplateVars::new();
        vars.set_all("choices", ["a", "b"]);

        let rendered = command.render(&vars);
        assert_eq!(rendered.args, vec!["--text=Pick a b", "{unclosed"]);
    }
}
