//! Environment file generation

use crate::credentials::{DatabaseCredentials, LOCAL_SOCKET_PATH};
use crate::provision::target::{Position, TargetSpec};
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Static environment template shipped with the installer
pub const ENV_TEMPLATE: &str = include_str!("../../templates/env.example");

/// Environment file written by the templater for full applications
pub const ENV_EXAMPLE_FILE: &str = ".env.example";

/// Live environment file read by the application
pub const ENV_FILE: &str = ".env";

/// Application URL used by single-module sandboxes
pub const SANDBOX_URL: &str = "http://localhost:8000";

/// `HOME` and `PATH` of the invoking shell, baked into every environment file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnvironment {
    pub home: String,
    pub path: String,
}

impl HostEnvironment {
    pub fn capture() -> Self {
        Self {
            home: std::env::var("HOME").unwrap_or_default(),
            path: std::env::var("PATH").unwrap_or_default(),
        }
    }
}

/// Ordered core settings rendered into `[ENSPHERE_CORE_SETTINGS]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSettings {
    entries: IndexMap<String, String>,
}

impl EnvironmentSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value; an existing key keeps its position
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `KEY=value` lines, values form-encoded with `/` and `:` left readable
    pub fn to_block(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Settings shared by both tiers, in their fixed order
    fn base(position: Position) -> Self {
        let mut settings = Self::new();
        settings.set("USE_PASSPHRASE", "true");
        settings.set("PASSPHRASE", "purpose");
        settings.set("DISK_STORAGE", "local");
        settings.set("FILESYSTEM_ROOT", "");
        settings.set("APP_URL", "");
        match position {
            Position::Front => settings.set("SITE_ID", "1"),
            Position::Back => {
                settings.set("FRONT_END_URL", "");
                settings.set("FRONT_END_FOLDER", "");
            }
        }
        settings
    }

    fn with_host(mut self, host: &HostEnvironment) -> Self {
        self.set("HOME", host.home.clone());
        self.set("PATH", host.path.clone());
        self
    }
}

/// Core settings for a tier of a full application.
///
/// The front tier stores files inside the back tier's storage; the back
/// tier links to the front tier's URL and folder.
pub fn application_settings(target: &TargetSpec, host: &HostEnvironment) -> EnvironmentSettings {
    let mut settings = EnvironmentSettings::base(target.position).with_host(host);
    settings.set("APP_URL", target.app_url());

    match target.position {
        Position::Front => {
            settings.set(
                "FILESYSTEM_ROOT",
                format!("../{}/storage/app", target.sibling_folder_name()),
            );
        }
        Position::Back => {
            settings.set("FILESYSTEM_ROOT", "storage/app");
            settings.set("FRONT_END_URL", target.sibling_url());
            settings.set("FRONT_END_FOLDER", target.sibling_folder_name());
        }
    }

    settings
}

/// Core settings for a single-module sandbox served on localhost
pub fn sandbox_settings(position: Position, folder: &str, host: &HostEnvironment) -> EnvironmentSettings {
    let mut settings = EnvironmentSettings::base(position).with_host(host);
    settings.set("APP_URL", SANDBOX_URL);
    settings.set("FILESYSTEM_ROOT", "storage/app");
    if position == Position::Back {
        settings.set("FRONT_END_URL", SANDBOX_URL);
        settings.set("FRONT_END_FOLDER", folder);
    }
    settings
}

/// Fill the placeholders of an environment template in a single pass.
///
/// Substituted values are never rescanned, so a password containing
/// `[DB_PORT]` stays intact.
pub fn render_env(
    template: &str,
    app_url: &str,
    settings: &EnvironmentSettings,
    db: &DatabaseCredentials,
) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| {
        Regex::new(
            r"\[(ENSPHERE_CORE_SETTINGS|APP_URL|MAMP_SOCKET|DB_HOST|DB_DATABASE|DB_USERNAME|DB_PASSWORD|DB_PORT)\]",
        )
        .expect("static regex")
    });

    let core = settings.to_block();
    let socket = if db.using_local_socket {
        format!("DB_SOCKET={}", LOCAL_SOCKET_PATH)
    } else {
        String::new()
    };

    re.replace_all(template, |caps: &Captures| match &caps[1] {
        "ENSPHERE_CORE_SETTINGS" => core.clone(),
        "APP_URL" => app_url.to_string(),
        "MAMP_SOCKET" => socket.clone(),
        "DB_HOST" => db.host.clone(),
        "DB_DATABASE" => db.name.clone(),
        "DB_USERNAME" => db.user.clone(),
        "DB_PASSWORD" => db.password.clone(),
        "DB_PORT" => db.port.to_string(),
        other => format!("[{}]", other),
    })
    .into_owned()
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace("%2F", "/")
        .replace("%3A", ":")
}
