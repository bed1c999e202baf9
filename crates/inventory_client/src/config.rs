use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

use crate::{notify::NotificationDurations, query::DEFAULT_PAGE_SIZE};

pub const DEFAULT_CONFIG_FILE: &str = "inventory.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub notifications: NotificationDurations,
    /// Bearer token handed out by the sign-in flow, if any.
    pub token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".into(),
            request_timeout: Duration::from_secs(15),
            page_size: DEFAULT_PAGE_SIZE,
            notifications: NotificationDurations::default(),
            token: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    page_size: Option<u32>,
    success_notification_ms: Option<u64>,
    error_notification_ms: Option<u64>,
    token: Option<String>,
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?;
        apply_file(&mut settings, file_cfg);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v.max(1));
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.success_notification_ms {
        settings.notifications.success = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.error_notification_ms {
        settings.notifications.error = Duration::from_millis(v);
    }
    if file_cfg.token.is_some() {
        settings.token = file_cfg.token;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("INVENTORY_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("INVENTORY_PAGE_SIZE") {
        if let Ok(parsed) = v.trim().parse::<u32>() {
            settings.page_size = parsed;
        }
    }

    if let Some(v) = lookup("INVENTORY_REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout = Duration::from_secs(parsed.max(1));
        }
    }

    if let Some(v) = lookup("INVENTORY_TOKEN") {
        let v = v.trim();
        settings.token = (!v.is_empty()).then(|| v.to_string());
    }
}
