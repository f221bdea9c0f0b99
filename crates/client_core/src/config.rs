use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context};
use chrono_tz::Tz;
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "wsop.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base: String,
    pub api_key: String,
    pub timezone: String,
    pub operational_sheet: String,
    pub database_url: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:5000".into(),
            api_key: String::new(),
            timezone: "Europe/Istanbul".into(),
            operational_sheet: "master".into(),
            database_url: "sqlite://./data/wsop.db".into(),
        }
    }
}

impl ClientSettings {
    /// Configured zone, or UTC when the name is unknown.
    pub fn time_zone(&self) -> Tz {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!(timezone = %self.timezone, "unknown timezone; falling back to Etc/UTC");
                chrono_tz::UTC
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.api_base)
            .with_context(|| format!("invalid api_base '{}'", self.api_base))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api_base must be an http(s) url, got '{}'", self.api_base);
        }
        if self.api_key.trim().is_empty() {
            bail!("api_key is not configured (set API_KEY or api_key in {SETTINGS_FILE})");
        }
        Ok(())
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat TOML file at `path`, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_base") {
                settings.api_base = v.clone();
            }
            if let Some(v) = file_cfg.get("api_key") {
                settings.api_key = v.clone();
            }
            if let Some(v) = file_cfg.get("timezone") {
                settings.timezone = v.clone();
            }
            if let Some(v) = file_cfg.get("operational_sheet") {
                settings.operational_sheet = v.clone();
            }
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
        } else {
            warn!(path = %path.display(), "ignoring unreadable settings file");
        }
    }

    if let Some(v) = env("API_BASE_URL") {
        settings.api_base = v;
    }
    if let Some(v) = env("API_KEY") {
        settings.api_key = v;
    }
    if let Some(v) = env("SHEETS_TZ") {
        settings.timezone = v;
    }
    if let Some(v) = env("WSOP__SHEET") {
        settings.operational_sheet = v;
    }
    if let Some(v) = env("WSOP__DATABASE_URL") {
        settings.database_url = v;
    }

    settings
}

/// Accepts plain paths as well as `sqlite:` urls.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return ClientSettings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
