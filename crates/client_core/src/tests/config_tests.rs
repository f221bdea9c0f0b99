use super::*;

use std::{
    env,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_root(label: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    env::temp_dir().join(format!("wsop_client_{label}_{suffix}"))
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(Path::new("/nonexistent/wsop.toml"), |_| None);
    assert_eq!(settings, ClientSettings::default());
    assert_eq!(settings.operational_sheet, "master");
    assert_eq!(settings.time_zone(), chrono_tz::Europe::Istanbul);
}

#[test]
fn env_overrides_file_values() {
    let root = temp_root("settings");
    fs::create_dir_all(&root).expect("temp root");
    let path = root.join("wsop.toml");
    fs::write(
        &path,
        "api_base = \"https://file.example\"\napi_key = \"file-key\"\ntimezone = \"Europe/Prague\"\n",
    )
    .expect("write settings");

    let settings = load_settings_from(&path, |key| match key {
        "API_KEY" => Some("env-key".to_string()),
        "WSOP__SHEET" => Some("floor".to_string()),
        _ => None,
    });

    assert_eq!(settings.api_base, "https://file.example");
    assert_eq!(settings.api_key, "env-key");
    assert_eq!(settings.timezone, "Europe/Prague");
    assert_eq!(settings.operational_sheet, "floor");

    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn unknown_timezone_falls_back_to_utc() {
    let settings = ClientSettings {
        timezone: "Mars/Olympus".into(),
        ..Default::default()
    };
    assert_eq!(settings.time_zone(), chrono_tz::UTC);
}

#[test]
fn validate_requires_http_base_and_key() {
    let mut settings = ClientSettings {
        api_key: "k".into(),
        ..Default::default()
    };
    settings.validate().expect("valid");

    settings.api_base = "ftp://example.com".into();
    assert!(settings.validate().is_err());

    settings.api_base = "https://example.com".into();
    settings.api_key = "  ".into();
    assert!(settings.validate().is_err());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite::memory:"),
        "sqlite::memory:"
    );
    assert_eq!(
        normalize_database_url("sqlite:C:\\data\\wsop.db"),
        "sqlite://C:/data/wsop.db"
    );
    assert_eq!(normalize_database_url("  "), ClientSettings::default().database_url);
}
