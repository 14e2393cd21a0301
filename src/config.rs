use crate::types::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const CONFIG_DIR_NAME: &str = ".octo";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "OCTO_CONFIG_PATH";

/// Names accepted by `config get/set/unset`.
pub const SETTING_KEYS: [&str; 5] = [
    "stable_url",
    "dev_pointer_url",
    "wrapper_dir",
    "http_timeout_secs",
    "php_binary",
];

pub fn get_user_config_dir() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join(CONFIG_DIR_NAME);
    Ok(path)
}

pub fn get_octo_config_file_path() -> Result<PathBuf> {
    let path = match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) => PathBuf::from(path),
        None => get_user_config_dir()?.join(CONFIG_FILE_NAME),
    };
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

/// Read the config file (defaults when absent) without environment
/// overrides. This is what `config set/unset` edit and save back.
pub fn load_stored_config() -> Result<OctoConfig> {
    let config_path = get_octo_config_file_path()?;

    if !config_path.exists() {
        return Ok(OctoConfig::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Could not read config file at {}", config_path.display()))?;

    serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")
}

/// The effective configuration: the stored file plus `OCTO_*` overrides.
pub fn load_config() -> Result<OctoConfig> {
    let mut config = load_stored_config()?;
    apply_env_overrides(&mut config.settings);
    Ok(config)
}

pub fn apply_env_overrides(settings: &mut OctoSettings) {
    if let Ok(url) = std::env::var("OCTO_STABLE_URL") {
        settings.stable_url = url;
    }

    if let Ok(url) = std::env::var("OCTO_DEV_POINTER_URL") {
        settings.dev_pointer_url = url;
    }

    if let Ok(wrapper) = std::env::var("OCTO_WRAPPER_DIR") {
        settings.wrapper_dir = wrapper;
    }

    if let Ok(secs) = std::env::var("OCTO_HTTP_TIMEOUT_SECS") {
        match secs.parse::<u64>() {
            Ok(secs) => settings.http_timeout_secs = secs,
            Err(_) => tracing::warn!("Ignoring invalid OCTO_HTTP_TIMEOUT_SECS '{}'", secs),
        }
    }

    if let Ok(php) = std::env::var("OCTO_PHP_BINARY") {
        settings.php_binary = php;
    }
}

pub fn save_config(config: &OctoConfig) -> Result<()> {
    let config_path = get_octo_config_file_path()?;
    let config_dir = config_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid config path"))?;

    fs::create_dir_all(config_dir)?;

    let content = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, content)
        .with_context(|| format!("Could not write config file at {}", config_path.display()))?;

    Ok(())
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}

pub fn get_setting(settings: &OctoSettings, key: &str) -> Option<String> {
    let value = match key {
        "stable_url" => settings.stable_url.clone(),
        "dev_pointer_url" => settings.dev_pointer_url.clone(),
        "wrapper_dir" => settings.wrapper_dir.clone(),
        "http_timeout_secs" => settings.http_timeout_secs.to_string(),
        "php_binary" => settings.php_binary.clone(),
        _ => return None,
    };
    Some(value)
}

pub fn set_setting(settings: &mut OctoSettings, key: &str, value: &str) -> Result<()> {
    match key {
        "stable_url" => settings.stable_url = value.to_string(),
        "dev_pointer_url" => settings.dev_pointer_url = value.to_string(),
        "wrapper_dir" => settings.wrapper_dir = value.to_string(),
        "http_timeout_secs" => {
            settings.http_timeout_secs = value
                .parse()
                .with_context(|| format!("Invalid value for '{}': {}", key, value))?;
        }
        "php_binary" => settings.php_binary = value.to_string(),
        _ => anyhow::bail!(
            "'{}' is not a valid configuration setting. Valid settings: {}",
            key,
            SETTING_KEYS.join(", ")
        ),
    }
    Ok(())
}

pub fn unset_setting(settings: &mut OctoSettings, key: &str) -> Result<()> {
    let defaults = OctoSettings::default();
    let value = get_setting(&defaults, key).ok_or_else(|| {
        anyhow::anyhow!(
            "'{}' is not a valid configuration setting. Valid settings: {}",
            key,
            SETTING_KEYS.join(", ")
        )
    })?;
    set_setting(settings, key, &value)
}
