//! Persistent configuration and user preferences.
//!
//! Stored as TOML at `<config dir>/vpnshell/config.toml`. A missing file means
//! defaults; unknown keys are rejected so typos surface early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants;
use crate::state::Protocol;

/// Configuration loading and saving errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the platform configuration directory")]
    NoConfigDir,
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("Unknown preference: {0}")]
    UnknownKey(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// General preferences read at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preferences {
    /// Connect as soon as the user is logged in and configuration is synced.
    pub auto_connect_on_launch: bool,
    /// Let the engine pick the fastest server overall.
    pub connect_to_fastest_server: bool,
    /// Let the engine pick the fastest server in `selected_country`.
    pub connect_to_fastest_server_in_country: bool,
    /// Country name used with `connect_to_fastest_server_in_country`.
    pub selected_country: Option<String>,
    /// App starts hidden; sync or refresh in the background right away.
    pub hide_on_app_launch: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_connect_on_launch: true,
            connect_to_fastest_server: false,
            connect_to_fastest_server_in_country: false,
            selected_country: None,
            hide_on_app_launch: false,
        }
    }
}

/// Keys accepted by [`AppConfig::set`].
pub const SETTABLE_KEYS: [&str; 8] = [
    "protocol",
    "enable_in_app_purchase",
    "signup_url",
    "auto_connect_on_launch",
    "connect_to_fastest_server",
    "connect_to_fastest_server_in_country",
    "selected_country",
    "hide_on_app_launch",
];

/// Whole configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Protocol the simulated engine starts with.
    pub protocol: Protocol,
    /// Show the in-app signup flow instead of opening the signup page.
    pub enable_in_app_purchase: bool,
    /// Signup page for builds without in-app purchase.
    pub signup_url: String,
    pub preferences: Preferences,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            enable_in_app_purchase: true,
            signup_url: constants::DEFAULT_SIGNUP_URL.to_string(),
            preferences: Preferences::default(),
        }
    }
}

impl AppConfig {
    /// Loads `config.toml` from `dir`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(constants::CONFIG_FILE_NAME);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config =
            toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
        Ok(config)
    }

    /// Writes `config.toml` into `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ConfigError> {
        fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(constants::CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Sets one key from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys or values that do not parse.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let flag = || parse_bool(value).ok_or_else(invalid);
        let prefs = &mut self.preferences;

        match key {
            "protocol" => self.protocol = value.parse().map_err(|_| invalid())?,
            "enable_in_app_purchase" => self.enable_in_app_purchase = flag()?,
            "signup_url" => self.signup_url = value.to_string(),
            "auto_connect_on_launch" => prefs.auto_connect_on_launch = flag()?,
            "connect_to_fastest_server" => prefs.connect_to_fastest_server = flag()?,
            "connect_to_fastest_server_in_country" => {
                prefs.connect_to_fastest_server_in_country = flag()?;
            }
            "selected_country" => {
                prefs.selected_country = Some(value.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
            "hide_on_app_launch" => prefs.hide_on_app_launch = flag()?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Resolves the configuration directory.
///
/// An explicit directory (from `--config-dir` or `VPNSHELL_CONFIG_DIR`) wins
/// over the platform default.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] if no directory is given and the
/// platform has none.
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    dirs::config_dir()
        .map(|base| base.join(constants::CONFIG_DIR_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.preferences.auto_connect_on_launch);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.set("protocol", "openvpn-tcp").unwrap();
        config.set("connect_to_fastest_server_in_country", "yes").unwrap();
        config.set("selected_country", "Netherlands").unwrap();

        let path = config.save(&dir.path().join("nested")).unwrap();
        assert!(path.ends_with(constants::CONFIG_FILE_NAME));

        let loaded = AppConfig::load(&dir.path().join("nested")).unwrap();
        assert_eq!(loaded.protocol, Protocol::OpenVpnTcp);
        assert!(loaded.preferences.connect_to_fastest_server_in_country);
        assert_eq!(
            loaded.preferences.selected_country.as_deref(),
            Some("Netherlands")
        );
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(constants::CONFIG_FILE_NAME),
            "protocol = \"ikev2\"\n[preferences]\nhide_on_app_launch = true\n",
        )
        .unwrap();

        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.protocol, Protocol::Ikev2);
        assert!(config.preferences.hide_on_app_launch);
        assert!(config.preferences.auto_connect_on_launch);
        assert!(config.enable_in_app_purchase);
    }

    #[test]
    fn test_every_protocol_name_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        for protocol in Protocol::ALL {
            std::fs::write(
                dir.path().join(constants::CONFIG_FILE_NAME),
                format!("protocol = \"{}\"\n", protocol.as_str()),
            )
            .unwrap();
            let config = AppConfig::load(dir.path()).unwrap();
            assert_eq!(config.protocol, protocol);
        }
    }

    #[test]
    fn test_set_protocol_saves_cli_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.set("protocol", "openvpn-tcp").unwrap();
        let path = config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("protocol = \"openvpn-tcp\""));
        assert_eq!(
            AppConfig::load(dir.path()).unwrap().protocol,
            Protocol::OpenVpnTcp
        );
    }

    #[test]
    fn test_unknown_key_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(constants::CONFIG_FILE_NAME),
            "[preferences]\nauto_conect = true\n",
        )
        .unwrap();

        let err = AppConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = AppConfig::default();
        assert!(matches!(
            config.set("volume", "11"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.set("hide_on_app_launch", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("protocol", "pptp"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_clearing_selected_country() {
        let mut config = AppConfig::default();
        config.set("selected_country", "Germany").unwrap();
        config.set("selected_country", "  ").unwrap();
        assert_eq!(config.preferences.selected_country, None);
    }

    #[test]
    fn test_explicit_config_dir_wins() {
        let dir = Path::new("/tmp/vpnshell-test");
        assert_eq!(resolve_config_dir(Some(dir)).unwrap(), dir);
    }
}
