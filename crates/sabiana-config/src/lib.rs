//! Shared configuration for Sabiana Cloud tools.
//!
//! TOML profiles, API key resolution (env + keyring + plaintext),
//! and translation to `sabiana_core::CoordinatorConfig`. The CLI adds
//! flag-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use sabiana_core::config::{DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use sabiana_core::{CoordinatorConfig, FanMap};

/// Keyring service name; entries are keyed `"{profile}/api-key"`.
pub const KEYRING_SERVICE: &str = "sabiana";

/// Longest accepted poll interval.
pub const MAX_SCAN_INTERVAL_SECS: u64 = 3600;
/// Shortest accepted non-zero poll interval. The cloud rate limits.
pub const MIN_SCAN_INTERVAL_SECS: u64 = 5;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Presentation options ────────────────────────────────────────────

/// Which probe reports the "current temperature".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TemperatureSource {
    /// Air probe.
    #[default]
    T1,
    /// Water probe.
    T3,
}

/// Whether to show one target temperature or separate heating/cooling ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SetpointStrategy {
    #[default]
    Single,
    Dual,
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Poll interval in seconds.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            scan_interval: default_scan_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_scan_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

/// A named Sabiana Cloud account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Poll interval override, seconds. 0 disables background polling.
    pub scan_interval: Option<u64>,

    /// Request timeout override, seconds.
    pub timeout: Option<u64>,

    #[serde(default)]
    pub temperature_source: TemperatureSource,

    #[serde(default)]
    pub setpoint_strategy: SetpointStrategy,

    #[serde(default)]
    pub fan_map: FanMap,

    /// Verbose logging for this profile.
    #[serde(default)]
    pub debug: bool,

    /// Drop unconfirmed commands after this many seconds.
    pub pending_ttl: Option<u64>,

    /// Shift applied to local time when stamping commands.
    pub clock_offset_ms: Option<i64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: None,
            scan_interval: None,
            timeout: None,
            temperature_source: TemperatureSource::default(),
            setpoint_strategy: SetpointStrategy::default(),
            fan_map: FanMap::default(),
            debug: false,
            pending_ttl: None,
            clock_offset_ms: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("cloud", "sabiana", "sabiana").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sabiana");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file is not
/// an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SABIANA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an API key from the credential chain (no CLI flag step):
/// `api_key_env` variable, then the system keyring, then plaintext.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(val) = profile
        .api_key_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| !v.trim().is_empty())
    {
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring_api_key(profile_name) {
        return Ok(secret);
    }

    // 3. Plaintext in config
    if let Some(key) = profile.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        return Ok(SecretString::from(key.trim().to_owned()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn keyring_api_key(profile_name: &str) -> Option<SecretString> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key")).ok()?;
    entry.get_password().ok().map(SecretString::from)
}

/// Store an API key in the system keyring for `profile_name`.
pub fn store_api_key(profile_name: &str, key: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
        .map_err(|e| keyring_error(&e))?;
    entry
        .set_password(key.expose_secret())
        .map_err(|e| keyring_error(&e))
}

fn keyring_error(err: &keyring::Error) -> ConfigError {
    ConfigError::Validation {
        field: "keyring".into(),
        reason: err.to_string(),
    }
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `CoordinatorConfig` from a profile, no CLI flag overrides.
///
/// `defaults` supply the timeout and scan interval the profile leaves
/// unset.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    let base_url = parse_base_url(&profile.base_url)?;
    let api_key = resolve_api_key(profile, profile_name)?;

    let scan_interval = profile.scan_interval.unwrap_or(defaults.scan_interval);
    validate_scan_interval(scan_interval)?;

    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    if profile.pending_ttl == Some(0) {
        return Err(ConfigError::Validation {
            field: "pending_ttl".into(),
            reason: "must be at least 1 second, or unset to disable expiry".into(),
        });
    }

    let mut config = CoordinatorConfig::new(api_key)
        .map_err(|e| ConfigError::Validation {
            field: "base_url".into(),
            reason: e.to_string(),
        })?
        .with_base_url(base_url)
        .with_poll_interval(Duration::from_secs(scan_interval));
    config.timeout = Duration::from_secs(timeout);
    config.pending_ttl = profile.pending_ttl.map(Duration::from_secs);
    config.clock_offset_ms = profile.clock_offset_ms.unwrap_or(0);

    config.validate().map_err(|e| ConfigError::Validation {
        field: "api_key".into(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

/// Parse and check a base URL.
pub fn parse_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Validation {
        field: "base_url".into(),
        reason,
    };
    let url: url::Url = raw
        .trim()
        .parse()
        .map_err(|e| invalid(format!("'{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("'{raw}': scheme must be http or https")));
    }
    Ok(url)
}

/// 0 (disabled) or within `MIN_SCAN_INTERVAL_SECS..=MAX_SCAN_INTERVAL_SECS`.
pub fn validate_scan_interval(secs: u64) -> Result<(), ConfigError> {
    if secs == 0 || (MIN_SCAN_INTERVAL_SECS..=MAX_SCAN_INTERVAL_SECS).contains(&secs) {
        return Ok(());
    }
    Err(ConfigError::Validation {
        field: "scan_interval".into(),
        reason: format!(
            "{secs}s is outside {MIN_SCAN_INTERVAL_SECS}..={MAX_SCAN_INTERVAL_SECS} (or 0 to disable)"
        ),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(cfg.default_profile_name(), "default");
        assert_eq!(cfg.defaults.scan_interval, 30);
        assert_eq!(cfg.defaults.timeout, 15);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn loads_profile_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "home"

[profiles.home]
api_key = "abc123"
scan_interval = 60
temperature_source = "t3"
setpoint_strategy = "dual"
pending_ttl = 300

[profiles.home.fan_map]
auto = "auto"
V1 = "quiet"
"#,
        );

        let cfg = load_config_from(&path).unwrap();
        let home = &cfg.profiles["home"];

        assert_eq!(cfg.default_profile_name(), "home");
        assert_eq!(home.base_url, "https://data.sabiana.cloud");
        assert_eq!(home.temperature_source, TemperatureSource::T3);
        assert_eq!(home.setpoint_strategy, SetpointStrategy::Dual);
        assert_eq!(home.fan_map.label("V1"), "quiet");
        assert_eq!(home.fan_map.label("V2"), "v2");
        assert!(!home.debug);
    }

    #[test]
    fn profile_translates_to_coordinator_config() {
        let profile = Profile {
            api_key: Some(" abc123 ".into()),
            scan_interval: Some(45),
            pending_ttl: Some(120),
            clock_offset_ms: Some(-250),
            ..Profile::default()
        };

        let cfg = profile_to_coordinator_config(&profile, "test-translate", &Defaults::default())
            .unwrap();

        assert_eq!(cfg.api_key.expose_secret(), "abc123");
        assert_eq!(cfg.poll_interval, Duration::from_secs(45));
        assert_eq!(cfg.timeout, Duration::from_secs(15));
        assert_eq!(cfg.pending_ttl, Some(Duration::from_secs(120)));
        assert_eq!(cfg.clock_offset_ms, -250);
        assert_eq!(cfg.base_url.as_str(), "https://data.sabiana.cloud/");
    }

    #[test]
    fn rejects_bad_values() {
        let defaults = Defaults::default();
        let with_key = |p: Profile| Profile {
            api_key: Some("k".into()),
            ..p
        };

        let bad_url = with_key(Profile {
            base_url: "ftp://example.test".into(),
            ..Profile::default()
        });
        assert!(matches!(
            profile_to_coordinator_config(&bad_url, "test-bad", &defaults),
            Err(ConfigError::Validation { field, .. }) if field == "base_url"
        ));

        let bad_interval = with_key(Profile {
            scan_interval: Some(2),
            ..Profile::default()
        });
        assert!(profile_to_coordinator_config(&bad_interval, "test-bad", &defaults).is_err());

        let zero_timeout = with_key(Profile {
            timeout: Some(0),
            ..Profile::default()
        });
        assert!(profile_to_coordinator_config(&zero_timeout, "test-bad", &defaults).is_err());

        let zero_ttl = with_key(Profile {
            pending_ttl: Some(0),
            ..Profile::default()
        });
        assert!(matches!(
            profile_to_coordinator_config(&zero_ttl, "test-bad", &defaults),
            Err(ConfigError::Validation { field, .. }) if field == "pending_ttl"
        ));

        assert!(validate_scan_interval(0).is_ok());
    }

    #[test]
    fn api_key_env_takes_precedence() {
        // PATH is always set, which is all this needs.
        let profile = Profile {
            api_key_env: Some("PATH".into()),
            api_key: Some("plaintext".into()),
            ..Profile::default()
        };
        let key = resolve_api_key(&profile, "test-env").unwrap();
        assert_ne!(key.expose_secret(), "plaintext");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "office".into(),
            Profile {
                api_key_env: Some("OFFICE_KEY".into()),
                scan_interval: Some(120),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let office = &loaded.profiles["office"];
        assert_eq!(office.api_key_env.as_deref(), Some("OFFICE_KEY"));
        assert_eq!(office.scan_interval, Some(120));
        assert_eq!(office.fan_map, FanMap::default());
    }
}
