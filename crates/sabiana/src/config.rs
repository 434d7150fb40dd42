//! CLI configuration: thin wrapper around `sabiana_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--base-url, --api-key, etc.).

use std::time::Duration;

use secrecy::SecretString;

use sabiana_core::{CoordinatorConfig, FanMap};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use sabiana_config::{
    Config, Profile, SetpointStrategy, TemperatureSource, config_path, load_config,
    store_api_key,
};

// ── Session ─────────────────────────────────────────────────────────

/// Everything a command needs: coordinator settings plus how to present
/// the units.
#[derive(Debug, Clone)]
pub struct Session {
    pub profile_name: String,
    pub coordinator: CoordinatorConfig,
    pub temperature_source: TemperatureSource,
    pub setpoint_strategy: SetpointStrategy,
    pub fan_map: FanMap,
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// The active profile. A profile named on the command line must exist
/// once any profile is configured; otherwise the defaults apply, so a
/// bare `--api-key` works without a config file.
pub fn active_profile(
    global: &GlobalOpts,
    config: &Config,
    profile_name: &str,
) -> Result<Profile, CliError> {
    if let Some(profile) = config.profiles.get(profile_name) {
        return Ok(profile.clone());
    }
    if global.profile.is_some() && !config.profiles.is_empty() {
        let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name: profile_name.into(),
            available: names.join(", "),
        });
    }
    Ok(Profile::default())
}

/// Translate a `Profile` + global flags into a [`Session`].
///
/// CLI flag overrides take priority over profile values. `poll_interval`
/// overrides the profile's scan interval (used by `watch --interval`).
pub fn resolve_session(
    global: &GlobalOpts,
    config: &Config,
    poll_interval: Option<u64>,
) -> Result<Session, CliError> {
    let profile_name = active_profile_name(global, config);
    let profile = active_profile(global, config, &profile_name)?;

    // 1. Base URL (flag > env > profile)
    let url_str = global.base_url.as_deref().unwrap_or(&profile.base_url);
    let base_url = sabiana_config::parse_base_url(url_str)?;

    // 2. API key (flag > env > profile chain)
    let api_key = resolve_api_key_with_flag(&profile, &profile_name, global)?;

    // 3. Intervals
    let scan_interval = poll_interval
        .or(profile.scan_interval)
        .unwrap_or(config.defaults.scan_interval);
    sabiana_config::validate_scan_interval(scan_interval)?;

    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(config.defaults.timeout);
    if timeout == 0 {
        return Err(CliError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let mut coordinator = CoordinatorConfig::new(api_key)?
        .with_base_url(base_url)
        .with_poll_interval(Duration::from_secs(scan_interval));
    coordinator.timeout = Duration::from_secs(timeout);
    coordinator.pending_ttl = profile.pending_ttl.map(Duration::from_secs);
    coordinator.clock_offset_ms = profile.clock_offset_ms.unwrap_or(0);
    coordinator.validate()?;

    Ok(Session {
        profile_name,
        coordinator,
        temperature_source: profile.temperature_source,
        setpoint_strategy: profile.setpoint_strategy,
        fan_map: profile.fan_map,
    })
}

/// Resolve API key with CLI flag override, then fall through to shared resolution.
fn resolve_api_key_with_flag(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<SecretString, CliError> {
    if let Some(key) = global.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        return Ok(SecretString::from(key.trim().to_owned()));
    }
    Ok(sabiana_config::resolve_api_key(profile, profile_name)?)
}
