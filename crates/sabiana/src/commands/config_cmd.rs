//! Config subcommand handlers.

use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "scan_interval = {}", cfg.defaults.scan_interval);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "base_url = \"{}\"", p.base_url);
        if p.api_key.is_some() {
            let _ = writeln!(out, "api_key = \"****\"");
        }
        if let Some(ref env) = p.api_key_env {
            let _ = writeln!(out, "api_key_env = \"{env}\"");
        }
        if let Some(secs) = p.scan_interval {
            let _ = writeln!(out, "scan_interval = {secs}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        let _ = writeln!(out, "temperature_source = \"{}\"", p.temperature_source);
        let _ = writeln!(out, "setpoint_strategy = \"{}\"", p.setpoint_strategy);
        if let Some(ttl) = p.pending_ttl {
            let _ = writeln!(out, "pending_ttl = {ttl}");
        }
        if let Some(offset) = p.clock_offset_ms {
            let _ = writeln!(out, "clock_offset_ms = {offset}");
        }
        if p.debug {
            let _ = writeln!(out, "debug = true");
        }
        let fans: Vec<String> = p
            .fan_map
            .iter()
            .map(|(api, label)| format!("{api} = \"{label}\""))
            .collect();
        let _ = writeln!(out, "fan_map = {{ {} }}", fans.join(", "));
    }

    out
}

// ── Handler ─────────────────────────────────────────────────────────

/// `cfg` is the result of loading the config file; only `show` and
/// `set-key` need it to have loaded.
pub fn handle(
    args: ConfigArgs,
    global: &GlobalOpts,
    cfg: Result<Config, CliError>,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = cfg?;
            output::print_output(&format_config_redacted(&cfg), global.quiet);
            Ok(())
        }

        ConfigCommand::SetKey { key } => {
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Validation {
                    field: "api_key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }
            let cfg = cfg?;
            let profile_name = config::active_profile_name(global, &cfg);
            config::store_api_key(&profile_name, &SecretString::from(key.to_owned()))?;
            if !global.quiet {
                eprintln!("API key stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}
