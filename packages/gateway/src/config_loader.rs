//! TOML configuration loading. Reads the file, rejects
//! unknown top-level keys before deserializing (a config typo should be a
//! startup error, not a silently-ignored setting), then applies CLI
//! overrides for `listen` and `mode`.

use std::path::Path;

use blitz_core::config::GatewayConfig;
use thiserror::Error;

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &[
    "listen",
    "mode",
    "rate_limit",
    "rate_limit_per_ip",
    "rate_limit_burst_multiplier",
    "rate_limit_enable_ebpf",
    "metrics_enabled",
    "metrics_port",
    "metrics_otlp_endpoint",
    "metrics_prometheus_enabled",
    "jwt",
    "backends",
    "health_check_interval_seconds",
];

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("config file has unknown top-level key '{0}'")]
    UnknownKey(String),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] blitz_core::GatewayError),
}

pub fn load(path: &Path, cli_listen: Option<&str>, cli_mode: Option<&str>) -> Result<GatewayConfig, ConfigLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read { path: path.display().to_string(), source })?;
    reject_unknown_keys(&raw)?;

    let mut config: GatewayConfig = toml::from_str(&raw)?;

    if let Some(listen) = cli_listen {
        config.listen = listen.to_string();
    }
    if let Some(mode) = cli_mode {
        config.mode = parse_mode(mode)?;
    }

    config.validate()?;
    Ok(config)
}

fn reject_unknown_keys(raw: &str) -> Result<(), ConfigLoadError> {
    let value: toml::Value = toml::from_str(raw)?;
    let Some(table) = value.as_table() else {
        return Ok(());
    };
    for key in table.keys() {
        if !KNOWN_TOP_LEVEL_KEYS.contains(&key.as_str()) {
            return Err(ConfigLoadError::UnknownKey(key.clone()));
        }
    }
    Ok(())
}

fn parse_mode(raw: &str) -> Result<blitz_core::config::Mode, ConfigLoadError> {
    use blitz_core::config::Mode;
    match raw {
        "origin" => Ok(Mode::Origin),
        "load_balancer" => Ok(Mode::LoadBalancer),
        "lb" => Ok(Mode::Lb),
        other => Err(ConfigLoadError::Invalid(blitz_core::GatewayError::Internal(format!("unrecognized --mode value '{other}'")))),
    }
}
