//! Immutable configuration snapshot: the core consumes this
//! already-parsed, already-validated type and never reads a file itself
//! (file reading and TOML parsing are the `gateway` binary's job).

use serde::Deserialize;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Origin,
    LoadBalancer,
    #[serde(rename = "lb")]
    Lb,
}

impl Mode {
    #[must_use]
    pub fn is_load_balanced(self) -> bool {
        matches!(self, Mode::LoadBalancer | Mode::Lb)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_weight")]
    pub weight: u32,
    pub health_check_path: Option<String>,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub rate_limit: f64,
    pub rate_limit_per_ip: f64,
    #[serde(default = "default_burst_multiplier")]
    pub rate_limit_burst_multiplier: f64,
    #[serde(default)]
    pub rate_limit_enable_ebpf: bool,
}

fn default_burst_multiplier() -> f64 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub metrics_enabled: bool,
    pub metrics_port: Option<u16>,
    pub metrics_otlp_endpoint: Option<String>,
    #[serde(default)]
    pub metrics_prometheus_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub header_name: Option<String>,
    pub scheme_prefix: Option<String>,
    pub expected_issuer: Option<String>,
    pub expected_audience: Option<String>,
    pub leeway_seconds: Option<i64>,
}

/// The full parsed configuration snapshot. `Arc`-shared across worker
/// threads and never mutated after load.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub listen: String,
    pub mode: Mode,
    #[serde(flatten)]
    pub rate_limit: RateLimitConfig,
    #[serde(flatten)]
    pub metrics: MetricsConfig,
    pub jwt: Option<JwtConfig>,
    #[serde(default)]
    pub backends: std::collections::BTreeMap<String, BackendConfig>,
    #[serde(default = "default_health_check_interval_seconds")]
    pub health_check_interval_seconds: u64,
}

fn default_health_check_interval_seconds() -> u64 {
    10
}

impl GatewayConfig {
    /// Validates cross-field invariants: backend weights are positive,
    /// and load-balancer mode requires at least one backend.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.mode.is_load_balanced() && self.backends.is_empty() {
            return Err(GatewayError::Internal("load-balancer mode requires at least one backend".to_string()));
        }
        for (name, backend) in &self.backends {
            if backend.weight < 1 {
                return Err(GatewayError::Internal(format!("backend '{name}' has weight {} but weight must be >= 1", backend.weight)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> GatewayConfig {
        GatewayConfig {
            listen: "0.0.0.0:8443".to_string(),
            mode: Mode::Origin,
            rate_limit: RateLimitConfig { rate_limit: 100.0, rate_limit_per_ip: 10.0, rate_limit_burst_multiplier: 2.0, rate_limit_enable_ebpf: false },
            metrics: MetricsConfig { metrics_enabled: false, metrics_port: None, metrics_otlp_endpoint: None, metrics_prometheus_enabled: false },
            jwt: None,
            backends: std::collections::BTreeMap::new(),
            health_check_interval_seconds: 10,
        }
    }

    #[test]
    fn origin_mode_does_not_require_backends() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn load_balancer_mode_requires_at_least_one_backend() {
        let mut config = base_config();
        config.mode = Mode::LoadBalancer;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_weight_backend_is_rejected() {
        let mut config = base_config();
        config.mode = Mode::LoadBalancer;
        config.backends.insert("a".to_string(), BackendConfig { host: "h".to_string(), port: 1, weight: 0, health_check_path: None });
        assert!(config.validate().is_err());
    }
}
