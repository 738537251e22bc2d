//! Shared per-process state: one set of middleware collaborators
//! built once at startup and `Arc`-shared across every connection driver,
//! whichever transport accepted it.

use std::sync::Arc;
use std::time::Duration;

use blitz_core::backend::{Backend, BackendPool};
use blitz_core::config::{GatewayConfig, Mode};
use blitz_core::error::GatewayError;
use blitz_core::jwt::{AuthMiddleware, AuthMiddlewareConfig, JwtValidator, JwtValidatorConfig};
use blitz_core::orchestrator::{BackendDispatcher, BackendDispatcherConfig, MiddlewareChain, Router};
use blitz_core::ratelimit::{RateLimiter, RateLimiterConfig};
use blitz_core::telemetry::MetricsCollector;
use blitz_core::time::SystemClock;
use zeroize::Zeroizing;

/// Routes exempt from JWT auth regardless of mode: the built-in
/// health surface must stay reachable for uptime checks.
const UNPROTECTED_PREFIXES: &[&str] = &["/hello", "/health", "/metrics"];

pub struct GatewayState {
    pub rate_limiter: Option<RateLimiter>,
    pub auth: Option<AuthMiddleware>,
    pub router: Router,
    pub metrics: MetricsCollector,
    pub dispatcher: Option<BackendDispatcher>,
    pub clock: SystemClock,
    pub health_check_interval: Duration,
}

impl GatewayState {
    /// Builds the shared state from a validated config snapshot. `jwt_secret`
    /// comes from the CLI/environment rather than the config file and is
    /// required whenever the file declares a `[jwt]` table.
    pub fn build(config: &GatewayConfig, jwt_secret: Option<Zeroizing<Vec<u8>>>) -> Result<Arc<Self>, GatewayError> {
        let rate_limiter = (config.rate_limit.rate_limit > 0.0 || config.rate_limit.rate_limit_per_ip > 0.0).then(|| {
            RateLimiter::new(RateLimiterConfig {
                global_rps: config.rate_limit.rate_limit,
                per_ip_rps: config.rate_limit.rate_limit_per_ip,
                burst_multiplier: config.rate_limit.rate_limit_burst_multiplier,
                cleanup_interval: Duration::from_secs(60),
                max_tracked_ips: 100_000,
            })
        });

        let auth = match &config.jwt {
            Some(jwt_cfg) => {
                let secret = jwt_secret.ok_or_else(|| GatewayError::Internal("config declares [jwt] but no JWT secret was supplied".to_string()))?;
                let validator = JwtValidator::new(JwtValidatorConfig {
                    secret,
                    leeway_seconds: jwt_cfg.leeway_seconds.unwrap_or(0),
                    expected_issuer: jwt_cfg.expected_issuer.clone(),
                    expected_audience: jwt_cfg.expected_audience.clone(),
                });
                let mw_config = AuthMiddlewareConfig {
                    header_name: jwt_cfg.header_name.clone().unwrap_or_else(|| "Authorization".to_string()),
                    scheme_prefix: jwt_cfg.scheme_prefix.clone().unwrap_or_else(|| "Bearer ".to_string()),
                    required_claim: None,
                };
                Some(AuthMiddleware::new(validator, mw_config))
            }
            None => None,
        };

        let dispatcher = match config.mode {
            Mode::LoadBalancer | Mode::Lb => {
                let backends = config.backends.values().map(|b| Backend::new(b.host.clone(), b.port, b.weight, b.health_check_path.clone())).collect();
                let pool = BackendPool::new(backends)?;
                Some(BackendDispatcher::new(
                    pool,
                    BackendDispatcherConfig {
                        max_connections_per_backend: 32,
                        max_idle_time: Duration::from_secs(90),
                        connect_timeout: Duration::from_secs(2),
                        read_timeout: Duration::from_secs(10),
                    },
                ))
            }
            Mode::Origin => None,
        };

        Ok(Arc::new(Self {
            rate_limiter,
            auth,
            router: Router::with_builtins(),
            metrics: MetricsCollector::new(),
            dispatcher,
            clock: SystemClock,
            health_check_interval: Duration::from_secs(config.health_check_interval_seconds),
        }))
    }

    #[must_use]
    pub fn chain(&self) -> MiddlewareChain<'_> {
        MiddlewareChain { rate_limiter: self.rate_limiter.as_ref(), auth: self.auth.as_ref(), unprotected_prefixes: UNPROTECTED_PREFIXES, router: &self.router, metrics: &self.metrics }
    }

    /// Runs the active health-check prober against every backend with a
    /// configured health-check path. Never returns; in origin mode
    /// (no dispatcher) it parks forever so it can still be joined
    /// alongside the listener futures without ending the process early.
    pub async fn run_health_probes(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            blitz_core::backend::run_health_probes(dispatcher.pool(), self.health_check_interval).await;
        } else {
            std::future::pending::<()>().await;
        }
    }
}
