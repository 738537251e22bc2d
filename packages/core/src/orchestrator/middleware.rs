//! The per-request middleware chain: rate-limit by peer IP, then
//! JWT auth unless the path is on the unprotected list, then route
//! dispatch. Pure with respect to I/O — callers supply the parsed
//! request and get back a response descriptor, so the same pipeline
//! drives HTTP/1.x, HTTP/2 and HTTP/3 alike.

use std::net::IpAddr;

use crate::error::{GatewayError, JwtError, RateLimitError};
use crate::jwt::AuthMiddleware;
use crate::ratelimit::RateLimiter;
use crate::telemetry::MetricsCollector;

use super::backend_dispatch::BackendDispatcher;
use super::routes::{self, Router};

pub struct RequestContext<'a> {
    pub peer_ip: IpAddr,
    pub method: &'a str,
    pub path: &'a str,
    pub auth_header: Option<&'a str>,
    pub now_unix: i64,
}

pub struct ResponseContext {
    pub status: u16,
    pub reason: &'static str,
    pub body: Vec<u8>,
}

impl ResponseContext {
    pub(super) fn from_error(err: &GatewayError) -> Self {
        Self { status: err.status_code(), reason: err.reason_phrase(), body: Vec::new() }
    }
}

pub struct MiddlewareChain<'a> {
    pub rate_limiter: Option<&'a RateLimiter>,
    pub auth: Option<&'a AuthMiddleware>,
    pub unprotected_prefixes: &'a [&'a str],
    pub router: &'a Router,
    pub metrics: &'a MetricsCollector,
}

impl<'a> MiddlewareChain<'a> {
    /// Rate-limit and auth only; routes not recognized as built-ins fall
    /// through to a 404. Used when no backend is configured to forward
    /// to (load-balancer mode is the only case that needs more).
    pub fn handle(&self, ctx: &RequestContext<'_>, now: std::time::Instant) -> ResponseContext {
        match self.check_policy(ctx, now) {
            Ok(()) => routes::dispatch(self.router, ctx.method, ctx.path),
            Err(denied) => denied,
        }
    }

    /// Same policy chain as [`Self::handle`], but forwards through
    /// `dispatcher` when the path isn't a built-in route.
    pub async fn handle_with_backend(&self, ctx: &RequestContext<'_>, now: std::time::Instant, dispatcher: &BackendDispatcher, body: &[u8]) -> ResponseContext {
        if let Err(denied) = self.check_policy(ctx, now) {
            return denied;
        }
        if self.router.is_builtin(ctx.path) {
            return routes::dispatch(self.router, ctx.method, ctx.path);
        }
        dispatcher.forward(ctx.method, ctx.path, body).await
    }

    fn check_policy(&self, ctx: &RequestContext<'_>, now: std::time::Instant) -> Result<(), ResponseContext> {
        self.metrics.record_request(0);

        if let Some(limiter) = self.rate_limiter {
            if let Err(err) = limiter.check(ctx.peer_ip, now) {
                self.metrics.record_rate_limited(err == RateLimitError::Global);
                return Err(ResponseContext::from_error(&GatewayError::RateLimit(err)));
            }
        }

        if let Some(auth) = self.auth {
            if !is_unprotected(ctx.path, self.unprotected_prefixes) {
                if let Err(err) = auth.authenticate(ctx.auth_header, ctx.now_unix) {
                    self.metrics.record_jwt_rejected();
                    return Err(ResponseContext::from_error(&GatewayError::Jwt(err)));
                }
            }
        }

        Ok(())
    }
}

fn is_unprotected(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{AuthMiddlewareConfig, JwtValidator, JwtValidatorConfig};
    use crate::ratelimit::RateLimiterConfig;
    use std::time::{Duration, Instant};
    use zeroize::Zeroizing;

    fn chain<'a>(
        metrics: &'a MetricsCollector,
        limiter: &'a RateLimiter,
        auth: &'a AuthMiddleware,
        router: &'a Router,
    ) -> MiddlewareChain<'a> {
        MiddlewareChain { rate_limiter: Some(limiter), auth: Some(auth), unprotected_prefixes: &["/hello", "/health"], router, metrics }
    }

    #[test]
    fn unprotected_path_skips_auth_and_reaches_the_route() {
        let metrics = MetricsCollector::new();
        let limiter = RateLimiter::new(RateLimiterConfig { global_rps: 100.0, per_ip_rps: 100.0, burst_multiplier: 2.0, cleanup_interval: Duration::from_secs(60), max_tracked_ips: 100 });
        let validator = JwtValidator::new(JwtValidatorConfig { secret: Zeroizing::new(b"s".to_vec()), leeway_seconds: 0, expected_issuer: None, expected_audience: None });
        let auth = AuthMiddleware::new(validator, AuthMiddlewareConfig::default());
        let router = Router::with_builtins();
        let mw = chain(&metrics, &limiter, &auth, &router);

        let ctx = RequestContext { peer_ip: "127.0.0.1".parse().unwrap(), method: "GET", path: "/hello", auth_header: None, now_unix: 0 };
        let resp = mw.handle(&ctx, Instant::now());
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn protected_path_without_a_token_is_denied_with_401() {
        let metrics = MetricsCollector::new();
        let limiter = RateLimiter::new(RateLimiterConfig { global_rps: 100.0, per_ip_rps: 100.0, burst_multiplier: 2.0, cleanup_interval: Duration::from_secs(60), max_tracked_ips: 100 });
        let validator = JwtValidator::new(JwtValidatorConfig { secret: Zeroizing::new(b"s".to_vec()), leeway_seconds: 0, expected_issuer: None, expected_audience: None });
        let auth = AuthMiddleware::new(validator, AuthMiddlewareConfig::default());
        let router = Router::with_builtins();
        let mw = chain(&metrics, &limiter, &auth, &router);

        let ctx = RequestContext { peer_ip: "127.0.0.1".parse().unwrap(), method: "GET", path: "/secret", auth_header: None, now_unix: 0 };
        let resp = mw.handle(&ctx, Instant::now());
        assert_eq!(resp.status, 401);
    }

    #[test]
    fn exhausted_rate_limit_is_denied_with_429_before_auth_runs() {
        let metrics = MetricsCollector::new();
        let limiter = RateLimiter::new(RateLimiterConfig { global_rps: 1.0, per_ip_rps: 100.0, burst_multiplier: 1.0, cleanup_interval: Duration::from_secs(60), max_tracked_ips: 100 });
        let validator = JwtValidator::new(JwtValidatorConfig { secret: Zeroizing::new(b"s".to_vec()), leeway_seconds: 0, expected_issuer: None, expected_audience: None });
        let auth = AuthMiddleware::new(validator, AuthMiddlewareConfig::default());
        let router = Router::with_builtins();
        let mw = chain(&metrics, &limiter, &auth, &router);

        let now = Instant::now();
        let ctx = RequestContext { peer_ip: "127.0.0.1".parse().unwrap(), method: "GET", path: "/hello", auth_header: None, now_unix: 0 };
        assert_eq!(mw.handle(&ctx, now).status, 200);
        assert_eq!(mw.handle(&ctx, now).status, 429);
    }
}
