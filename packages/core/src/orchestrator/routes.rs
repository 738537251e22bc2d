//! Built-in routes: `/hello`, a health check, and a metrics
//! snapshot proxy. Anything else not matched here is a backend dispatch
//! decision, made by the caller using [`crate::backend::BackendPool`]
//! before this layer is reached again to format the proxied response.

use std::collections::HashMap;

use super::middleware::ResponseContext;
use crate::telemetry::MetricsSnapshot;

type Handler = fn() -> ResponseContext;

pub struct Router {
    routes: HashMap<&'static str, Handler>,
}

impl Router {
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut routes: HashMap<&'static str, Handler> = HashMap::new();
        routes.insert("/hello", hello);
        routes.insert("/health", health);
        Self { routes }
    }

    #[must_use]
    pub fn is_builtin(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }
}

fn hello() -> ResponseContext {
    ResponseContext { status: 200, reason: "OK", body: b"Hello, Blitz!".to_vec() }
}

fn health() -> ResponseContext {
    ResponseContext { status: 200, reason: "OK", body: b"ok".to_vec() }
}

/// Dispatches a request that has already passed rate-limit and auth
/// checks. Routes not recognized as built-ins are the caller's cue to
/// forward through the backend pool; this function itself only ever
/// returns a built-in's response or a 404.
pub fn dispatch(router: &Router, _method: &str, path: &str) -> ResponseContext {
    match router.routes.get(path) {
        Some(handler) => handler(),
        None => ResponseContext { status: 404, reason: "Not Found", body: Vec::new() },
    }
}

/// Renders a metrics snapshot as the JSON body for the metrics proxy
/// route, consumed by the external Prometheus/OTLP exporter rather than
/// served directly to clients.
pub fn render_metrics(snapshot: &MetricsSnapshot) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_route_responds_with_the_canonical_body() {
        let router = Router::with_builtins();
        let resp = dispatch(&router, "GET", "/hello");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"Hello, Blitz!");
    }

    #[test]
    fn unmatched_route_is_404() {
        let router = Router::with_builtins();
        let resp = dispatch(&router, "GET", "/does-not-exist");
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn metrics_snapshot_renders_to_json() {
        let snapshot = MetricsSnapshot { requests_total: 5, ..Default::default() };
        let bytes = render_metrics(&snapshot).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("\"requests_total\":5"));
    }
}
