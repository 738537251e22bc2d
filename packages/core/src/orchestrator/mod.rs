//! Request orchestrator: one connection driver per transport,
//! all funneling into the same rate-limit → auth → route middleware
//! chain.

mod backend_dispatch;
mod h1;
mod h2;
mod h3;
mod middleware;
mod routes;

pub use backend_dispatch::{BackendDispatcher, BackendDispatcherConfig};
pub use h1::serve_connection as serve_http1_connection;
pub use h2::serve_connection as serve_http2_connection;
pub use h3::handle_request_stream as handle_http3_request_stream;
pub use middleware::{MiddlewareChain, RequestContext, ResponseContext};
pub use routes::{render_metrics, Router};
