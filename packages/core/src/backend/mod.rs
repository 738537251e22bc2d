//! Backend dispatch: round-robin pool with health tracking, and a
//! per-backend pooled-connection cache.

mod connection_pool;
mod health;
mod pool;
mod prober;

pub use connection_pool::{ConnectionPool, PooledConnection};
pub use health::Health;
pub use pool::{Backend, BackendPool};
pub use prober::run as run_health_probes;
