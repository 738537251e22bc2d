//! Command-line entry point: `--mode`, `--listen`, `--cert`,
//! `--key`, `--config` override or supply what the TOML file would
//! otherwise provide. CLI flags win over the file so an operator can
//! patch a single value without editing the config on disk.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "blitz-gateway", about = "Edge gateway dataplane: HTTP/1.1, HTTP/2 and HTTP/3 termination")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "BLITZ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides the config file's `listen` key.
    #[arg(long, env = "BLITZ_LISTEN")]
    pub listen: Option<String>,

    /// Overrides the config file's `mode` key (`origin`, `load_balancer`, `lb`).
    #[arg(long, env = "BLITZ_MODE")]
    pub mode: Option<String>,

    /// TLS certificate chain, PEM-encoded.
    #[arg(long, env = "BLITZ_CERT")]
    pub cert: PathBuf,

    /// TLS private key, PEM-encoded.
    #[arg(long, env = "BLITZ_KEY")]
    pub key: PathBuf,

    /// HS256 signing secret for JWT validation. Kept out of the TOML file
    /// so it never lands on disk alongside the rest of the config.
    #[arg(long, env = "BLITZ_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,
}
