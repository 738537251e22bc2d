//! Process entry point: parse the CLI, load and validate the TOML
//! config, build the shared `GatewayState`, and run the TCP and QUIC
//! listeners side by side until either exits.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use zeroize::Zeroizing;

use blitz_gateway::cli::Cli;
use blitz_gateway::{config_loader, logging, quic_listener, state::GatewayState, tcp_listener, tls_setup};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("blitz-gateway.toml"));
    let config = config_loader::load(&config_path, cli.listen.as_deref(), cli.mode.as_deref()).with_context(|| format!("loading config from {}", config_path.display()))?;

    let jwt_secret = cli.jwt_secret.map(|s| Zeroizing::new(s.into_bytes()));
    let state = GatewayState::build(&config, jwt_secret).context("building gateway state")?;

    let tcp_tls = tls_setup::load_server_config(&cli.cert, &cli.key, tls_setup::TCP_ALPN)?;
    let quic_tls = tls_setup::load_server_config(&cli.cert, &cli.key, tls_setup::QUIC_ALPN)?;

    let listen = config.listen.clone();
    let tcp_state = Arc::clone(&state);
    let quic_state = Arc::clone(&state);
    let health_state = Arc::clone(&state);
    let tcp_listen = listen.clone();
    let quic_listen = listen.clone();

    tracing::info!(addr = %listen, mode = ?config.mode, "starting blitz-gateway");

    tokio::try_join!(
        async move { tcp_listener::serve(&tcp_listen, tcp_tls, tcp_state).await.context("TCP listener") },
        async move { quic_listener::serve(&quic_listen, quic_tls, quic_state).await.context("QUIC listener") },
        async move {
            health_state.run_health_probes().await;
            Ok(())
        },
    )?;

    Ok(())
}
