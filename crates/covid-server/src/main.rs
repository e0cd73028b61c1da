use clap::Parser;
use covid_server::{AppState, config, router};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "covid-server", version, about = "COVID-19 impact estimator service")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address, e.g. 127.0.0.1:8080
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        cfg.server.bind = bind;
    }
    let addr = cfg.server.socket_addr()?;

    tracing::info!(
        audit_mode = %cfg.audit.mode,
        audit_path = %cfg.audit.resolved_path().display(),
        fault_path = %cfg.faults.path.display(),
        "Starting covid-server"
    );

    let app = router(AppState::from_config(&cfg));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, base = %cfg.server.base(), "covid-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("covid-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
