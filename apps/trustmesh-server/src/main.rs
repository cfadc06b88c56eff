use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use trustmesh_server::{AppConfig, Role, observability, run};

#[derive(Parser, Debug)]
#[command(name = "trustmesh-server")]
#[command(about = "Issuer, edge gateway and resource service of a TrustMesh deployment")]
struct Cli {
    /// YAML configuration file; `TRUSTMESH__*` variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Role to run
    #[arg(value_enum)]
    role: Role,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?;
    observability::init_logging(&cfg.logging)?;

    tracing::info!(role = cli.role.name(), "starting trustmesh-server");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        tracing::info!("shutdown signal received");
        on_signal.cancel();
    });

    run(cli.role, &cfg, &cancel).await
}
