//! Binds listeners and runs role routers until cancelled.

use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use clap::ValueEnum;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use trustmesh_gateway::GatewayModule;
use trustmesh_issuer::IssuerModule;
use trustmesh_order::OrderModule;

use crate::config::AppConfig;

/// Which part of the mesh this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Issuer,
    Gateway,
    Order,
    /// Issuer, gateway and order service in one process.
    All,
}

impl Role {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Role::Issuer => "issuer",
            Role::Gateway => "gateway",
            Role::Order => "order",
            Role::All => "all",
        }
    }
}

/// Router and bind address for a single role.
///
/// # Errors
///
/// Fails for [`Role::All`] or when the role's configuration is rejected by its module.
pub fn build_router(role: Role, cfg: &AppConfig) -> anyhow::Result<(Router, &str)> {
    match role {
        Role::Issuer => Ok((
            IssuerModule::from_config(&cfg.issuer).router(),
            &cfg.issuer.bind_addr,
        )),
        Role::Gateway => Ok((
            GatewayModule::from_config(&cfg.gateway)?.router(),
            &cfg.gateway.bind_addr,
        )),
        Role::Order => Ok((
            OrderModule::from_config(&cfg.order).router(),
            &cfg.order.bind_addr,
        )),
        Role::All => anyhow::bail!("`all` is not a single role"),
    }
}

/// Run `role` until `cancel` fires or a server fails.
///
/// # Errors
///
/// Returns the first bind or serve failure.
pub async fn run(role: Role, cfg: &AppConfig, cancel: &CancellationToken) -> anyhow::Result<()> {
    if role != Role::All {
        return run_role(role, cfg, cancel).await;
    }

    let (issuer, gateway, order) = tokio::join!(
        run_role(Role::Issuer, cfg, cancel),
        run_role(Role::Gateway, cfg, cancel),
        run_role(Role::Order, cfg, cancel),
    );
    issuer.and(gateway).and(order)
}

async fn run_role(role: Role, cfg: &AppConfig, cancel: &CancellationToken) -> anyhow::Result<()> {
    let result = async {
        let (router, bind_addr) = build_router(role, cfg)?;
        let addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("invalid {} bind_addr", role.name()))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {} on {addr}", role.name()))?;
        serve(role.name(), listener, router, cancel.clone()).await
    }
    .await;

    // One role going down takes the others with it.
    if result.is_err() {
        cancel.cancel();
    }
    result
}

/// Serve `router` on an already bound listener with graceful shutdown.
///
/// # Errors
///
/// Returns the underlying server error.
pub async fn serve(
    name: &str,
    listener: TcpListener,
    router: Router,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(role = name, %addr, "HTTP server bound");

    let role = name.to_owned();
    let shutdown = async move {
        cancel.cancelled().await;
        tracing::info!(role = %role, "HTTP server shutting down gracefully");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
