use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::rest::routes;
use crate::config::IssuerConfig;
use crate::domain::service::TokenService;

/// Issuer role: owns the token service and exposes its HTTP router.
#[derive(Clone)]
pub struct IssuerModule {
    service: Arc<TokenService>,
}

impl IssuerModule {
    #[must_use]
    pub fn from_config(cfg: &IssuerConfig) -> Self {
        tracing::info!(
            clients = cfg.clients.len(),
            users = cfg.users.len(),
            ttl_secs = cfg.token_ttl_secs,
            "issuer configured"
        );
        Self {
            service: Arc::new(TokenService::from_config(cfg)),
        }
    }

    #[must_use]
    pub fn service(&self) -> Arc<TokenService> {
        Arc::clone(&self.service)
    }

    #[must_use]
    pub fn router(&self) -> Router {
        routes::register_routes(Router::new(), self.service())
            .layer(TraceLayer::new_for_http())
    }
}
