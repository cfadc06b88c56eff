use axum::Router;
use tower_http::trace::TraceLayer;
use trustmesh_auth::ResourceAuthLayer;
use trustmesh_security::AssertionCodec;

use crate::api::rest::routes;
use crate::config::OrderServiceConfig;

/// Order resource service: trusts the gateway's forwarded identity.
#[derive(Debug, Clone)]
pub struct OrderModule {
    codec: AssertionCodec,
}

impl OrderModule {
    #[must_use]
    pub fn from_config(cfg: &OrderServiceConfig) -> Self {
        let codec = AssertionCodec::from_key(cfg.assertion_key.clone());
        tracing::info!(signed_assertions = codec.is_signed(), "order service configured");
        Self { codec }
    }

    /// Router with the resource auth layer in front of every handler.
    #[must_use]
    pub fn router(&self) -> Router {
        routes::register_routes(Router::new())
            .layer(ResourceAuthLayer::new(self.codec.clone()))
            .layer(TraceLayer::new_for_http())
    }
}
