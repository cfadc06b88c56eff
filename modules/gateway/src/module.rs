use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware::from_fn_with_state;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use trustmesh_auth::{Hs256TokenCodec, TokenCodec};
use trustmesh_security::AssertionCodec;

use crate::auth::{EdgeAuthState, edge_auth_middleware};
use crate::config::GatewayConfig;
use crate::proxy::{HyperUpstream, ProxyState, Upstream, proxy_handler};
use crate::routes::RouteTable;
use crate::stage::GatewayAuthStage;

/// Gateway role: edge authentication in front of the identity-forwarding proxy.
#[derive(Clone)]
pub struct GatewayModule {
    auth: EdgeAuthState,
    proxy: ProxyState,
    body_limit_bytes: usize,
}

impl GatewayModule {
    /// Build the gateway with the default HTTP upstream.
    ///
    /// # Errors
    ///
    /// Fails when the route table is invalid.
    pub fn from_config(cfg: &GatewayConfig) -> anyhow::Result<Self> {
        let upstream = HyperUpstream::new(Duration::from_secs(cfg.upstream_timeout_secs));
        Self::with_upstream(cfg, Arc::new(upstream))
    }

    /// Build the gateway around a caller-supplied upstream.
    ///
    /// # Errors
    ///
    /// Fails when the route table is invalid.
    pub fn with_upstream(cfg: &GatewayConfig, upstream: Arc<dyn Upstream>) -> anyhow::Result<Self> {
        let routes = RouteTable::build(&cfg.routes)?;
        let codec: Arc<dyn TokenCodec> =
            Arc::new(Hs256TokenCodec::new(&cfg.signing_key).with_leeway(cfg.leeway_secs));
        let assertion_codec = AssertionCodec::from_key(cfg.assertion_key.clone());

        tracing::info!(
            routes = cfg.routes.len(),
            signed_assertions = assertion_codec.is_signed(),
            audience = cfg.audience.as_deref().unwrap_or("-"),
            "gateway configured"
        );

        Ok(Self {
            auth: EdgeAuthState {
                codec,
                routes,
                audience: cfg.audience.clone(),
            },
            proxy: ProxyState {
                stage: GatewayAuthStage::new(assertion_codec, cfg.forward_params.clone()),
                upstream,
            },
            body_limit_bytes: cfg.body_limit_bytes,
        })
    }

    /// Router: every path goes through edge auth, then the proxy.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(self.proxy.clone())
            .layer(from_fn_with_state(self.auth.clone(), edge_auth_middleware))
            .layer(RequestBodyLimitLayer::new(self.body_limit_bytes))
            .layer(TraceLayer::new_for_http())
    }
}
