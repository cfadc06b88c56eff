//! Reverse-proxy collaborator.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use http::header::{self, HeaderName};
use http::uri::{PathAndQuery, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::auth::{AuthenticatedPrincipal, MatchedRoute};
use crate::error::GatewayError;
use crate::routes::Route;
use crate::stage::GatewayAuthStage;

/// Sends a fully prepared request to its upstream.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// # Errors
    ///
    /// Returns [`GatewayError::Upstream`] or [`GatewayError::UpstreamTimeout`].
    async fn send(&self, request: Request) -> Result<Response, GatewayError>;
}

/// HTTP/1 upstream over the `hyper-util` legacy client.
#[derive(Clone)]
pub struct HyperUpstream {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HyperUpstream {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }
}

#[async_trait]
impl Upstream for HyperUpstream {
    async fn send(&self, request: Request) -> Result<Response, GatewayError> {
        let response: http::Response<hyper::body::Incoming> =
            tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| GatewayError::UpstreamTimeout)?
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        Ok(response.map(Body::new))
    }
}

/// Shared state of the proxy handler.
#[derive(Clone)]
pub struct ProxyState {
    pub stage: GatewayAuthStage,
    pub upstream: std::sync::Arc<dyn Upstream>,
}

/// Connection-scoped headers that must not be forwarded (RFC 9110 section 7.6.1).
static HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Fallback handler: rewrite identity, retarget the URI, forward.
pub async fn proxy_handler(State(state): State<ProxyState>, req: Request) -> Response {
    match forward(&state, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn forward(state: &ProxyState, mut req: Request) -> Result<Response, GatewayError> {
    let route = req
        .extensions_mut()
        .remove::<MatchedRoute>()
        .ok_or(GatewayError::RouteNotFound)?
        .0;
    let principal = req.extensions_mut().remove::<AuthenticatedPrincipal>();

    // Client-controlled `Connection` names are honoured before the assertion is
    // written, never after.
    strip_hop_by_hop(req.headers_mut());
    req.headers_mut().remove(header::HOST);
    state.stage.apply(req.headers_mut(), principal.as_ref())?;

    let target = upstream_uri(&route, req.uri())?;
    tracing::debug!(route = %route.prefix, upstream = %target, "forwarding request");
    *req.uri_mut() = target;

    let mut response = state.upstream.send(req).await?;
    strip_hop_by_hop(response.headers_mut());
    Ok(response)
}

fn upstream_uri(route: &Route, inbound: &Uri) -> Result<Uri, GatewayError> {
    let path = route.upstream_path(inbound.path());
    let base = route.upstream.path().trim_end_matches('/');
    let path_and_query = match inbound.query() {
        Some(q) => format!("{base}{path}?{q}"),
        None => format!("{base}{path}"),
    };
    let path_and_query: PathAndQuery = path_and_query
        .parse()
        .map_err(|e: http::uri::InvalidUri| GatewayError::Upstream(e.to_string()))?;

    let mut parts = route.upstream.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).map_err(|e| GatewayError::Upstream(e.to_string()))
}

fn strip_hop_by_hop(headers: &mut http::HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use http::HeaderValue;

    use super::*;
    use crate::config::{RouteAuth, RouteConfig};
    use crate::routes::RouteTable;

    fn route(prefix: &str, upstream: &str, strip: bool) -> Route {
        RouteTable::build(&[RouteConfig {
            prefix: prefix.to_owned(),
            upstream: upstream.to_owned(),
            strip_prefix: strip,
            auth: RouteAuth::Public,
            required_scopes: Vec::new(),
        }])
        .unwrap()
        .resolve(prefix)
        .unwrap()
        .clone()
    }

    #[test]
    fn rewrites_uri_with_query() {
        let r = route("/order", "http://127.0.0.1:53021", true);
        let uri: Uri = "/order/r1?x=1".parse().unwrap();

        assert_eq!(
            upstream_uri(&r, &uri).unwrap().to_string(),
            "http://127.0.0.1:53021/r1?x=1"
        );
    }

    #[test]
    fn joins_upstream_base_path() {
        let r = route("/order", "http://svc:8080/api/", true);
        let uri: Uri = "/order/r1".parse().unwrap();

        assert_eq!(
            upstream_uri(&r, &uri).unwrap().to_string(),
            "http://svc:8080/api/r1"
        );
    }

    #[test]
    fn strips_hop_by_hop_and_connection_listed_headers() {
        let mut headers = http::HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace-hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-trace-hop", HeaderValue::from_static("1"));
        headers.insert(header::TE, HeaderValue::from_static("trailers"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::AUTHORIZATION));
    }
}
