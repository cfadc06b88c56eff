use axum::response::{IntoResponse, Response};
use http::StatusCode;
use trustmesh_auth::{AuthError, Problem};

/// Gateway request failures.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no route for path")]
    RouteNotFound,

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The identity assertion could not be built or encoded; forwarding is aborted.
    #[error("identity assertion failed: {0}")]
    Assertion(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("upstream timed out")]
    UpstreamTimeout,
}

impl GatewayError {
    fn to_problem(&self) -> Problem {
        match self {
            Self::RouteNotFound => Problem::new(
                StatusCode::NOT_FOUND,
                "Not Found",
                "No route matches the request path",
            )
            .with_code("route_not_found"),
            Self::Auth(err) => err.to_problem(),
            Self::Assertion(_) => Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "Request identity could not be forwarded",
            )
            .with_code("assertion_failed"),
            Self::Upstream(_) => Problem::new(
                StatusCode::BAD_GATEWAY,
                "Bad Gateway",
                "Upstream service unavailable",
            )
            .with_code("upstream_unavailable"),
            Self::UpstreamTimeout => Problem::new(
                StatusCode::GATEWAY_TIMEOUT,
                "Gateway Timeout",
                "Upstream service did not respond in time",
            )
            .with_code("upstream_timeout"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(err) => err.into_response(),
            other => {
                match &other {
                    Self::Assertion(msg) => tracing::error!("assertion failed: {msg}"),
                    Self::Upstream(msg) => tracing::warn!("upstream failed: {msg}"),
                    Self::UpstreamTimeout => tracing::warn!("upstream timed out"),
                    Self::RouteNotFound | Self::Auth(_) => {}
                }
                other.to_problem().into_response()
            }
        }
    }
}
