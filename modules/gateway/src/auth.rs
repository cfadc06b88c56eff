//! Edge authentication: resolve the route, verify the bearer token, enforce scopes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use trustmesh_auth::{AuthError, TokenClaims, TokenCodec};

use crate::config::RouteAuth;
use crate::error::GatewayError;
use crate::routes::{Route, RouteTable};

/// Verified caller attached to the request by [`edge_auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal(pub TokenClaims);

/// Route chosen for the request, attached alongside the principal.
#[derive(Debug, Clone)]
pub struct MatchedRoute(pub Route);

/// Shared state for the edge authentication middleware.
#[derive(Clone)]
pub struct EdgeAuthState {
    pub codec: Arc<dyn TokenCodec>,
    pub routes: RouteTable,
    pub audience: Option<String>,
}

impl EdgeAuthState {
    /// Decide the principal for a request on `route`.
    ///
    /// `Ok(None)` means the request proceeds unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] that terminates the request.
    pub fn authenticate(
        &self,
        route: &Route,
        headers: &HeaderMap,
    ) -> Result<Option<AuthenticatedPrincipal>, AuthError> {
        let token = extract_bearer_token(headers);

        match route.auth {
            RouteAuth::Public => {
                let Some(token) = token else {
                    return Ok(None);
                };
                match self.verify(token) {
                    Ok(claims) => Ok(Some(AuthenticatedPrincipal(claims))),
                    Err(err) => {
                        tracing::debug!("optional auth: token ignored: {err}");
                        Ok(None)
                    }
                }
            }
            RouteAuth::Authenticated => {
                let token = token.ok_or(AuthError::Unauthenticated)?;
                let claims = self.verify(token)?;
                if let Some(scope) = route.required_scopes.iter().find(|s| !claims.has_scope(s)) {
                    return Err(AuthError::InsufficientScope {
                        scope: scope.clone(),
                    });
                }
                Ok(Some(AuthenticatedPrincipal(claims)))
            }
        }
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.codec.verify(token)?;
        if let Some(audience) = &self.audience
            && !claims.has_audience(audience)
        {
            return Err(AuthError::InvalidAudience);
        }
        Ok(claims)
    }
}

/// Authentication middleware for the proxy router.
///
/// For each request:
/// 1. Skips CORS preflight requests
/// 2. Resolves the route by path prefix; unknown paths end with 404
/// 3. Public routes: verifies a bearer token if present, otherwise proceeds anonymously
/// 4. Authenticated routes: requires a valid bearer token carrying the route's scopes
pub async fn edge_auth_middleware(
    State(state): State<EdgeAuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(route) = state.routes.resolve(req.uri().path()).cloned() else {
        return GatewayError::RouteNotFound.into_response();
    };

    if !is_preflight_request(req.method(), req.headers()) {
        match state.authenticate(&route, req.headers()) {
            Ok(Some(principal)) => {
                req.extensions_mut().insert(principal);
            }
            Ok(None) => {}
            Err(err) => return err.into_response(),
        }
    }

    req.extensions_mut().insert(MatchedRoute(route));
    next.run(req).await
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(str::trim))
        .filter(|s| !s.is_empty())
}

/// Check if this is a CORS preflight request
///
/// Preflight requests are OPTIONS requests with:
/// - Origin header present
/// - Access-Control-Request-Method header present
fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(axum::http::header::ORIGIN)
        && headers.contains_key(axum::http::header::ACCESS_CONTROL_REQUEST_METHOD)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use axum::http::HeaderValue;
    use trustmesh_auth::TokenError;

    use super::*;
    use crate::config::RouteConfig;

    /// Codec accepting exactly one token.
    struct FixedCodec(TokenClaims);

    impl TokenCodec for FixedCodec {
        fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
            match token {
                "good" => Ok(self.0.clone()),
                "expired" => Err(TokenError::ExpiredToken),
                _ => Err(TokenError::InvalidToken),
            }
        }
    }

    fn claims() -> TokenClaims {
        TokenClaims {
            subject: "wangchen".to_owned(),
            authorities: vec!["p1".to_owned(), "p2".to_owned()],
            client_id: "c1".to_owned(),
            scope: vec!["all".to_owned()],
            aud: vec!["order".to_owned()],
            grant_type: Some("password".to_owned()),
            exp: i64::MAX,
            iat: 0,
            jti: "j".to_owned(),
        }
    }

    fn state(audience: Option<&str>) -> EdgeAuthState {
        let routes = RouteTable::build(&[
            RouteConfig {
                prefix: "/order".to_owned(),
                upstream: "http://127.0.0.1:9001".to_owned(),
                strip_prefix: true,
                auth: RouteAuth::Authenticated,
                required_scopes: vec!["all".to_owned()],
            },
            RouteConfig {
                prefix: "/admin".to_owned(),
                upstream: "http://127.0.0.1:9002".to_owned(),
                strip_prefix: true,
                auth: RouteAuth::Authenticated,
                required_scopes: vec!["admin".to_owned()],
            },
            RouteConfig {
                prefix: "/uaa".to_owned(),
                upstream: "http://127.0.0.1:9000".to_owned(),
                strip_prefix: true,
                auth: RouteAuth::Public,
                required_scopes: Vec::new(),
            },
        ])
        .unwrap();
        EdgeAuthState {
            codec: Arc::new(FixedCodec(claims())),
            routes,
            audience: audience.map(str::to_owned),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn route<'a>(state: &'a EdgeAuthState, path: &str) -> &'a Route {
        state.routes.resolve(path).unwrap()
    }

    #[test]
    fn authenticated_route_requires_token() {
        let st = state(None);
        let err = st
            .authenticate(route(&st, "/order/r1"), &HeaderMap::new())
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[test]
    fn valid_token_yields_principal() {
        let st = state(None);
        let principal = st
            .authenticate(route(&st, "/order/r1"), &bearer("good"))
            .unwrap()
            .unwrap();
        assert_eq!(principal.0.subject, "wangchen");
    }

    #[test]
    fn token_errors_propagate() {
        let st = state(None);
        let err = st
            .authenticate(route(&st, "/order/r1"), &bearer("expired"))
            .unwrap_err();
        assert!(matches!(err, AuthError::Token(TokenError::ExpiredToken)));
    }

    #[test]
    fn missing_scope_is_rejected() {
        let st = state(None);
        let err = st
            .authenticate(route(&st, "/admin/x"), &bearer("good"))
            .unwrap_err();
        assert!(matches!(err, AuthError::InsufficientScope { scope } if scope == "admin"));
    }

    #[test]
    fn audience_mismatch_is_rejected() {
        let st = state(Some("billing"));
        let err = st
            .authenticate(route(&st, "/order/r1"), &bearer("good"))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidAudience));

        let st = state(Some("order"));
        assert!(
            st.authenticate(route(&st, "/order/r1"), &bearer("good"))
                .is_ok()
        );
    }

    #[test]
    fn public_route_is_optional_auth() {
        let st = state(None);
        let r = route(&st, "/uaa/oauth/token");

        assert_eq!(st.authenticate(r, &HeaderMap::new()).unwrap(), None);
        assert_eq!(st.authenticate(r, &bearer("forged")).unwrap(), None);
        assert!(st.authenticate(r, &bearer("good")).unwrap().is_some());
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer_token(&bearer("abc")), Some("abc"));
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic YzE6c2VjcmV0"),
        );
        assert_eq!(extract_bearer_token(&headers), None);
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
