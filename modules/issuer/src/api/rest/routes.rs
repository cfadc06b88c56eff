use std::sync::Arc;

use axum::Router;
use axum::routing::post;

use crate::api::rest::handlers;
use crate::domain::service::TokenService;

pub const TOKEN_PATH: &str = "/oauth/token";
pub const CHECK_TOKEN_PATH: &str = "/oauth/check_token";

/// Token endpoints. Both are public; the token endpoint authenticates clients itself.
#[must_use]
pub fn register_routes(router: Router, service: Arc<TokenService>) -> Router {
    let oauth = Router::new()
        .route(TOKEN_PATH, post(handlers::issue_token))
        .route(CHECK_TOKEN_PATH, post(handlers::check_token))
        .with_state(service);
    router.merge(oauth)
}
