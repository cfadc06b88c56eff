use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use trustmesh_auth::authority_guard;

use crate::api::rest::handlers;

pub const R1_AUTHORITY: &str = "p2";
pub const R2_AUTHORITY: &str = "p1";

/// Order endpoints. Each gated route carries its own authority guard.
#[must_use]
pub fn register_routes(router: Router) -> Router {
    let r1 = Router::new()
        .route("/r1", get(handlers::resource_one))
        .route_layer(from_fn_with_state(R1_AUTHORITY, authority_guard));
    let r2 = Router::new()
        .route("/r2", get(handlers::resource_two))
        .route_layer(from_fn_with_state(R2_AUTHORITY, authority_guard));

    router
        .merge(r1)
        .merge(r2)
        .route("/whoami", get(handlers::whoami))
}
