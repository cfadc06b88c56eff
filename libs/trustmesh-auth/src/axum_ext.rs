//! Axum extractors and middleware for resource handlers

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use trustmesh_security::SecurityContext;

use crate::errors::AuthError;

/// Extractor for `SecurityContext` - validates that the resource auth layer has run
#[derive(Debug, Clone)]
pub struct Authz(pub SecurityContext);

impl Authz {
    /// Require an authenticated caller holding `authority`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthenticated`] for an anonymous context
    /// - [`AuthError::Forbidden`] when the authority is not granted
    pub fn require_authority(&self, authority: &str) -> Result<(), AuthError> {
        require_authority(&self.0, authority)
    }

    #[must_use]
    pub fn into_inner(self) -> SecurityContext {
        self.0
    }
}

impl<S> FromRequestParts<S> for Authz
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .map(Authz)
            .ok_or(AuthError::Internal(
                "SecurityContext not found - resource auth layer not configured".to_owned(),
            ))
    }
}

fn require_authority(ctx: &SecurityContext, authority: &str) -> Result<(), AuthError> {
    if !ctx.is_authenticated() {
        return Err(AuthError::Unauthenticated);
    }
    if ctx.has_authority(authority) {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            authority: authority.to_owned(),
        })
    }
}

/// Route guard requiring a single authority.
///
/// ```ignore
/// Router::new()
///     .route("/r1", get(r1))
///     .route_layer(middleware::from_fn_with_state("p2", authority_guard))
/// ```
pub async fn authority_guard(
    State(authority): State<&'static str>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ctx) = request.extensions().get::<SecurityContext>() else {
        return AuthError::Internal(
            "SecurityContext not found - resource auth layer not configured".to_owned(),
        )
        .into_response();
    };
    if let Err(err) = require_authority(ctx, authority) {
        return err.into_response();
    }
    next.run(request).await
}
