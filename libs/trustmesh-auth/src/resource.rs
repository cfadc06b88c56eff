//! Resource-side authentication stage.
//!
//! Rebuilds the caller's [`SecurityContext`] from the identity assertion the gateway
//! forwards and stores it in the request extensions before any handler runs.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::Request,
    response::{IntoResponse, Response},
};
use http::HeaderMap;
use tower::{Layer, Service};
use trustmesh_security::{
    AssertionCodec, SecurityContext, constants::IDENTITY_ASSERTION_HEADER,
};

use crate::errors::AuthError;

/// Resolve the request's security context from its headers.
///
/// - no assertion header: anonymous context
/// - exactly one decodable value: context built from that assertion
/// - anything else (repeated header, non-ASCII bytes, undecodable value): error
///
/// A present but invalid assertion never degrades to anonymous.
///
/// # Errors
///
/// Returns [`AuthError::InvalidAssertion`] when the header is present but unusable.
pub fn resolve_context(
    headers: &HeaderMap,
    codec: &AssertionCodec,
) -> Result<SecurityContext, AuthError> {
    let mut values = headers.get_all(IDENTITY_ASSERTION_HEADER).iter();
    let Some(value) = values.next() else {
        return Ok(SecurityContext::anonymous());
    };
    if values.next().is_some() {
        return Err(AuthError::InvalidAssertion {
            reason: "duplicate_header",
        });
    }
    let value = value.to_str().map_err(|_| AuthError::InvalidAssertion {
        reason: "invalid_header_bytes",
    })?;
    let assertion = codec.decode(value)?;
    Ok(SecurityContext::from_assertion(assertion))
}

/// Layer that installs [`ResourceAuthService`] in front of a resource router.
///
/// ```ignore
/// let app = Router::new()
///     .route("/r1", get(r1))
///     .layer(ResourceAuthLayer::new(AssertionCodec::plain()));
/// ```
#[derive(Clone, Debug)]
pub struct ResourceAuthLayer {
    codec: Arc<AssertionCodec>,
}

impl ResourceAuthLayer {
    #[must_use]
    pub fn new(codec: AssertionCodec) -> Self {
        Self {
            codec: Arc::new(codec),
        }
    }
}

impl<S> Layer<S> for ResourceAuthLayer {
    type Service = ResourceAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResourceAuthService {
            inner,
            codec: Arc::clone(&self.codec),
        }
    }
}

/// Service that decodes the forwarded assertion into a [`SecurityContext`].
#[derive(Clone, Debug)]
pub struct ResourceAuthService<S> {
    inner: S,
    codec: Arc<AssertionCodec>,
}

impl<S> Service<Request<Body>> for ResourceAuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let codec = Arc::clone(&self.codec);
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(async move {
            match resolve_context(request.headers(), &codec) {
                Ok(context) => {
                    request.extensions_mut().insert(context);
                    ready_inner.call(request).await
                }
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}
