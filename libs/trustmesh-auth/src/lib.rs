#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Token verification and request authentication for mesh services.
//!
//! - [`TokenCodec`] / [`Hs256TokenCodec`]: verify (and, on the issuer, mint) signed access tokens
//! - [`ResourceAuthLayer`]: rebuilds the [`SecurityContext`] from the gateway's forwarded assertion
//! - [`Authz`]: handler extractor with capability checks
//! - [`Problem`]: RFC 9457 error bodies shared by every service

pub mod axum_ext;
pub mod claims;
pub mod errors;
pub mod hs256;
pub mod problem;
pub mod resource;
pub mod traits;

pub use axum_ext::{Authz, authority_guard};
pub use claims::TokenClaims;
pub use errors::{AuthError, TokenError};
pub use hs256::Hs256TokenCodec;
pub use problem::Problem;
pub use resource::{ResourceAuthLayer, ResourceAuthService, resolve_context};
pub use traits::TokenCodec;

pub use trustmesh_security::SecurityContext;
