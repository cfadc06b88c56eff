#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Edge gateway.
//!
//! Verifies bearer tokens at the network edge, replaces any client-supplied
//! `x-identity-assertion` with one built from the verified claims, and proxies the
//! request to the matching upstream service.

pub mod auth;
pub mod config;
pub mod error;
pub mod module;
pub mod proxy;
pub mod routes;
pub mod stage;

pub use auth::AuthenticatedPrincipal;
pub use config::{GatewayConfig, RouteAuth, RouteConfig};
pub use error::GatewayError;
pub use module::GatewayModule;
pub use proxy::{HyperUpstream, Upstream};
pub use stage::GatewayAuthStage;
