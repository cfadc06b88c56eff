#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! OAuth2 token issuer.
//!
//! Authenticates registered clients and end users and mints HS256 access tokens
//! the gateway verifies at the edge. Users and clients come from configuration.

pub mod api;
pub mod config;
pub mod domain;
pub mod module;

pub use config::IssuerConfig;
pub use domain::error::IssuerError;
pub use module::IssuerModule;
