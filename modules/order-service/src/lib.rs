#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Sample resource service.
//!
//! Never sees the access token: the caller's identity is rebuilt from the
//! gateway's `x-identity-assertion` header and checked per handler.

pub mod api;
pub mod config;
pub mod module;

pub use config::OrderServiceConfig;
pub use module::OrderModule;
