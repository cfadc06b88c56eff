#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Process bootstrap: configuration, logging and role runners.

pub mod config;
pub mod observability;
pub mod runner;

pub use config::{AppConfig, LoggingConfig};
pub use runner::{Role, run, serve};
