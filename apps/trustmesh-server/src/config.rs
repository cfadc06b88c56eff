//! Process configuration: one YAML document plus `TRUSTMESH__` environment overrides.
//!
//! Each role reads only its own section, so a single file can describe the whole mesh.
//! Environment keys use `__` as the nesting separator, e.g.
//! `TRUSTMESH__GATEWAY__BIND_ADDR=0.0.0.0:8080`.

use std::path::Path;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;
use trustmesh_gateway::GatewayConfig;
use trustmesh_issuer::IssuerConfig;
use trustmesh_order::OrderServiceConfig;

pub const ENV_PREFIX: &str = "TRUSTMESH__";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub issuer: IssuerConfig,
    pub gateway: GatewayConfig,
    pub order: OrderServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Layered providers for `path`; later providers win.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// # Errors
    ///
    /// Fails when the file is missing, malformed, or carries unknown keys.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path
            && !path.is_file()
        {
            anyhow::bail!("config file not found: {}", path.display());
        }
        Self::extract(&Self::figment(path))
    }

    /// # Errors
    ///
    /// Fails when the merged providers do not describe a valid configuration.
    pub fn extract(figment: &Figment) -> anyhow::Result<Self> {
        figment
            .extract::<Self>()
            .context("invalid trustmesh configuration")
    }
}
