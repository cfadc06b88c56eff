use secrecy::SecretString;
use serde::Deserialize;

fn default_bind_addr() -> String {
    "127.0.0.1:53021".to_owned()
}

/// Order service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderServiceConfig {
    pub bind_addr: String,

    /// Must match the gateway's `assertion_key`; unset accepts plain assertions.
    pub assertion_key: Option<SecretString>,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            assertion_key: None,
        }
    }
}
