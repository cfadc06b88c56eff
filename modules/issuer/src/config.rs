//! Configuration for the token issuer.

use secrecy::SecretString;
use serde::Deserialize;

fn default_bind_addr() -> String {
    "127.0.0.1:53020".to_owned()
}

fn default_token_ttl_secs() -> u64 {
    7200
}

/// Issuer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IssuerConfig {
    pub bind_addr: String,

    /// HS256 key shared with the gateway.
    pub signing_key: SecretString,

    /// Access token lifetime in seconds.
    pub token_ttl_secs: u64,

    /// Registered client applications.
    pub clients: Vec<ClientConfig>,

    /// End users accepted by the `password` grant.
    pub users: Vec<UserConfig>,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            signing_key: SecretString::default(),
            token_ttl_secs: default_token_ttl_secs(),
            clients: Vec::new(),
            users: Vec::new(),
        }
    }
}

/// A registered OAuth2 client.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub client_id: String,
    pub secret: SecretString,

    /// Scopes the client may request.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Grant types the client may use.
    #[serde(default = "default_grant_types")]
    pub grant_types: Vec<String>,

    /// Resource ids written to the token audience.
    #[serde(default)]
    pub resource_ids: Vec<String>,

    /// Authorities granted to client-only (`client_credentials`) tokens.
    #[serde(default)]
    pub authorities: Vec<String>,
}

fn default_grant_types() -> Vec<String> {
    vec!["password".to_owned(), "client_credentials".to_owned()]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub username: String,
    pub password: SecretString,
    #[serde(default)]
    pub authorities: Vec<String>,
}
