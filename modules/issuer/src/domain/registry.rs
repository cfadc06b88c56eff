//! In-memory client and user registry built from configuration.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::config::{ClientConfig, IssuerConfig, UserConfig};

/// Compared against on an unknown id so a miss costs the same as a wrong secret.
const UNKNOWN_PRINCIPAL_SECRET: &str = "unknown-principal";

/// Registered client after loading.
#[derive(Debug, Clone)]
pub struct Client {
    pub client_id: String,
    secret: SecretString,
    pub scopes: Vec<String>,
    pub grant_types: Vec<String>,
    pub resource_ids: Vec<String>,
    pub authorities: Vec<String>,
}

impl Client {
    #[must_use]
    pub fn allows_grant(&self, grant_type: &str) -> bool {
        self.grant_types.iter().any(|g| g == grant_type)
    }
}

/// End user accepted by the password grant.
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    password: SecretString,
    pub authorities: Vec<String>,
}

/// Lookup tables for clients and users.
#[derive(Debug, Default)]
pub struct CredentialStore {
    clients: HashMap<String, Client>,
    users: HashMap<String, User>,
}

impl CredentialStore {
    #[must_use]
    pub fn from_config(cfg: &IssuerConfig) -> Self {
        let clients = cfg
            .clients
            .iter()
            .map(|c| (c.client_id.clone(), client_from(c)))
            .collect();
        let users = cfg
            .users
            .iter()
            .map(|u| (u.username.clone(), user_from(u)))
            .collect();
        Self { clients, users }
    }

    /// Authenticate a client by id and secret.
    #[must_use]
    pub fn authenticate_client(&self, client_id: &str, secret: &str) -> Option<&Client> {
        let client = self.clients.get(client_id);
        let stored = client.map_or(UNKNOWN_PRINCIPAL_SECRET, |c| c.secret.expose_secret());
        let matches = secret_matches(stored, secret);
        client.filter(|_| matches)
    }

    /// Authenticate an end user by name and password.
    #[must_use]
    pub fn authenticate_user(&self, username: &str, password: &str) -> Option<&User> {
        let user = self.users.get(username);
        let stored = user.map_or(UNKNOWN_PRINCIPAL_SECRET, |u| u.password.expose_secret());
        let matches = secret_matches(stored, password);
        user.filter(|_| matches)
    }
}

fn client_from(cfg: &ClientConfig) -> Client {
    Client {
        client_id: cfg.client_id.clone(),
        secret: cfg.secret.clone(),
        scopes: cfg.scopes.clone(),
        grant_types: cfg.grant_types.clone(),
        resource_ids: cfg.resource_ids.clone(),
        authorities: cfg.authorities.clone(),
    }
}

fn user_from(cfg: &UserConfig) -> User {
    User {
        username: cfg.username.clone(),
        password: cfg.password.clone(),
        authorities: cfg.authorities.clone(),
    }
}

/// Compare a stored secret with a presented one without leaking the mismatch position.
///
/// Both sides are hashed first so the comparison length does not depend on the input.
fn secret_matches(stored: &str, presented: &str) -> bool {
    let expected = Sha256::digest(stored.as_bytes());
    let actual = Sha256::digest(presented.as_bytes());
    let mut diff = 0u8;
    for (left, right) in expected.iter().zip(actual.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}
