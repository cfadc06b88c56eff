use std::time::{SystemTime, UNIX_EPOCH};

use trustmesh_auth::{Hs256TokenCodec, TokenClaims, TokenCodec};

use super::error::IssuerError;
use super::registry::{Client, CredentialStore};
use crate::config::IssuerConfig;

pub const GRANT_PASSWORD: &str = "password";
pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Parameters of a token request after client credentials were extracted.
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Space-separated requested scopes.
    pub scope: Option<String>,
}

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
    pub claims: TokenClaims,
}

/// Issues and introspects access tokens.
#[derive(Debug)]
pub struct TokenService {
    codec: Hs256TokenCodec,
    store: CredentialStore,
    ttl_secs: u64,
}

impl TokenService {
    #[must_use]
    pub fn from_config(cfg: &IssuerConfig) -> Self {
        Self {
            codec: Hs256TokenCodec::new(&cfg.signing_key),
            store: CredentialStore::from_config(cfg),
            ttl_secs: cfg.token_ttl_secs,
        }
    }

    /// Authenticate the client and resource owner, then mint a token.
    ///
    /// # Errors
    ///
    /// Returns the OAuth2 error matching the first failed check: client
    /// authentication, grant support, user credentials, then scope.
    pub fn issue(&self, req: &TokenRequest) -> Result<IssuedToken, IssuerError> {
        let client = self
            .store
            .authenticate_client(&req.client_id, &req.client_secret)
            .ok_or(IssuerError::InvalidClient)?;

        let (subject, authorities) = match req.grant_type.as_str() {
            GRANT_PASSWORD => {
                let username = req
                    .username
                    .as_deref()
                    .ok_or(IssuerError::InvalidRequest("username"))?;
                let password = req
                    .password
                    .as_deref()
                    .ok_or(IssuerError::InvalidRequest("password"))?;
                ensure_grant_allowed(client, GRANT_PASSWORD)?;
                let user = self
                    .store
                    .authenticate_user(username, password)
                    .ok_or(IssuerError::InvalidGrant)?;
                (user.username.clone(), user.authorities.clone())
            }
            GRANT_CLIENT_CREDENTIALS => {
                ensure_grant_allowed(client, GRANT_CLIENT_CREDENTIALS)?;
                (client.client_id.clone(), client.authorities.clone())
            }
            other => return Err(IssuerError::UnsupportedGrantType(other.to_owned())),
        };

        let scope = resolve_scope(client, req.scope.as_deref())?;
        let iat = now_secs();
        let claims = TokenClaims {
            subject,
            authorities,
            client_id: client.client_id.clone(),
            scope,
            aud: client.resource_ids.clone(),
            grant_type: Some(req.grant_type.clone()),
            exp: iat.saturating_add(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX)),
            iat,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let access_token = self.codec.mint(&claims)?;

        tracing::info!(
            client_id = %claims.client_id,
            grant_type = %req.grant_type,
            jti = %claims.jti,
            "access token issued"
        );

        Ok(IssuedToken {
            access_token,
            expires_in: self.ttl_secs,
            claims,
        })
    }

    /// Verify a token previously minted by this issuer.
    ///
    /// # Errors
    ///
    /// Returns [`IssuerError::InvalidToken`] for bad, expired or foreign tokens.
    pub fn check(&self, token: &str) -> Result<TokenClaims, IssuerError> {
        self.codec.verify(token).map_err(IssuerError::from)
    }
}

fn ensure_grant_allowed(client: &Client, grant_type: &str) -> Result<(), IssuerError> {
    if client.allows_grant(grant_type) {
        Ok(())
    } else {
        Err(IssuerError::UnauthorizedClient(grant_type.to_owned()))
    }
}

/// Granted scope: the requested set when every entry is registered for the client,
/// or all client scopes when nothing was requested.
fn resolve_scope(client: &Client, requested: Option<&str>) -> Result<Vec<String>, IssuerError> {
    let requested: Vec<&str> = requested
        .map(|s| s.split_whitespace().collect())
        .unwrap_or_default();
    if requested.is_empty() {
        return Ok(client.scopes.clone());
    }
    let mut granted: Vec<String> = Vec::with_capacity(requested.len());
    for scope in requested {
        if !client.scopes.iter().any(|s| s == scope) {
            return Err(IssuerError::InvalidScope(scope.to_owned()));
        }
        if !granted.iter().any(|s| s == scope) {
            granted.push(scope.to_owned());
        }
    }
    Ok(granted)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
