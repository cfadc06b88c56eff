use serde::{Deserialize, Serialize};
use trustmesh_auth::TokenClaims;

use crate::domain::service::IssuedToken;

/// Form body of `POST /oauth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenForm {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub scope: Option<String>,
}

/// Successful token response (RFC 6749 section 5.1).
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponseDto {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub scope: String,
    pub jti: String,
}

impl From<IssuedToken> for TokenResponseDto {
    fn from(issued: IssuedToken) -> Self {
        Self {
            scope: issued.claims.scope_string(),
            jti: issued.claims.jti,
            access_token: issued.access_token,
            token_type: "bearer",
            expires_in: issued.expires_in,
        }
    }
}

/// Form body of `POST /oauth/check_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckTokenForm {
    pub token: Option<String>,
}

/// Introspection result: the verified claims plus `active`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckTokenResponseDto {
    pub active: bool,
    #[serde(flatten)]
    pub claims: TokenClaims,
}
