use trustmesh_auth::TokenError;

/// Token endpoint failures, one variant per OAuth2 error code the issuer emits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssuerError {
    #[error("Bad client credentials")]
    InvalidClient,

    #[error("Bad credentials")]
    InvalidGrant,

    #[error("Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    #[error("Unauthorized grant type: {0}")]
    UnauthorizedClient(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Missing parameter: {0}")]
    InvalidRequest(&'static str),

    #[error("Request body is not a valid form")]
    MalformedForm,

    #[error("Token was not recognised")]
    InvalidToken,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IssuerError {
    /// OAuth2 `error` code (RFC 6749 section 5.2).
    #[must_use]
    pub fn oauth_code(&self) -> &'static str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::UnauthorizedClient(_) => "unauthorized_client",
            Self::InvalidScope(_) => "invalid_scope",
            Self::InvalidRequest(_) | Self::MalformedForm => "invalid_request",
            Self::InvalidToken => "invalid_token",
            Self::Internal(_) => "server_error",
        }
    }
}

impl From<TokenError> for IssuerError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => Self::Internal(msg),
            TokenError::InvalidToken | TokenError::ExpiredToken | TokenError::MalformedToken => {
                Self::InvalidToken
            }
        }
    }
}
