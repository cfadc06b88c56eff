use serde::{Deserialize, Serialize};

/// Verified claim set of an access token.
///
/// Field names follow the OAuth2 JWT layout the issuer emits: `user_name` for the
/// subject, `authorities` for granted authorities and `scope` as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Authenticated principal: the user name, or the client id for client-only grants.
    #[serde(rename = "user_name")]
    pub subject: String,

    #[serde(default)]
    pub authorities: Vec<String>,

    /// Client application that requested the token.
    pub client_id: String,

    #[serde(default)]
    pub scope: Vec<String>,

    /// Resource ids the token is intended for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aud: Vec<String>,

    /// Grant type the token was issued under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_type: Option<String>,

    /// Expiration (unix seconds).
    pub exp: i64,

    /// Issued at (unix seconds).
    #[serde(default)]
    pub iat: i64,

    /// Unique token id.
    pub jti: String,
}

impl TokenClaims {
    /// Scope list rendered the way OAuth2 parameters carry it.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scope.join(" ")
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.iter().any(|s| s == scope)
    }

    #[must_use]
    pub fn has_audience(&self, resource_id: &str) -> bool {
        self.aud.iter().any(|a| a == resource_id)
    }
}
