use axum::response::{IntoResponse, Response};
use http::StatusCode;
use trustmesh_security::AssertionDecodeError;

use crate::problem::Problem;

/// Access-token verification failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature, algorithm, audience or issuer did not verify.
    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    /// Not a structurally valid compact token or claim set.
    #[error("malformed token")]
    MalformedToken,

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::MalformedToken => "malformed_token",
            Self::Signing(_) => "signing_failed",
        }
    }
}

/// Request authentication and authorization failures.
///
/// Every variant is terminal for the request it was raised on.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable credential where one is required.
    #[error("authentication required")]
    Unauthenticated,

    #[error("token rejected: {0}")]
    Token(#[from] TokenError),

    /// Forwarded identity header present but unusable.
    #[error("identity assertion rejected: {reason}")]
    InvalidAssertion { reason: &'static str },

    #[error("missing authority '{authority}'")]
    Forbidden { authority: String },

    #[error("missing scope '{scope}'")]
    InsufficientScope { scope: String },

    #[error("token not intended for this resource")]
    InvalidAudience,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AssertionDecodeError> for AuthError {
    fn from(err: AssertionDecodeError) -> Self {
        Self::InvalidAssertion { reason: err.kind() }
    }
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::Token(_) | Self::InvalidAssertion { .. } => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden { .. } | Self::InsufficientScope { .. } | Self::InvalidAudience => {
                StatusCode::FORBIDDEN
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to an RFC-9457 Problem Details body.
    #[must_use]
    pub fn to_problem(&self) -> Problem {
        match self {
            Self::Unauthenticated => Problem::new(
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Missing or invalid Authorization header",
            )
            .with_code("unauthorized")
            .with_challenge("Bearer"),
            Self::Token(err) => {
                Problem::new(StatusCode::UNAUTHORIZED, "Unauthorized", err.to_string())
                    .with_code(err.kind())
                    .with_challenge(format!("Bearer error=\"{}\"", err.kind()))
            }
            Self::InvalidAssertion { .. } => Problem::new(
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Forwarded identity could not be verified",
            )
            .with_code("invalid_identity_assertion"),
            Self::Forbidden { authority } => Problem::new(
                StatusCode::FORBIDDEN,
                "Forbidden",
                format!("Authority '{authority}' is required"),
            )
            .with_code("insufficient_authority"),
            Self::InsufficientScope { scope } => Problem::new(
                StatusCode::FORBIDDEN,
                "Forbidden",
                format!("Scope '{scope}' is required"),
            )
            .with_code("insufficient_scope")
            .with_challenge(format!("Bearer error=\"insufficient_scope\", scope=\"{scope}\"")),
            Self::InvalidAudience => Problem::new(
                StatusCode::FORBIDDEN,
                "Forbidden",
                "Token is not intended for this resource",
            )
            .with_code("invalid_audience"),
            Self::Internal(_) => Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "Internal authentication error",
            ),
        }
    }
}

/// Log authentication errors at appropriate levels.
///
/// Only error kinds are logged, never subjects, authorities or header values.
fn log_auth_error(err: &AuthError) {
    match err {
        AuthError::Internal(msg) => tracing::error!("auth internal error: {msg}"),
        AuthError::InvalidAssertion { reason } => {
            tracing::debug!(reason, "identity assertion rejected");
        }
        AuthError::Token(token) => tracing::debug!(kind = token.kind(), "token rejected"),
        other => tracing::debug!(status = other.status().as_u16(), "request denied"),
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        log_auth_error(&self);
        self.to_problem().into_response()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn token_errors_are_unauthorized() {
        for err in [
            TokenError::InvalidToken,
            TokenError::ExpiredToken,
            TokenError::MalformedToken,
        ] {
            let auth = AuthError::from(err);
            assert_eq!(auth.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn decode_errors_map_to_content_free_reason() {
        let auth = AuthError::from(AssertionDecodeError::MissingPrefix);

        assert_eq!(auth.status(), StatusCode::UNAUTHORIZED);
        assert!(matches!(
            auth,
            AuthError::InvalidAssertion {
                reason: "missing_prefix"
            }
        ));
    }

    #[test]
    fn authorization_errors_are_forbidden() {
        let forbidden = AuthError::Forbidden {
            authority: "p3".to_owned(),
        };
        let scope = AuthError::InsufficientScope {
            scope: "all".to_owned(),
        };

        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(scope.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::InvalidAudience.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn problem_carries_code() {
        let problem = AuthError::Token(TokenError::ExpiredToken).to_problem();
        assert_eq!(problem.status, 401);
        assert_eq!(problem.code.as_deref(), Some("expired_token"));

        let problem = AuthError::Unauthenticated.to_problem();
        assert_eq!(problem.code.as_deref(), Some("unauthorized"));
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let problem = AuthError::Internal("db password leaked".to_owned()).to_problem();
        assert!(!problem.detail.contains("password"));
    }
}
