use axum::extract::rejection::FormRejection;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode, header};
use serde::Serialize;

use crate::domain::error::IssuerError;

/// OAuth2 error body (RFC 6749 section 5.2).
#[derive(Debug, Clone, Serialize)]
pub struct OAuthErrorDto {
    pub error: &'static str,
    pub error_description: String,
}

impl From<FormRejection> for IssuerError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "token endpoint form rejected");
        Self::MalformedForm
    }
}

impl IntoResponse for IssuerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidClient => StatusCode::UNAUTHORIZED,
            Self::Internal(msg) => {
                tracing::error!("issuer internal error: {msg}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        };
        tracing::debug!(error = self.oauth_code(), "token request rejected");

        let description = match &self {
            Self::Internal(_) => "Internal error".to_owned(),
            other => other.to_string(),
        };
        let body = OAuthErrorDto {
            error: self.oauth_code(),
            error_description: description,
        };
        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"oauth2/client\""),
            );
        }
        response
    }
}
