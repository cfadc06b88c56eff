use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::HeaderMap;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::api::rest::dto::{CheckTokenForm, CheckTokenResponseDto, TokenForm, TokenResponseDto};
use crate::domain::error::IssuerError;
use crate::domain::service::{TokenRequest, TokenService};

/// `POST /oauth/token`
///
/// Client credentials come from HTTP Basic when present, otherwise from the form.
#[tracing::instrument(skip_all)]
pub async fn issue_token(
    State(svc): State<Arc<TokenService>>,
    headers: HeaderMap,
    form: Result<Form<TokenForm>, FormRejection>,
) -> Result<Json<TokenResponseDto>, IssuerError> {
    let Form(form) = form?;
    let (client_id, client_secret) = match basic_credentials(&headers) {
        Some(creds) => creds,
        None => (
            form.client_id.ok_or(IssuerError::InvalidClient)?,
            form.client_secret.unwrap_or_default(),
        ),
    };
    let grant_type = form
        .grant_type
        .ok_or(IssuerError::InvalidRequest("grant_type"))?;

    let request = TokenRequest {
        grant_type,
        client_id,
        client_secret,
        username: form.username,
        password: form.password,
        scope: form.scope,
    };
    let issued = svc.issue(&request)?;
    Ok(Json(TokenResponseDto::from(issued)))
}

/// `POST /oauth/check_token`
#[tracing::instrument(skip_all)]
pub async fn check_token(
    State(svc): State<Arc<TokenService>>,
    form: Result<Form<CheckTokenForm>, FormRejection>,
) -> Result<Json<CheckTokenResponseDto>, IssuerError> {
    let Form(form) = form?;
    let token = form.token.ok_or(IssuerError::InvalidRequest("token"))?;
    let claims = svc.check(&token)?;
    Ok(Json(CheckTokenResponseDto {
        active: true,
        claims,
    }))
}

/// Parse `Authorization: Basic base64(id:secret)`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(value.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_owned(), secret.to_owned()))
}
