use axum::Json;
use serde::Serialize;
use trustmesh_auth::Authz;

/// `GET /r1`, gated on `p2`.
#[tracing::instrument(skip_all)]
pub async fn resource_one(Authz(ctx): Authz) -> String {
    format!("{} accessed resource 1", ctx.subject().unwrap_or_default())
}

/// `GET /r2`, gated on `p1`.
#[tracing::instrument(skip_all)]
pub async fn resource_two(Authz(ctx): Authz) -> String {
    format!("{} accessed resource 2", ctx.subject().unwrap_or_default())
}

#[derive(Debug, Serialize)]
pub struct WhoAmIDto {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub authorities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
}

/// `GET /whoami`: the caller's context as the service sees it. Anonymous allowed.
pub async fn whoami(Authz(ctx): Authz) -> Json<WhoAmIDto> {
    Json(WhoAmIDto {
        authenticated: ctx.is_authenticated(),
        subject: ctx.subject().map(str::to_owned),
        authorities: ctx.authorities().map(str::to_owned).collect(),
        client_id: ctx.client_id().map(str::to_owned),
        scopes: ctx.scopes().map(str::to_owned).collect(),
    })
}
