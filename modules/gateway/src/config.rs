use secrecy::SecretString;
use serde::Deserialize;

fn default_bind_addr() -> String {
    "127.0.0.1:53010".to_owned()
}

fn default_forward_params() -> Vec<String> {
    vec![
        "client_id".to_owned(),
        "scope".to_owned(),
        "grant_type".to_owned(),
    ]
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_body_limit_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub bind_addr: String,

    /// HS256 key shared with the issuer.
    pub signing_key: SecretString,

    /// When set, a token's `aud` must contain this resource id.
    pub audience: Option<String>,

    /// Clock skew tolerated on token expiry, in seconds.
    pub leeway_secs: u64,

    /// Mesh-internal key; when set, forwarded assertions are HMAC-signed.
    pub assertion_key: Option<SecretString>,

    /// Token parameters copied into the assertion passthrough map.
    pub forward_params: Vec<String>,

    pub upstream_timeout_secs: u64,

    /// Largest request body accepted before proxying.
    pub body_limit_bytes: usize,

    pub routes: Vec<RouteConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            signing_key: SecretString::default(),
            audience: None,
            leeway_secs: 0,
            assertion_key: None,
            forward_params: default_forward_params(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            body_limit_bytes: default_body_limit_bytes(),
            routes: Vec::new(),
        }
    }
}

/// A proxied path prefix.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    /// Path prefix, e.g. `/order`. `/` matches everything not claimed by a longer prefix.
    pub prefix: String,

    /// Upstream base URI, e.g. `http://127.0.0.1:53021`.
    pub upstream: String,

    /// Drop `prefix` from the path before forwarding.
    #[serde(default = "default_true")]
    pub strip_prefix: bool,

    #[serde(default)]
    pub auth: RouteAuth,

    /// Scopes the token must carry (all of them).
    #[serde(default)]
    pub required_scopes: Vec<String>,
}

/// Whether a route requires a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteAuth {
    /// Token optional; verified when present, ignored when invalid.
    Public,
    #[default]
    Authenticated,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn route_defaults() {
        let cfg: GatewayConfig = serde_json::from_value(serde_json::json!({
            "signing_key": "uaa123",
            "routes": [
                { "prefix": "/order", "upstream": "http://127.0.0.1:53021", "required_scopes": ["all"] },
                { "prefix": "/uaa", "upstream": "http://127.0.0.1:53020", "auth": "public" }
            ]
        }))
        .unwrap();

        assert_eq!(cfg.routes[0].auth, RouteAuth::Authenticated);
        assert!(cfg.routes[0].strip_prefix);
        assert_eq!(cfg.routes[1].auth, RouteAuth::Public);
        assert_eq!(cfg.forward_params, default_forward_params());
        assert!(cfg.assertion_key.is_none());
    }

    #[test]
    fn unknown_route_field_is_rejected() {
        let res: Result<GatewayConfig, _> = serde_json::from_value(serde_json::json!({
            "routes": [{ "prefix": "/x", "upstream": "http://h", "auth": "public", "scopes": [] }]
        }));
        assert!(res.is_err());
    }
}
