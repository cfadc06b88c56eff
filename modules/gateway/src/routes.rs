//! Prefix route table.

use std::sync::Arc;

use anyhow::Context as _;
use http::Uri;

use crate::config::{RouteAuth, RouteConfig};

/// A validated route.
#[derive(Debug, Clone)]
pub struct Route {
    pub prefix: String,
    pub upstream: Uri,
    pub strip_prefix: bool,
    pub auth: RouteAuth,
    pub required_scopes: Vec<String>,
}

impl Route {
    /// Path sent upstream for an inbound `path`.
    #[must_use]
    pub fn upstream_path<'a>(&self, path: &'a str) -> &'a str {
        if !self.strip_prefix || self.prefix == "/" {
            return path;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") | None => "/",
            Some(rest) => rest,
        }
    }
}

/// Longest-prefix route matcher.
///
/// Each prefix is registered twice in `matchit`: as an exact path and as a
/// catch-all below it, so `/order` matches `/order` and `/order/r1` but not `/orders`.
#[derive(Clone)]
pub struct RouteTable {
    matcher: Arc<matchit::Router<usize>>,
    routes: Arc<[Route]>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl RouteTable {
    /// Build the table from configuration.
    ///
    /// # Errors
    ///
    /// Fails on a malformed prefix, an unparsable upstream URI or a duplicate prefix.
    pub fn build(configs: &[RouteConfig]) -> anyhow::Result<Self> {
        let mut matcher = matchit::Router::new();
        let mut routes = Vec::with_capacity(configs.len());

        for (idx, cfg) in configs.iter().enumerate() {
            let prefix = normalize_prefix(&cfg.prefix)?;
            let upstream: Uri = cfg
                .upstream
                .parse()
                .with_context(|| format!("invalid upstream URI '{}'", cfg.upstream))?;
            if upstream.scheme().is_none() || upstream.authority().is_none() {
                anyhow::bail!("upstream URI '{}' must be absolute", cfg.upstream);
            }

            let catch_all = if prefix == "/" {
                "/{*rest}".to_owned()
            } else {
                format!("{prefix}/{{*rest}}")
            };
            matcher
                .insert(prefix.clone(), idx)
                .map_err(|e| anyhow::anyhow!("failed to insert route prefix '{prefix}': {e}"))?;
            matcher
                .insert(catch_all, idx)
                .map_err(|e| anyhow::anyhow!("failed to insert route prefix '{prefix}': {e}"))?;

            routes.push(Route {
                prefix,
                upstream,
                strip_prefix: cfg.strip_prefix,
                auth: cfg.auth,
                required_scopes: cfg.required_scopes.clone(),
            });
        }

        Ok(Self {
            matcher: Arc::new(matcher),
            routes: routes.into(),
        })
    }

    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let matched = self.matcher.at(path).ok()?;
        self.routes.get(*matched.value)
    }
}

fn normalize_prefix(prefix: &str) -> anyhow::Result<String> {
    if !prefix.starts_with('/') {
        anyhow::bail!("route prefix '{prefix}' must start with '/'");
    }
    if prefix.contains(['{', '}', '*']) {
        anyhow::bail!("route prefix '{prefix}' must be a literal path");
    }
    let trimmed = prefix.trim_end_matches('/');
    Ok(if trimmed.is_empty() {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn route(prefix: &str, auth: RouteAuth) -> RouteConfig {
        RouteConfig {
            prefix: prefix.to_owned(),
            upstream: "http://127.0.0.1:9000".to_owned(),
            strip_prefix: true,
            auth,
            required_scopes: Vec::new(),
        }
    }

    #[test]
    fn matches_prefix_and_descendants_only() {
        let table = RouteTable::build(&[route("/order", RouteAuth::Authenticated)]).unwrap();

        assert!(table.resolve("/order").is_some());
        assert!(table.resolve("/order/r1").is_some());
        assert!(table.resolve("/order/a/b").is_some());
        assert!(table.resolve("/orders").is_none());
        assert!(table.resolve("/uaa/oauth/token").is_none());
    }

    #[test]
    fn longest_prefix_wins() {
        let table = RouteTable::build(&[
            route("/", RouteAuth::Public),
            route("/order", RouteAuth::Authenticated),
        ])
        .unwrap();

        assert_eq!(table.resolve("/order/r1").unwrap().prefix, "/order");
        assert_eq!(table.resolve("/health").unwrap().prefix, "/");
    }

    #[test]
    fn strips_prefix() {
        let table = RouteTable::build(&[route("/order/", RouteAuth::Authenticated)]).unwrap();
        let r = table.resolve("/order/r1").unwrap();

        assert_eq!(r.prefix, "/order");
        assert_eq!(r.upstream_path("/order/r1"), "/r1");
        assert_eq!(r.upstream_path("/order"), "/");
    }

    #[test]
    fn keeps_prefix_when_configured() {
        let mut cfg = route("/order", RouteAuth::Authenticated);
        cfg.strip_prefix = false;
        let table = RouteTable::build(&[cfg]).unwrap();

        assert_eq!(
            table.resolve("/order/r1").unwrap().upstream_path("/order/r1"),
            "/order/r1"
        );
    }

    #[test]
    fn rejects_bad_config() {
        let mut bad_upstream = route("/order", RouteAuth::Public);
        bad_upstream.upstream = "/relative".to_owned();
        assert!(RouteTable::build(&[bad_upstream]).is_err());

        assert!(RouteTable::build(&[route("order", RouteAuth::Public)]).is_err());
        assert!(RouteTable::build(&[route("/a/{id}", RouteAuth::Public)]).is_err());
        assert!(
            RouteTable::build(&[
                route("/order", RouteAuth::Public),
                route("/order", RouteAuth::Public)
            ])
            .is_err()
        );
    }
}
