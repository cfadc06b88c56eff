use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::assertion::IdentityAssertion;
use crate::constants::{CLIENT_ID_PARAM, SCOPE_PARAM};

/// `SecurityContext` is the request-scoped view of who is calling and with what authorities.
///
/// Resource services build it from the forwarded [`IdentityAssertion`] and store it in the
/// request's extensions; handlers extract it explicitly. There is no ambient or global
/// context: each request owns its own value and drops it when the request completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityContext {
    /// Authenticated principal, `None` for anonymous requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    /// Granted authorities. Duplicates in the assertion collapse here.
    authorities: BTreeSet<String>,
    /// Forwarded token request parameters.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

impl SecurityContext {
    /// Create an anonymous `SecurityContext` with no subject and no authorities
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Reconstruct the local context from a decoded assertion.
    ///
    /// Pure: no lookup is performed and nothing beyond the assertion's own
    /// authorities is granted.
    #[must_use]
    pub fn from_assertion(assertion: IdentityAssertion) -> Self {
        let (subject, authorities, params) = assertion.into_parts();
        Self {
            subject: Some(subject),
            authorities: authorities.into_iter().collect(),
            params,
        }
    }

    /// Get the authenticated subject, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }

    /// Iterate over the granted authorities in sorted order.
    pub fn authorities(&self) -> impl Iterator<Item = &str> {
        self.authorities.iter().map(String::as_str)
    }

    #[must_use]
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// True when at least one of `authorities` is granted.
    #[must_use]
    pub fn has_any_authority(&self, authorities: &[&str]) -> bool {
        authorities.iter().any(|a| self.has_authority(a))
    }

    /// Forwarded token request parameter by name.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// OAuth2 client that requested the original token.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.param(CLIENT_ID_PARAM)
    }

    /// Scopes granted to the original token.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.param(SCOPE_PARAM)
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }
}

impl From<IdentityAssertion> for SecurityContext {
    fn from(assertion: IdentityAssertion) -> Self {
        Self::from_assertion(assertion)
    }
}
