//! Converts the verified principal into the forwarded identity assertion.

use std::collections::BTreeMap;

use http::{HeaderMap, HeaderValue};
use trustmesh_auth::TokenClaims;
use trustmesh_security::constants::{CLIENT_ID_PARAM, GRANT_TYPE_PARAM, SCOPE_PARAM};
use trustmesh_security::{AssertionCodec, IdentityAssertion, constants::IDENTITY_ASSERTION_HEADER};

use crate::auth::AuthenticatedPrincipal;
use crate::error::GatewayError;

/// Writes `x-identity-assertion` on requests leaving the gateway.
#[derive(Debug, Clone)]
pub struct GatewayAuthStage {
    codec: AssertionCodec,
    forward_params: Vec<String>,
}

impl GatewayAuthStage {
    #[must_use]
    pub fn new(codec: AssertionCodec, forward_params: Vec<String>) -> Self {
        Self {
            codec,
            forward_params,
        }
    }

    /// Assertion for a verified principal: subject and authorities copied verbatim,
    /// passthrough limited to the configured parameter names.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Assertion`] when the claims carry no subject.
    pub fn build_assertion(
        &self,
        principal: &AuthenticatedPrincipal,
    ) -> Result<IdentityAssertion, GatewayError> {
        let claims = &principal.0;
        let passthrough: BTreeMap<String, String> = self
            .forward_params
            .iter()
            .filter_map(|key| claim_param(claims, key).map(|v| (key.clone(), v)))
            .collect();

        IdentityAssertion::new(
            claims.subject.clone(),
            claims.authorities.clone(),
            passthrough,
        )
        .map_err(|e| GatewayError::Assertion(e.to_string()))
    }

    /// Rewrite the forwarded identity header for an outbound request.
    ///
    /// Any inbound value is removed first. With a principal the freshly encoded
    /// assertion is the only value left; without one the header is simply absent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Assertion`] when the assertion cannot be built or encoded.
    /// The header is already stripped at that point, so a failed request never
    /// carries a client-supplied value.
    pub fn apply(
        &self,
        headers: &mut HeaderMap,
        principal: Option<&AuthenticatedPrincipal>,
    ) -> Result<(), GatewayError> {
        let stripped = headers.remove(IDENTITY_ASSERTION_HEADER).is_some();
        if stripped {
            tracing::debug!("client-supplied identity assertion removed");
        }

        let Some(principal) = principal else {
            return Ok(());
        };
        let assertion = self.build_assertion(principal)?;
        let encoded = self
            .codec
            .encode(&assertion)
            .map_err(|e| GatewayError::Assertion(e.to_string()))?;
        let value =
            HeaderValue::from_str(&encoded).map_err(|e| GatewayError::Assertion(e.to_string()))?;
        headers.insert(IDENTITY_ASSERTION_HEADER, value);
        Ok(())
    }
}

fn claim_param(claims: &TokenClaims, key: &str) -> Option<String> {
    let value = match key {
        CLIENT_ID_PARAM => claims.client_id.clone(),
        SCOPE_PARAM => claims.scope_string(),
        GRANT_TYPE_PARAM => claims.grant_type.clone()?,
        "jti" => claims.jti.clone(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}
