//! HMAC-SHA256 compact token codec shared by the issuer and the gateway.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};

use crate::{claims::TokenClaims, errors::TokenError, traits::TokenCodec};

/// Symmetric HS256 token codec.
///
/// The issuer uses [`Hs256TokenCodec::mint`]; the gateway only calls
/// [`TokenCodec::verify`]. Both sides are configured with the same signing key.
#[derive(Clone)]
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for Hs256TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hs256TokenCodec")
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl Hs256TokenCodec {
    /// Codec verifying signature and `exp` only. `aud` is left to the caller's
    /// route policy.
    #[must_use]
    pub fn new(signing_key: &SecretString) -> Self {
        let secret = signing_key.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Clock skew tolerated on `exp`, in seconds.
    #[must_use]
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.validation.leeway = seconds;
        self
    }

    /// Sign a claim set into a compact token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] when the claims cannot be serialized or signed.
    pub fn mint(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl TokenCodec for Hs256TokenCodec {
    fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| map_jwt_error(e.kind()))
    }
}

fn map_jwt_error(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => TokenError::MalformedToken,
        _ => TokenError::InvalidToken,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn key(value: &str) -> SecretString {
        SecretString::from(value.to_owned())
    }

    fn now() -> i64 {
        i64::try_from(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        )
        .unwrap()
    }

    fn claims(exp: i64) -> TokenClaims {
        TokenClaims {
            subject: "alice".to_owned(),
            authorities: vec!["p1".to_owned(), "p2".to_owned()],
            client_id: "c1".to_owned(),
            scope: vec!["all".to_owned()],
            aud: vec!["order".to_owned()],
            grant_type: Some("password".to_owned()),
            exp,
            iat: now(),
            jti: "jti-1".to_owned(),
        }
    }

    #[test]
    fn mint_then_verify_returns_claims() {
        let codec = Hs256TokenCodec::new(&key("uaa123"));
        let original = claims(now() + 3600);

        let token = codec.mint(&original).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.verify(&token).unwrap(), original);
    }

    #[test]
    fn wrong_key_is_invalid() {
        let issuer = Hs256TokenCodec::new(&key("uaa123"));
        let gateway = Hs256TokenCodec::new(&key("other"));
        let token = issuer.mint(&claims(now() + 3600)).unwrap();

        assert_eq!(gateway.verify(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn expired_token_is_reported() {
        let codec = Hs256TokenCodec::new(&key("uaa123"));
        let token = codec.mint(&claims(now() - 3600)).unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::ExpiredToken));
    }

    #[test]
    fn leeway_accepts_recently_expired() {
        let codec = Hs256TokenCodec::new(&key("uaa123")).with_leeway(600);
        let token = codec.mint(&claims(now() - 60)).unwrap();

        assert!(codec.verify(&token).is_ok());
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = Hs256TokenCodec::new(&key("uaa123"));

        assert_eq!(codec.verify("not-a-token"), Err(TokenError::MalformedToken));
        assert_eq!(codec.verify(""), Err(TokenError::MalformedToken));
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let codec = Hs256TokenCodec::new(&key("uaa123"));
        let token = codec.mint(&claims(now() + 3600)).unwrap();
        let mut escalated = claims(now() + 3600);
        escalated.authorities.push("admin".to_owned());
        let forged = codec.mint(&escalated).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(codec.verify(&spliced), Err(TokenError::InvalidToken));
    }

    #[test]
    fn audience_is_not_checked_here() {
        let codec = Hs256TokenCodec::new(&key("uaa123"));
        let mut other = claims(now() + 3600);
        other.aud = vec!["billing".to_owned()];
        let token = codec.mint(&other).unwrap();

        assert_eq!(codec.verify(&token).unwrap().aud, ["billing".to_owned()]);
    }

    #[test]
    fn debug_hides_keys() {
        let codec = Hs256TokenCodec::new(&key("uaa123"));
        assert!(!format!("{codec:?}").contains("uaa123"));
    }
}
