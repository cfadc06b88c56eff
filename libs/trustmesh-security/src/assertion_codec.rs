//! Forwarded-header encoding of [`IdentityAssertion`].
//!
//! Wire format:
//!
//! ```text
//! tm1:<base64url(json)>                 unsigned
//! tm1s:<base64url(json)>:<base64url(hmac-sha256)>   signed
//! ```
//!
//! The JSON body is a fixed-shape object (`sub`, `auth`, `ext`) serialized in field
//! order with sorted passthrough keys, so every assertion has exactly one encoding.
//! Decoding re-encodes the parsed value and rejects any input that differs, which
//! keeps the accepted set equal to the image of [`encode`].
//!
//! The `:` separator never appears in a compact JWT, so an access token can never be
//! mistaken for an assertion and the reverse.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::assertion::IdentityAssertion;

/// Prefix of an unsigned assertion.
pub const ASSERTION_PREFIX: &str = "tm1";

/// Prefix of an HMAC-signed assertion.
pub const SIGNED_ASSERTION_PREFIX: &str = "tm1s";

/// Upper bound on an encoded header value, in bytes.
pub const MAX_ENCODED_LEN: usize = 8 * 1024;

const SEPARATOR: char = ':';

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum AssertionEncodeError {
    #[error("failed to serialize assertion: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("encoded assertion is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("invalid assertion signing key")]
    InvalidKey,
}

#[derive(Debug, thiserror::Error)]
pub enum AssertionDecodeError {
    #[error("assertion is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("assertion has no version prefix")]
    MissingPrefix,

    #[error("unsupported assertion version: {0}")]
    UnsupportedVersion(String),

    #[error("assertion payload is not valid base64url: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),

    #[error("assertion payload is not a valid assertion: {0}")]
    InvalidStructure(#[source] serde_json::Error),

    #[error("assertion subject is empty")]
    EmptySubject,

    #[error("assertion is not in canonical form")]
    NonCanonical,

    #[error("assertion signature is missing")]
    MissingSignature,

    #[error("assertion signature does not verify")]
    InvalidSignature,
}

impl AssertionDecodeError {
    /// Stable, content-free label for logs and problem details.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TooLong { .. } => "too_long",
            Self::MissingPrefix => "missing_prefix",
            Self::UnsupportedVersion(_) => "unsupported_version",
            Self::InvalidEncoding(_) => "invalid_encoding",
            Self::InvalidStructure(_) => "invalid_structure",
            Self::EmptySubject => "empty_subject",
            Self::NonCanonical => "non_canonical",
            Self::MissingSignature => "missing_signature",
            Self::InvalidSignature => "invalid_signature",
        }
    }
}

#[derive(Serialize)]
struct WireAssertionRef<'a> {
    sub: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    auth: &'a [String],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    ext: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireAssertion {
    sub: String,
    #[serde(default)]
    auth: Vec<String>,
    #[serde(default)]
    ext: BTreeMap<String, String>,
}

fn encode_payload(assertion: &IdentityAssertion) -> Result<String, AssertionEncodeError> {
    let wire = WireAssertionRef {
        sub: assertion.subject(),
        auth: assertion.authorities(),
        ext: assertion.passthrough(),
    };
    let json = serde_json::to_vec(&wire).map_err(AssertionEncodeError::Serialize)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_payload(payload: &str) -> Result<IdentityAssertion, AssertionDecodeError> {
    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(AssertionDecodeError::InvalidEncoding)?;
    let wire: WireAssertion =
        serde_json::from_slice(&json).map_err(AssertionDecodeError::InvalidStructure)?;
    IdentityAssertion::new(wire.sub, wire.auth, wire.ext)
        .map_err(|_| AssertionDecodeError::EmptySubject)
}

fn check_len(len: usize) -> Result<(), AssertionEncodeError> {
    if len > MAX_ENCODED_LEN {
        return Err(AssertionEncodeError::TooLong {
            len,
            max: MAX_ENCODED_LEN,
        });
    }
    Ok(())
}

/// Encode an assertion as an unsigned header value.
///
/// # Errors
///
/// Returns [`AssertionEncodeError::TooLong`] when the result would exceed
/// [`MAX_ENCODED_LEN`].
pub fn encode(assertion: &IdentityAssertion) -> Result<String, AssertionEncodeError> {
    let out = format!("{ASSERTION_PREFIX}{SEPARATOR}{}", encode_payload(assertion)?);
    check_len(out.len())?;
    Ok(out)
}

/// Decode an unsigned header value produced by [`encode`].
///
/// # Errors
///
/// Returns [`AssertionDecodeError`] for any value that [`encode`] could not have
/// produced.
pub fn decode(value: &str) -> Result<IdentityAssertion, AssertionDecodeError> {
    if value.len() > MAX_ENCODED_LEN {
        return Err(AssertionDecodeError::TooLong {
            len: value.len(),
            max: MAX_ENCODED_LEN,
        });
    }
    let (prefix, payload) = value
        .split_once(SEPARATOR)
        .ok_or(AssertionDecodeError::MissingPrefix)?;
    if prefix != ASSERTION_PREFIX {
        return Err(AssertionDecodeError::UnsupportedVersion(prefix.to_owned()));
    }
    let assertion = decode_payload(payload)?;
    ensure_canonical(value, encode(&assertion).ok().as_deref())?;
    Ok(assertion)
}

fn ensure_canonical(value: &str, reencoded: Option<&str>) -> Result<(), AssertionDecodeError> {
    if reencoded == Some(value) {
        Ok(())
    } else {
        Err(AssertionDecodeError::NonCanonical)
    }
}

/// Assertion codec in either plain or signed mode.
///
/// Plain mode is the base protocol and relies on resource services being reachable
/// only through the gateway. Signed mode appends an HMAC-SHA256 tag computed with a
/// mesh-internal key; a signed-mode codec rejects unsigned values outright.
#[derive(Clone, Default)]
pub struct AssertionCodec {
    key: Option<SecretString>,
}

impl std::fmt::Debug for AssertionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionCodec")
            .field("signed", &self.key.is_some())
            .finish()
    }
}

impl AssertionCodec {
    /// Plain (unsigned) codec.
    #[must_use]
    pub fn plain() -> Self {
        Self { key: None }
    }

    /// Codec that signs on encode and requires a valid signature on decode.
    #[must_use]
    pub fn signed(key: SecretString) -> Self {
        Self { key: Some(key) }
    }

    /// Build from an optional key: `Some` selects signed mode.
    #[must_use]
    pub fn from_key(key: Option<SecretString>) -> Self {
        Self { key }
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.key.is_some()
    }

    /// Encode an assertion to a header value.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionEncodeError`] when serialization fails, the key is unusable
    /// or the value exceeds [`MAX_ENCODED_LEN`].
    pub fn encode(&self, assertion: &IdentityAssertion) -> Result<String, AssertionEncodeError> {
        let Some(key) = &self.key else {
            return encode(assertion);
        };
        let body = format!(
            "{SIGNED_ASSERTION_PREFIX}{SEPARATOR}{}",
            encode_payload(assertion)?
        );
        let tag = sign(key, &body).ok_or(AssertionEncodeError::InvalidKey)?;
        let out = format!("{body}{SEPARATOR}{}", URL_SAFE_NO_PAD.encode(tag));
        check_len(out.len())?;
        Ok(out)
    }

    /// Decode a header value produced by [`AssertionCodec::encode`] in the same mode.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionDecodeError`] for any value outside the image of `encode`,
    /// including a missing or wrong signature in signed mode.
    pub fn decode(&self, value: &str) -> Result<IdentityAssertion, AssertionDecodeError> {
        let Some(key) = &self.key else {
            return decode(value);
        };
        if value.len() > MAX_ENCODED_LEN {
            return Err(AssertionDecodeError::TooLong {
                len: value.len(),
                max: MAX_ENCODED_LEN,
            });
        }
        let (prefix, _) = value
            .split_once(SEPARATOR)
            .ok_or(AssertionDecodeError::MissingPrefix)?;
        if prefix != SIGNED_ASSERTION_PREFIX {
            return Err(AssertionDecodeError::UnsupportedVersion(prefix.to_owned()));
        }
        let (body, tag) = value
            .rsplit_once(SEPARATOR)
            .filter(|(body, _)| body.len() > prefix.len())
            .ok_or(AssertionDecodeError::MissingSignature)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| AssertionDecodeError::InvalidSignature)?;
        verify(key, body, &tag)?;

        let payload = &body[prefix.len() + SEPARATOR.len_utf8()..];
        let assertion = decode_payload(payload)?;
        ensure_canonical(value, self.encode(&assertion).ok().as_deref())?;
        Ok(assertion)
    }
}

fn mac(key: &SecretString) -> Option<HmacSha256> {
    HmacSha256::new_from_slice(key.expose_secret().as_bytes()).ok()
}

fn sign(key: &SecretString, body: &str) -> Option<Vec<u8>> {
    let mut mac = mac(key)?;
    mac.update(body.as_bytes());
    Some(mac.finalize().into_bytes().to_vec())
}

fn verify(key: &SecretString, body: &str, tag: &[u8]) -> Result<(), AssertionDecodeError> {
    let mut mac = mac(key).ok_or(AssertionDecodeError::InvalidSignature)?;
    mac.update(body.as_bytes());
    mac.verify_slice(tag)
        .map_err(|_| AssertionDecodeError::InvalidSignature)
}
