use crate::{claims::TokenClaims, errors::TokenError};

/// Verifies a signed access token and returns its claim set.
///
/// Implementations are pure: no I/O, no state shared across calls.
pub trait TokenCodec: Send + Sync {
    /// Verify signature and expiry, then extract the claims.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` when the signature or algorithm does not verify
    /// - `ExpiredToken` when `exp` is in the past
    /// - `MalformedToken` when the token or its claim set cannot be parsed
    fn verify(&self, token: &str) -> Result<TokenClaims, TokenError>;
}
