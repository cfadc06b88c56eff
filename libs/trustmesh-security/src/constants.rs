//! Wire-level names shared by the gateway and resource services.

/// Request header carrying the encoded [`crate::IdentityAssertion`].
///
/// Written only by the gateway. Resource services read it and nothing else.
pub const IDENTITY_ASSERTION_HEADER: &str = "x-identity-assertion";

/// Passthrough key for the OAuth2 client that requested the original token.
pub const CLIENT_ID_PARAM: &str = "client_id";

/// Passthrough key for the space-separated scope granted to the original token.
pub const SCOPE_PARAM: &str = "scope";

/// Passthrough key for the grant type the original token was issued under.
pub const GRANT_TYPE_PARAM: &str = "grant_type";
