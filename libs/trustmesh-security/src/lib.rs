#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod assertion;
pub mod assertion_codec;
pub mod constants;
pub mod context;

pub use assertion::{AssertionError, IdentityAssertion};
pub use context::SecurityContext;

pub use assertion_codec::{
    ASSERTION_PREFIX, AssertionCodec, AssertionDecodeError, AssertionEncodeError,
    MAX_ENCODED_LEN, SIGNED_ASSERTION_PREFIX, decode, encode,
};
