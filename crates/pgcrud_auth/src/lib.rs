//! Stateless capability tokens for the pgcrud gateway.
//!
//! A token is `pgcrud_{data}.{hex_mac}` where `data` is a label, optionally
//! followed by `:` and the base64url-encoded claims document, and the MAC is
//! HMAC-SHA-256 over `data` keyed by the master secret. Nothing is stored
//! server-side: possession of a token whose MAC verifies is the capability.
//!
//! Because the MAC covers the claims segment, trimming the claims off a
//! scoped token (or grafting claims onto a legacy full-access token) always
//! fails verification.

mod claims;
mod token;

pub use claims::{Access, AccessMode, TokenClaims, WILDCARD_NAMESPACE};
pub use token::{mint_token, verify_token, TokenError, TOKEN_PREFIX};

/// Credential operation result type.
pub type Result<T> = std::result::Result<T, TokenError>;
