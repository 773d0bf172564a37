//! Token derivation and verification.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::claims::{Access, TokenClaims};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Fixed prefix every token starts with.
pub const TOKEN_PREFIX: &str = "pgcrud_";

/// Credential errors. Verification failures deliberately carry no detail
/// beyond "invalid".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Label must match `[A-Za-z0-9_-]+`.
    #[error("invalid token label '{0}': use letters, digits, '_' or '-'")]
    InvalidLabel(String),

    /// A scoped token needs at least one claims entry.
    #[error("scoped token requires at least one namespace claim")]
    EmptyClaims,

    /// The presented token failed verification.
    #[error("invalid token")]
    Invalid,
}

fn label_is_valid(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn mac_hex(secret: &str, data: &str) -> String {
    // HMAC accepts keys of any length; new_from_slice cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Mint a token for `label`, optionally scoped by per-namespace claims.
///
/// `claims` of `None` produces the legacy full-access form. Scoped claims
/// are serialized canonically (lexicographic key order) and the MAC covers
/// the encoded segment, so the claims cannot be altered or removed without
/// re-signing.
pub fn mint_token(
    secret: &str,
    label: &str,
    claims: Option<&BTreeMap<String, Access>>,
) -> Result<String, TokenError> {
    if !label_is_valid(label) {
        return Err(TokenError::InvalidLabel(label.to_string()));
    }

    let data = match claims {
        None => label.to_string(),
        Some(grants) => {
            if grants.is_empty() {
                return Err(TokenError::EmptyClaims);
            }
            let canonical =
                serde_json::to_vec(grants).map_err(|_| TokenError::EmptyClaims)?;
            format!("{label}:{}", URL_SAFE_NO_PAD.encode(canonical))
        }
    };

    let mac = mac_hex(secret, &data);
    Ok(format!("{TOKEN_PREFIX}{data}.{mac}"))
}

/// Verify a presented token and recover its claims.
///
/// Recomputes the MAC over the data segment and compares in constant time;
/// any structural or cryptographic failure is the same opaque error.
pub fn verify_token(secret: &str, token: &str) -> Result<TokenClaims, TokenError> {
    let rest = token.strip_prefix(TOKEN_PREFIX).ok_or(TokenError::Invalid)?;
    // MAC is everything after the last dot; the data segment may not
    // contain dots, so rsplit is unambiguous.
    let (data, mac) = rest.rsplit_once('.').ok_or(TokenError::Invalid)?;
    if data.is_empty() || mac.is_empty() {
        return Err(TokenError::Invalid);
    }

    let mac_bytes = hex::decode(mac).map_err(|_| TokenError::Invalid)?;
    let mut expected =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    expected.update(data.as_bytes());
    expected
        .verify_slice(&mac_bytes)
        .map_err(|_| TokenError::Invalid)?;

    match data.split_once(':') {
        None => {
            if !label_is_valid(data) {
                return Err(TokenError::Invalid);
            }
            Ok(TokenClaims::FullAccess)
        }
        Some((label, encoded)) => {
            if !label_is_valid(label) {
                return Err(TokenError::Invalid);
            }
            let raw = URL_SAFE_NO_PAD
                .decode(encoded)
                .map_err(|_| TokenError::Invalid)?;
            let grants: BTreeMap<String, Access> =
                serde_json::from_slice(&raw).map_err(|_| TokenError::Invalid)?;
            if grants.is_empty() {
                return Err(TokenError::Invalid);
            }
            Ok(TokenClaims::Scoped(grants))
        }
    }
}
