//! Credential extraction from request headers.
//!
//! `Authorization: Bearer {token}` is checked first, then `X-API-Key`;
//! the first header present wins. With auth disabled every request runs
//! with full access.

use axum::http::HeaderMap;

use pgcrud_auth::{verify_token, TokenClaims};
use pgcrud_core::{GatewayConfig, GatewayError};

/// Resolve the claims for a request.
pub fn extract_claims(
    config: &GatewayConfig,
    headers: &HeaderMap,
) -> Result<TokenClaims, GatewayError> {
    if !config.auth_enabled {
        return Ok(TokenClaims::FullAccess);
    }
    let Some(secret) = config.master_secret.as_deref() else {
        // Configuration validation makes this unreachable; deny anyway.
        return Err(GatewayError::Unauthenticated(
            "credentials are not configured".into(),
        ));
    };

    let token = bearer_token(headers)
        .or_else(|| header_value(headers, "x-api-key"))
        .ok_or_else(|| GatewayError::Unauthenticated("Missing credentials".into()))?;

    verify_token(secret, &token)
        .map_err(|_| GatewayError::Unauthenticated("Invalid credentials".into()))
}

/// True when the caller presented a credential that verifies; used by the
/// health route to decide whether to include database details.
pub fn has_valid_claims(config: &GatewayConfig, headers: &HeaderMap) -> bool {
    extract_claims(config, headers).is_ok()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = header_value(headers, "authorization")?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::to_string)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pgcrud_auth::mint_token;

    fn config(auth: bool, secret: Option<&str>) -> GatewayConfig {
        GatewayConfig {
            auth_enabled: auth,
            master_secret: secret.map(str::to_string),
            ..GatewayConfig::default()
        }
    }

    fn headers(pairs: &[(&str, String)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::try_from(*name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_auth_disabled_is_full_access() {
        let claims = extract_claims(&config(false, None), &HeaderMap::new()).unwrap();
        assert_eq!(claims, TokenClaims::FullAccess);
    }

    #[test]
    fn test_missing_credentials() {
        let err = extract_claims(&config(true, Some("s")), &HeaderMap::new()).unwrap_err();
        assert_eq!(err.status(), 401);
    }

    #[test]
    fn test_bearer_then_api_key() {
        let token = mint_token("s", "app", None).unwrap();

        let via_bearer = headers(&[("authorization", format!("Bearer {token}"))]);
        assert!(extract_claims(&config(true, Some("s")), &via_bearer).is_ok());

        let via_key = headers(&[("x-api-key", token.clone())]);
        assert!(extract_claims(&config(true, Some("s")), &via_key).is_ok());

        // Authorization wins when both are present, even if it is invalid.
        let both = headers(&[
            ("authorization", "Bearer garbage".to_string()),
            ("x-api-key", token),
        ]);
        assert!(extract_claims(&config(true, Some("s")), &both).is_err());
    }

    #[test]
    fn test_invalid_token_is_unauthenticated() {
        let forged = headers(&[("authorization", "Bearer pgcrud_x.00".to_string())]);
        let err = extract_claims(&config(true, Some("s")), &forged).unwrap_err();
        assert_eq!(err.status(), 401);
        assert_eq!(err.kind(), "unauthenticated");
    }
}
