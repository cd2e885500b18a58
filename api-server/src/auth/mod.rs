//! Authentication: user store, JWT claims, and bearer-token resolution.

mod store;

pub use store::{AuthClaims, AuthError, AuthSession, UserStore, UserSummary};

use axum::http::HeaderMap;
use td_core::principal::Principal;

/// Pull the bearer token out of the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get("Authorization")
        .ok_or_else(|| AuthError::Unauthorized("Missing Authorization header".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| AuthError::Unauthorized("Invalid Authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::Unauthorized("Authorization must be a Bearer token".to_string()))
}

/// Resolve the caller's principal from request headers
pub async fn resolve_principal(
    store: &UserStore,
    headers: &HeaderMap,
) -> Result<Principal, AuthError> {
    let token = extract_bearer_token(headers)?;
    store.authorize_bearer(token).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_static("Bearer token-123"),
        );

        let token = extract_bearer_token(&headers).unwrap();
        assert_eq!(token, "token-123");
    }

    #[test]
    fn rejects_when_authorization_header_missing() {
        let headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());
    }
}
