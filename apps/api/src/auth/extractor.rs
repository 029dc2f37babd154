use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::auth::jwt;
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

/// The authenticated caller. Extracting it is the route guard: handlers that
/// take an `AuthUser` reject requests without a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Checks a shared bearer secret in constant time. An empty secret matches
/// nothing.
pub fn bearer_matches(headers: &HeaderMap, secret: &str) -> bool {
    match bearer_token(headers) {
        Some(token) if !secret.is_empty() => token.as_bytes().ct_eq(secret.as_bytes()).into(),
        _ => false,
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;

        let claims = jwt::verify(token, &state.config.jwt_secret).map_err(|e| {
            debug!("Rejected bearer token: {e}");
            AppError::Unauthorized("Not authorized, token failed".to_string())
        })?;

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(claims.sub)
            .fetch_optional(&state.db)
            .await?;
        let user = user.ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized(
                "Account has been deactivated".to_string(),
            ));
        }

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn headers(header: Option<&str>) -> HeaderMap {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0.headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&headers(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&headers(Some("Bearer "))), None);
        assert_eq!(bearer_token(&headers(None)), None);
    }

    #[test]
    fn test_bearer_matches_shared_secret() {
        assert!(bearer_matches(&headers(Some("Bearer hook-secret")), "hook-secret"));
        assert!(!bearer_matches(&headers(Some("Bearer hook-secreT")), "hook-secret"));
        assert!(!bearer_matches(&headers(Some("Bearer hook")), "hook-secret"));
        assert!(!bearer_matches(&headers(None), "hook-secret"));
        assert!(!bearer_matches(&headers(Some("Bearer x")), ""));
    }
}
