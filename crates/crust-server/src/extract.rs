//! Bearer-token extractors.
//!
//! `AuthUser` resolves the `Authorization` header to a stored account;
//! `AdminUser` additionally gates on the admin role. Each failure mode has
//! its own message so a client can tell a missing header from a dead token
//! from a deleted account.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crust_auth::TokenError;
use crust_db::UserStore;
use crust_domain::User;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, resolved from a bearer token.
pub struct AuthUser(pub User);

/// An authenticated caller that also holds the admin role.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid token format".to_string()))?;

        let claims = state.tokens.verify(token).map_err(|err| match err {
            TokenError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized("Token verification failed".to_string()),
        })?;

        // The token may outlive the account it was issued for.
        let user = state
            .store
            .user_by_id(claims.sub)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
