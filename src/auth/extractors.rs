use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use sqlx::SqlitePool;
use tracing::{error, warn};

use super::dto::Session;
use super::repo_types::User;
use super::services::JwtKeys;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<&str> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
}

/// Extracts and validates an access token, returning the user ID. The
/// account must still exist.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    SqlitePool: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .is_none()
        {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ));
        }
        let token = bearer_token(parts).ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            )
        })?;

        let db = SqlitePool::from_ref(state);
        match User::find_by_id(&db, claims.sub).await {
            Ok(Some(_)) => Ok(AuthUser(claims.sub)),
            Ok(None) => {
                warn!(user_id = claims.sub, "token for deleted user");
                Err((StatusCode::UNAUTHORIZED, "User not found".to_string()))
            }
            Err(e) => {
                error!(error = %e, user_id = claims.sub, "auth user lookup failed");
                Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
            }
        }
    }
}

/// Never rejects for missing or bad credentials; the session is simply
/// anonymous. A token whose user no longer exists is anonymous too.
#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Session::default());
        };
        let Ok(claims) = JwtKeys::from_ref(state).verify_access(token) else {
            return Ok(Session::default());
        };

        let user = User::find_by_id(&state.db, claims.sub).await.map_err(|e| {
            error!(error = %e, user_id = claims.sub, "session user lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
        Ok(Session {
            user: user.map(Into::into),
        })
    }
}
