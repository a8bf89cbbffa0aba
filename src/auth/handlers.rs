use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest, Session,
            SessionResponse, UpdateProfileRequest,
        },
        extractors::AuthUser,
        password::{hash_password, verify_password},
        repo::UserStoreError,
        repo_types::User,
        services::{validate_email, validate_password, validate_username, JwtKeys},
    },
    state::AppState,
};

type ApiError = (StatusCode, String);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/session", get(get_session))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).put(update_me).delete(delete_me))
}

fn bad_request(msg: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.to_string())
}

fn internal<E: std::fmt::Display>(e: E) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn store_error(e: UserStoreError) -> ApiError {
    match e {
        UserStoreError::UsernameTaken | UserStoreError::EmailTaken => {
            warn!(error = %e, "unique constraint violated");
            (StatusCode::CONFLICT, e.to_string())
        }
        UserStoreError::Other(e) => {
            error!(error = %e, "user store failed");
            internal(e)
        }
    }
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user.id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        internal(e)
    })?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    validate_username(&payload.username).map_err(bad_request)?;
    validate_email(&payload.email).map_err(bad_request)?;
    validate_password(&payload.password).map_err(bad_request)?;
    if let Some(confirm) = &payload.confirm_password {
        if confirm != &payload.password {
            return Err(bad_request("Passwords do not match"));
        }
    }

    let hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        internal(e)
    })?;

    let user = User::create(&state.db, &payload.username, &payload.email, &hash)
        .await
        .map_err(store_error)?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(bad_request("Please enter both username and password"));
    }

    let user = match User::find_by_username(&state.db, username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(%username, "login unknown username");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_username failed");
            return Err(internal(e));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        internal(e)
    })?;
    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(user_id = user.id, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(session))]
pub async fn get_session(session: Session) -> Json<SessionResponse> {
    Json(session.into())
}

async fn load_user(state: &AppState, user_id: i64) -> Result<User, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "user lookup failed");
            internal(e)
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = load_user(&state, user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let email = payload.email.map(|e| e.trim().to_lowercase());
    if let Some(email) = &email {
        validate_email(email).map_err(bad_request)?;
    }

    let password_hash = match payload.password.as_deref().filter(|p| !p.is_empty()) {
        Some(p) => {
            validate_password(p).map_err(bad_request)?;
            Some(hash_password(p).map_err(internal)?)
        }
        None => None,
    };

    let user = User::update_profile(
        &state.db,
        user_id,
        email.as_deref(),
        password_hash.as_deref(),
    )
    .await
    .map_err(store_error)?
    .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    info!(user_id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, ApiError> {
    if !User::delete(&state.db, user_id).await.map_err(internal)? {
        return Err((StatusCode::UNAUTHORIZED, "User not found".into()));
    }
    info!(user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
