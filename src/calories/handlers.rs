use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use time::{Duration, OffsetDateTime, Time};
use tracing::{error, info, instrument, warn};

use super::dto::{ImageLogResponse, ManualEntryRequest, Pagination, SummaryQuery};
use super::repo;
use super::repo_types::{CalorieEntry, CalorieEntryPatch, EntrySource, NewCalorieEntry};
use super::services::{summarize_daily, to_calorie_entries, CalorieSummary};
use crate::{
    auth::extractors::AuthUser,
    recognition::handlers::{read_image_form, MAX_UPLOAD_BYTES},
    state::AppState,
};

type ApiError = (StatusCode, String);

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/calories", get(list_entries))
        .route("/calories/summary", get(summary))
        .route("/calories/:id", get(get_entry))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/calories", post(create_manual_entry))
        .route(
            "/calories/:id",
            axum::routing::put(update_entry).delete(delete_entry),
        )
        .route("/calories/image", post(log_from_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<CalorieEntry>>, ApiError> {
    let limit = p.limit.clamp(1, 100);
    let offset = p.offset.max(0);
    let entries = repo::list_by_user(&state.db, user_id, limit, offset)
        .await
        .map_err(internal)?;
    Ok(Json(entries))
}

#[instrument(skip(state))]
pub async fn get_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<CalorieEntry>, ApiError> {
    repo::get(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, body))]
pub async fn create_manual_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ManualEntryRequest>,
) -> Result<(StatusCode, HeaderMap, Json<CalorieEntry>), ApiError> {
    let food_name = body.food_name.trim();
    if food_name.is_empty() || !(body.calories > 0.0) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please enter food name and calories".into(),
        ));
    }

    let draft = NewCalorieEntry {
        user_id,
        calories: body.calories,
        food_name: Some(food_name.to_string()),
        food_type: body.food_type.map(|t| t.trim().to_lowercase()),
        quantity: body.quantity,
        unit: body.unit,
        source: EntrySource::Manual,
        image_path: None,
        notes: body.notes,
        logged_at: body.logged_at.unwrap_or_else(OffsetDateTime::now_utc),
    };
    let entry = repo::insert(&state.db, &draft).await.map_err(internal)?;

    info!(user_id, entry_id = entry.id, "manual entry saved");
    Ok((StatusCode::CREATED, location(entry.id), Json(entry)))
}

/// POST /calories/image (multipart: `file`, optional `method`)
/// Recognizes the photo and stores one entry per detected item.
#[instrument(skip(state, mp))]
pub async fn log_from_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<ImageLogResponse>), ApiError> {
    let form = read_image_form(&mut mp).await?;
    if !state.processor.validate_image(&form.image) {
        warn!(user_id, bytes = form.image.len(), "rejected invalid image");
        return Err((StatusCode::BAD_REQUEST, "Invalid image file".into()));
    }

    let result = state.processor.process_image(&form.image, form.prefer).await;
    if !result.success() {
        warn!(user_id, method = %result.method(), "image could not be recognized");
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ImageLogResponse {
                result,
                entries: Vec::new(),
            }),
        ));
    }

    let drafts = to_calorie_entries(&result, user_id);
    let mut entries = Vec::with_capacity(drafts.len());
    for draft in &drafts {
        entries.push(repo::insert(&state.db, draft).await.map_err(internal)?);
    }

    info!(user_id, method = %result.method(), saved = entries.len(), "entries logged from image");
    Ok((StatusCode::CREATED, Json(ImageLogResponse { result, entries })))
}

#[instrument(skip(state, patch))]
pub async fn update_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(patch): Json<CalorieEntryPatch>,
) -> Result<Json<CalorieEntry>, ApiError> {
    if matches!(patch.calories, Some(c) if !(c > 0.0)) {
        return Err((StatusCode::BAD_REQUEST, "calories must be positive".into()));
    }
    repo::update(&state.db, user_id, id, &patch)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if repo::delete(&state.db, user_id, id).await.map_err(internal)? {
        info!(user_id, entry_id = id, "entry deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

/// Daily totals for the last `days` UTC days, today included.
#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<CalorieSummary>, ApiError> {
    if !(1..=90).contains(&q.days) {
        return Err((StatusCode::BAD_REQUEST, "days must be between 1 and 90".into()));
    }
    let today = OffsetDateTime::now_utc().replace_time(Time::MIDNIGHT);
    let since = today - Duration::days(q.days - 1);

    let entries = repo::list_since(&state.db, user_id, since)
        .await
        .map_err(internal)?;
    Ok(Json(summarize_daily(&entries)))
}

fn location(id: i64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::try_from(format!("/api/v1/calories/{}", id)) {
        headers.insert(axum::http::header::LOCATION, v);
    }
    headers
}

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "Entry not found".into())
}

fn internal(e: anyhow::Error) -> ApiError {
    error!(error = %e, "calories request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
