use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use super::{PreferMethod, RecognitionResult};
use crate::state::AppState;

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// An uploaded image plus the recognition preference sent with it.
pub struct ImageForm {
    pub image: Bytes,
    pub prefer: Option<PreferMethod>,
}

/// Reads the `file` part and the optional `method` part of a multipart form.
pub async fn read_image_form(mp: &mut Multipart) -> Result<ImageForm, (StatusCode, String)> {
    let mut image = None;
    let mut prefer = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                image = Some(data);
            }
            Some("method") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                prefer = PreferMethod::parse(&text).map_err(|e| (StatusCode::BAD_REQUEST, e))?;
            }
            _ => {}
        }
    }
    let image = image.ok_or((StatusCode::BAD_REQUEST, "file is required".to_string()))?;
    Ok(ImageForm { image, prefer })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/estimate-calories", post(estimate_calories))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// POST /estimate-calories (multipart `file`)
/// Visual estimation first, label reading as fallback; nothing is stored.
#[instrument(skip(state, mp))]
pub async fn estimate_calories(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<RecognitionResult>, (StatusCode, String)> {
    let form = read_image_form(&mut mp).await?;
    if !state.processor.validate_image(&form.image) {
        warn!(bytes = form.image.len(), "rejected invalid image");
        return Err((StatusCode::BAD_REQUEST, "Invalid image file".into()));
    }

    let result = state
        .processor
        .process_image(&form.image, Some(PreferMethod::Visual))
        .await;
    info!(method = %result.method(), success = result.success(), "calories estimated");
    Ok(Json(result))
}
