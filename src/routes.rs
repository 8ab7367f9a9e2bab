use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    models::{ImagePayload, UserInput},
    render::{decode_data_url, placeholder_svg, CardImage},
    session::{Session, SessionError, SessionSnapshot},
    settings::{PublicSettings, SettingsError, SettingsUpdate},
};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)] Session(#[from] SessionError),
    #[error(transparent)] Settings(#[from] SettingsError),
    #[error("invalid upload: {0}")] BadUpload(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Session(SessionError::InputRequired { .. }) | ApiError::BadUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::Session(SessionError::NothingToRegenerate) => StatusCode::CONFLICT,
            ApiError::Settings(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(|| async { "ok" }))
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/settings/language/toggle", post(toggle_language))
        .route("/api/settings/theme/toggle", post(toggle_theme))
        .route("/api/analyze", post(analyze))
        .route("/api/regenerate", post(regenerate))
        .route("/api/reset", post(reset))
        .route("/api/view", get(view))
        .route("/api/cards/:index/image", get(card_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

pub async fn get_settings(State(state): State<AppState>) -> Json<PublicSettings> {
    Json(state.session.settings().public())
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<SettingsUpdate>,
) -> Result<Json<PublicSettings>, ApiError> {
    Ok(Json(state.session.settings().update(body)?))
}

pub async fn toggle_language(State(state): State<AppState>) -> Result<Json<PublicSettings>, ApiError> {
    let language = state.session.settings().toggle_language()?;
    tracing::info!("🌐 Language switched to {:?}", language);
    Ok(Json(state.session.settings().public()))
}

pub async fn toggle_theme(State(state): State<AppState>) -> Result<Json<PublicSettings>, ApiError> {
    state.session.settings().toggle_theme()?;
    Ok(Json(state.session.settings().public()))
}

/// Multipart form: `text` (may be empty) and an optional `image` file.
pub async fn analyze(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<SessionSnapshot>, ApiError> {
    let mut text = String::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadUpload(e.to_string()))? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => {
                text = field.text().await.map_err(|e| ApiError::BadUpload(e.to_string()))?;
            }
            Some("image") => {
                let declared = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| ApiError::BadUpload(e.to_string()))?;
                if !data.is_empty() {
                    image = Some(image_payload(declared, data)?);
                }
            }
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(Json(state.session.submit(UserInput::new(text, image)).await?))
}

// Trust a declared image/* type, otherwise sniff the bytes.
fn image_payload(declared: Option<String>, data: Bytes) -> Result<ImagePayload, ApiError> {
    let mime_type = match declared.filter(|m| m.starts_with("image/")) {
        Some(mime) => mime,
        None => image::guess_format(&data)
            .map(|format| format.to_mime_type().to_string())
            .map_err(|_| ApiError::BadUpload("file is not a recognizable image".into()))?,
    };
    Ok(ImagePayload::new(mime_type, data))
}

pub async fn regenerate(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.session.regenerate().await?))
}

pub async fn reset(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.reset())
}

pub async fn view(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct CardQuery {
    view: Option<Uuid>,
}

pub async fn card_image(
    Path(index): Path<usize>,
    Query(query): Query<CardQuery>,
    State(state): State<AppState>,
) -> Response {
    let Some((suggestion, image)) = state.session.card_image(index, query.view) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match image {
        CardImage::Loading => StatusCode::ACCEPTED.into_response(),
        CardImage::Ready(url) => match decode_data_url(&url) {
            Some((mime, bytes)) => ([(header::CONTENT_TYPE, mime)], bytes).into_response(),
            None => {
                tracing::warn!("⚠️ Card {} holds an undecodable image; serving placeholder", index);
                ([(header::CONTENT_TYPE, "image/svg+xml")], placeholder_svg(&suggestion)).into_response()
            }
        },
        CardImage::Unavailable => {
            ([(header::CONTENT_TYPE, "image/svg+xml")], placeholder_svg(&suggestion)).into_response()
        }
    }
}
