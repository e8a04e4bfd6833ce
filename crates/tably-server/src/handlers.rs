use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use tably_core::chat::{ChatReply, ChatRequest, SimpleChatReply, SimpleChatRequest};
use tably_core::errors::ChatError;
use tably_core::route::{RouterInput, RouterOutput};
use tably_core::weather::{GeoPoint, WeatherQuery, WeatherReading};
use tably_llm::TokenStream;

use crate::server::AppState;

/// Boundary error: maps the error taxonomy onto HTTP statuses with a
/// small JSON body.
pub struct ApiError(ChatError);

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": self.0.error_kind(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    Ok(Json(state.core.process_message(request).await?))
}

pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let stream = state.core.process_streaming(request).await?;
    Ok(token_response(stream))
}

pub async fn chat_simple(
    State(state): State<AppState>,
    Json(request): Json<SimpleChatRequest>,
) -> Result<Json<SimpleChatReply>, ApiError> {
    Ok(Json(state.core.process_simple(request).await?))
}

pub async fn chat_simple_stream(
    State(state): State<AppState>,
    Json(request): Json<SimpleChatRequest>,
) -> Result<Response, ApiError> {
    let stream = state.core.process_simple_streaming(request).await?;
    Ok(token_response(stream))
}

pub async fn route(Json(input): Json<RouterInput>) -> Result<Json<RouterOutput>, ApiError> {
    if input.message.trim().is_empty() {
        return Err(ChatError::InvalidArgument("message must not be empty".to_string()).into());
    }
    Ok(Json(tably_router::route_message(&input)))
}

pub async fn weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherReading>, ApiError> {
    Ok(Json(state.weather.get_weather(&query).await?))
}

#[derive(Debug, Deserialize)]
pub struct GeocodeParams {
    #[serde(default)]
    q: String,
}

pub async fn geocode(
    State(state): State<AppState>,
    Query(params): Query<GeocodeParams>,
) -> Result<Json<GeoPoint>, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ChatError::InvalidArgument("q must not be empty".to_string()).into());
    }
    Ok(Json(state.geocoder.geocode(&params.q).await?))
}

/// Chunked plain-text body of raw tokens, terminated by stream end.
/// A mid-stream error item aborts the connection, which is how the
/// client observes interruption.
fn token_response(stream: TokenStream) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
