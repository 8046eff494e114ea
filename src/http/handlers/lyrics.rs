use crate::domain::order::{ErrorEnvelope, ErrorPayload};
use crate::service::lyrics::LyricsRequest;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

pub async fn preview(
    State(state): State<AppState>,
    Json(req): Json<LyricsRequest>,
) -> impl IntoResponse {
    match state.lyrics.generate(&req).await {
        Ok(text) => (StatusCode::OK, Json(serde_json::json!({"lyrics": text}))).into_response(),
        Err(e) => {
            warn!(error = %e, "lyric generation failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorEnvelope {
                    error: ErrorPayload {
                        code: "GENERATION_UNAVAILABLE".to_string(),
                        message: "could not generate lyrics right now, try again".to_string(),
                    },
                }),
            )
                .into_response()
        }
    }
}
