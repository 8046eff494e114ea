use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let redis_ok = async {
        if let Ok(mut conn) = state.redis_client.get_multiplexed_async_connection().await {
            let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
            return pong.is_ok();
        }
        false
    }
    .await;

    let status = if redis_ok {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(serde_json::json!({"ready": redis_ok, "redis": redis_ok}))).into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (axum::http::StatusCode::OK, Json(serde_json::json!({"alive": true}))).into_response()
}
