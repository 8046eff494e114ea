use crate::domain::order::{ErrorEnvelope, ErrorPayload};
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use redis::AsyncCommands;
use tracing::warn;

// applied only to the client-facing creation and preview routes; provider
// webhooks and status polls are never throttled, a 429 there would just
// trigger another redelivery cycle
#[derive(Clone)]
pub struct RateLimiter {
    pub redis_client: redis::Client,
    pub max_per_minute: i64,
}

impl RateLimiter {
    async fn over_limit(&self, route: &str, ip: &str) -> Result<bool, redis::RedisError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let bucket = chrono::Utc::now().timestamp() / 60;
        let key = format!("throttle:{}:{}:{}", route, ip, bucket);
        let count: i64 = conn.incr(&key, 1).await?;
        if count == 1 {
            // the bucket key dies one window after its last first-hit
            let _: bool = conn.expire(&key, 120).await?;
        }
        Ok(count > self.max_per_minute)
    }
}

pub async fn enforce(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let route = request.uri().path().to_string();
    let ip = client_ip(request.headers());

    match limiter.over_limit(&route, &ip).await {
        Ok(true) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorEnvelope {
                error: ErrorPayload {
                    code: "RATE_LIMITED".to_string(),
                    message: "too many requests, slow down".to_string(),
                },
            }),
        )
            .into_response(),
        Ok(false) => next.run(request).await,
        Err(e) => {
            // fail open: losing Redis must not take order creation down
            warn!(error = %e, "rate limit check unavailable");
            next.run(request).await
        }
    }
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
