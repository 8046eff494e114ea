use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use song_orders::config::AppConfig;
use song_orders::gateways::mercadopago::MercadoPagoAdapter;
use song_orders::gateways::openpix::OpenPixAdapter;
use song_orders::gateways::pagseguro::PagSeguroAdapter;
use song_orders::gateways::stripe::StripeAdapter;
use song_orders::gateways::GatewayAdapter;
use song_orders::reconcile::transitions::ReconcilePolicy;
use song_orders::service::lyrics::LyricsClient;
use song_orders::service::notifier::{HttpMailer, NotificationDispatcher};
use song_orders::service::order_service::OrderService;
use song_orders::service::reconciliation::ReconciliationService;
use song_orders::store::redis::{RedisGuard, RedisOrderStore};
use song_orders::store::{IdempotencyGuard, OrderStore};
use song_orders::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let redis_client = redis::Client::open(cfg.redis_url.clone())?;
    let http_client = reqwest::Client::new();

    let order_ttl = Duration::from_secs(cfg.order_ttl_secs);
    let store: Arc<dyn OrderStore> = Arc::new(RedisOrderStore::new(
        redis::Client::open(cfg.redis_url.clone())?,
        order_ttl,
    ));
    let guard: Arc<dyn IdempotencyGuard> = Arc::new(RedisGuard::new(redis::Client::open(
        cfg.redis_url.clone(),
    )?));

    let adapters: Arc<Vec<Arc<dyn GatewayAdapter>>> = Arc::new(vec![
        Arc::new(StripeAdapter {
            base_url: cfg.stripe_base_url.clone(),
            api_key: cfg.stripe_api_key.clone(),
            webhook_secret: cfg.stripe_webhook_secret.clone(),
            timeout_ms: cfg.poll_timeout_ms,
            client: http_client.clone(),
        }),
        Arc::new(PagSeguroAdapter {
            base_url: cfg.pagseguro_base_url.clone(),
            token: cfg.pagseguro_token.clone(),
            authenticity_token: cfg.pagseguro_authenticity_token.clone(),
            timeout_ms: cfg.poll_timeout_ms,
            client: http_client.clone(),
        }),
        Arc::new(OpenPixAdapter {
            base_url: cfg.openpix_base_url.clone(),
            app_id: cfg.openpix_app_id.clone(),
            webhook_secret: cfg.openpix_webhook_secret.clone(),
            timeout_ms: cfg.poll_timeout_ms,
            client: http_client.clone(),
        }),
        Arc::new(MercadoPagoAdapter {
            base_url: cfg.mercadopago_base_url.clone(),
            access_token: cfg.mercadopago_access_token.clone(),
            webhook_secret: cfg.mercadopago_webhook_secret.clone(),
            timeout_ms: cfg.poll_timeout_ms,
            client: http_client.clone(),
        }),
    ]);

    let dispatcher = Arc::new(NotificationDispatcher {
        guard: guard.clone(),
        mailer: Arc::new(HttpMailer {
            api_url: cfg.mail_api_url.clone(),
            api_key: cfg.mail_api_key.clone(),
            from: cfg.mail_from.clone(),
            client: http_client.clone(),
        }),
        admin_email: cfg.admin_email.clone(),
        guard_ttl: order_ttl,
        send_timeout: Duration::from_millis(cfg.notify_send_timeout_ms),
    });

    let reconciliation = Arc::new(ReconciliationService {
        store: store.clone(),
        guard,
        dispatcher,
        policy: ReconcilePolicy {
            admin_alert_on_failure: cfg.admin_alert_on_failure,
        },
        event_ttl: order_ttl,
    });

    let state = AppState {
        order_service: Arc::new(OrderService {
            store: store.clone(),
        }),
        reconciliation,
        store,
        adapters,
        lyrics: Arc::new(LyricsClient {
            api_url: cfg.lyrics_api_url.clone(),
            api_key: cfg.lyrics_api_key.clone(),
            timeout_ms: cfg.poll_timeout_ms,
            client: http_client,
        }),
        redis_client: redis_client.clone(),
    };

    // only the client-facing creation and preview routes are throttled;
    // webhook and status routes stay open so providers and pollers never
    // see a 429
    let throttled = Router::new()
        .route("/orders", post(song_orders::http::handlers::orders::create_order))
        .route(
            "/orders/:order_id/checkout",
            post(song_orders::http::handlers::orders::register_checkout),
        )
        .route("/lyrics/preview", post(song_orders::http::handlers::lyrics::preview))
        .route_layer(from_fn_with_state(
            song_orders::http::middleware::rate_limit::RateLimiter {
                redis_client,
                max_per_minute: cfg.rate_limit_per_minute,
            },
            song_orders::http::middleware::rate_limit::enforce,
        ));

    let app = Router::new()
        .merge(throttled)
        .route(
            "/orders/status",
            get(song_orders::http::handlers::orders::status_by_provider_ref),
        )
        .route(
            "/orders/:order_id/status",
            get(song_orders::http::handlers::orders::order_status),
        )
        .route(
            "/webhooks/:provider",
            post(song_orders::http::handlers::webhooks::receive),
        )
        .route("/ops/readiness", get(song_orders::http::handlers::ops::readiness))
        .route("/ops/liveness", get(song_orders::http::handlers::ops::liveness))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
