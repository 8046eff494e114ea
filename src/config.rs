fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: String,
    pub order_ttl_secs: u64,
    pub poll_timeout_ms: u64,
    pub notify_send_timeout_ms: u64,
    pub admin_alert_on_failure: bool,
    pub rate_limit_per_minute: i64,

    pub admin_email: String,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,

    pub lyrics_api_url: String,
    pub lyrics_api_key: String,

    pub stripe_base_url: String,
    pub stripe_api_key: String,
    pub stripe_webhook_secret: String,

    pub pagseguro_base_url: String,
    pub pagseguro_token: String,
    pub pagseguro_authenticity_token: Option<String>,

    pub openpix_base_url: String,
    pub openpix_app_id: String,
    pub openpix_webhook_secret: Option<String>,

    pub mercadopago_base_url: String,
    pub mercadopago_access_token: String,
    pub mercadopago_webhook_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1:6379/"),
            order_ttl_secs: env_or("ORDER_TTL_SECS", "604800").parse().unwrap_or(604_800),
            poll_timeout_ms: env_or("POLL_TIMEOUT_MS", "30000").parse().unwrap_or(30_000),
            notify_send_timeout_ms: env_or("NOTIFY_SEND_TIMEOUT_MS", "3000")
                .parse()
                .unwrap_or(3_000),
            admin_alert_on_failure: env_or("ADMIN_ALERT_ON_FAILURE", "false") == "true",
            rate_limit_per_minute: env_or("RATE_LIMIT_PER_MINUTE", "60").parse().unwrap_or(60),

            admin_email: env_or("ADMIN_EMAIL", "admin@localhost"),
            mail_api_url: env_or("MAIL_API_URL", "https://api.resend.com/emails"),
            mail_api_key: env_or("MAIL_API_KEY", "dev-mail-key"),
            mail_from: env_or("MAIL_FROM", "orders@localhost"),

            lyrics_api_url: env_or("LYRICS_API_URL", "http://localhost:8089/generate"),
            lyrics_api_key: env_or("LYRICS_API_KEY", "dev-lyrics-key"),

            stripe_base_url: env_or("STRIPE_BASE_URL", "https://api.stripe.com"),
            stripe_api_key: env_or("STRIPE_API_KEY", ""),
            stripe_webhook_secret: env_or("STRIPE_WEBHOOK_SECRET", ""),

            pagseguro_base_url: env_or("PAGSEGURO_BASE_URL", "https://api.pagseguro.com"),
            pagseguro_token: env_or("PAGSEGURO_TOKEN", ""),
            pagseguro_authenticity_token: env_opt("PAGSEGURO_AUTHENTICITY_TOKEN"),

            openpix_base_url: env_or("OPENPIX_BASE_URL", "https://api.openpix.com.br"),
            openpix_app_id: env_or("OPENPIX_APP_ID", ""),
            openpix_webhook_secret: env_opt("OPENPIX_WEBHOOK_SECRET"),

            mercadopago_base_url: env_or("MERCADOPAGO_BASE_URL", "https://api.mercadopago.com"),
            mercadopago_access_token: env_or("MERCADOPAGO_ACCESS_TOKEN", ""),
            mercadopago_webhook_secret: env_opt("MERCADOPAGO_WEBHOOK_SECRET"),
        }
    }
}
