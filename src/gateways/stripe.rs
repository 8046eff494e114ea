use crate::domain::event::{PaymentEvent, PaymentOutcome};
use crate::domain::order::PaymentMethod;
use crate::gateways::{
    header_str, json_i64, json_str, verify_hmac_hex, GatewayAdapter, PollError, WebhookError,
    WebhookParse,
};
use axum::http::HeaderMap;

pub struct StripeAdapter {
    pub base_url: String,
    pub api_key: String,
    pub webhook_secret: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl StripeAdapter {
    fn event_from_session(&self, session: &serde_json::Value, outcome: PaymentOutcome) -> PaymentEvent {
        let mut event = PaymentEvent::new("stripe", outcome);
        event.correlation_id = json_str(session, "/client_reference_id");
        event.provider_payment_id = json_str(session, "/id");
        event.amount_minor = json_i64(session, "/amount_total");
        event.customer_email = json_str(session, "/customer_details/email");
        event.customer_name = json_str(session, "/customer_details/name");
        event.method = Some(PaymentMethod::Card);
        event.raw = session.clone();
        event
    }
}

#[async_trait::async_trait]
impl GatewayAdapter for StripeAdapter {
    fn name(&self) -> &'static str {
        "stripe"
    }

    fn parse_webhook(
        &self,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<WebhookParse, WebhookError> {
        let header = header_str(headers, "stripe-signature")
            .ok_or(WebhookError::InvalidSignature)?;

        let mut timestamp = None;
        let mut v1 = None;
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", t)) => timestamp = Some(t.to_string()),
                Some(("v1", sig)) => v1 = Some(sig.to_string()),
                _ => {}
            }
        }
        let (timestamp, v1) = match (timestamp, v1) {
            (Some(t), Some(v)) => (t, v),
            _ => return Err(WebhookError::InvalidSignature),
        };

        let mut signed = timestamp.into_bytes();
        signed.push(b'.');
        signed.extend_from_slice(body);
        if !verify_hmac_hex(&self.webhook_secret, &signed, &v1) {
            return Err(WebhookError::InvalidSignature);
        }

        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::Unparseable(e.to_string()))?;

        let event_type = payload
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| WebhookError::Unparseable("missing event type".to_string()))?;

        let outcome = match event_type {
            "checkout.session.completed" => PaymentOutcome::Approved,
            "checkout.session.async_payment_failed" => PaymentOutcome::Failed,
            "checkout.session.expired" => PaymentOutcome::Expired,
            _ => return Ok(WebhookParse::Ignored("non-checkout event type")),
        };

        let session = payload
            .pointer("/data/object")
            .cloned()
            .ok_or_else(|| WebhookError::Unparseable("missing data.object".to_string()))?;

        let mut event = self.event_from_session(&session, outcome);
        event.provider_event_id = json_str(&payload, "/id");
        Ok(WebhookParse::Event(event))
    }

    async fn poll_status(&self, provider_payment_id: &str) -> Result<PaymentEvent, PollError> {
        let url = format!("{}/v1/checkout/sessions/{}", self.base_url, provider_payment_id);
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.api_key, None::<&str>)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| PollError::PollFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PollError::PollFailed(format!("HTTP {}", resp.status().as_u16())));
        }

        let session: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PollError::PollFailed(e.to_string()))?;

        let outcome = match (
            json_str(&session, "/payment_status").as_deref(),
            json_str(&session, "/status").as_deref(),
        ) {
            (Some("paid"), _) => PaymentOutcome::Approved,
            (_, Some("expired")) => PaymentOutcome::Expired,
            _ => PaymentOutcome::Pending,
        };

        Ok(self.event_from_session(&session, outcome))
    }
}
