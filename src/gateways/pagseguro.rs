use crate::domain::event::{PaymentEvent, PaymentOutcome};
use crate::domain::order::PaymentMethod;
use crate::gateways::{
    header_str, json_i64, json_str, GatewayAdapter, PollError, WebhookError, WebhookParse,
};
use axum::http::HeaderMap;

pub struct PagSeguroAdapter {
    pub base_url: String,
    pub token: String,
    pub authenticity_token: Option<String>,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl PagSeguroAdapter {
    fn parse_order(&self, payload: &serde_json::Value) -> Result<WebhookParse, WebhookError> {
        if payload.get("reference_id").is_none() && payload.get("charges").is_none() {
            return Err(WebhookError::Unparseable("not an order payload".to_string()));
        }

        let charge = payload.pointer("/charges/0");
        let (outcome, charge_id, amount, method) = match charge {
            Some(c) => {
                let status = json_str(c, "/status").unwrap_or_default();
                let outcome = match status.as_str() {
                    "PAID" => PaymentOutcome::Approved,
                    "AUTHORIZED" | "WAITING" | "IN_ANALYSIS" => PaymentOutcome::Pending,
                    "DECLINED" => PaymentOutcome::Failed,
                    "CANCELED" => PaymentOutcome::Expired,
                    _ => return Ok(WebhookParse::Ignored("unrecognized charge status")),
                };
                let method = match json_str(c, "/payment_method/type").as_deref() {
                    Some("PIX") => Some(PaymentMethod::Pix),
                    Some(_) => Some(PaymentMethod::Card),
                    None => None,
                };
                (
                    outcome,
                    json_str(c, "/id"),
                    json_i64(c, "/amount/value"),
                    method,
                )
            }
            // charge-less order with a qr_code: PIX charge was generated, nothing paid yet
            None if payload.get("qr_codes").is_some() => {
                (PaymentOutcome::Pending, None, None, Some(PaymentMethod::Pix))
            }
            None => return Ok(WebhookParse::Ignored("order without charges")),
        };

        let mut event = PaymentEvent::new("pagseguro", outcome);
        event.correlation_id = json_str(payload, "/reference_id");
        event.provider_payment_id = json_str(payload, "/id");
        event.provider_event_id = charge_id.map(|id| format!("{}:{:?}", id, outcome));
        event.amount_minor = amount;
        event.method = method;
        event.customer_email = json_str(payload, "/customer/email");
        event.customer_name = json_str(payload, "/customer/name");
        event.raw = payload.clone();
        Ok(WebhookParse::Event(event))
    }
}

#[async_trait::async_trait]
impl GatewayAdapter for PagSeguroAdapter {
    fn name(&self) -> &'static str {
        "pagseguro"
    }

    fn parse_webhook(
        &self,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<WebhookParse, WebhookError> {
        if let Some(expected) = &self.authenticity_token {
            let provided = header_str(headers, "x-authenticity-token").unwrap_or("");
            if provided != expected {
                return Err(WebhookError::InvalidSignature);
            }
        }

        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::Unparseable(e.to_string()))?;
        self.parse_order(&payload)
    }

    async fn poll_status(&self, provider_payment_id: &str) -> Result<PaymentEvent, PollError> {
        let url = format!("{}/orders/{}", self.base_url, provider_payment_id);
        let resp = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| PollError::PollFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PollError::PollFailed(format!("HTTP {}", resp.status().as_u16())));
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PollError::PollFailed(e.to_string()))?;

        match self.parse_order(&payload) {
            Ok(WebhookParse::Event(event)) => Ok(event),
            Ok(WebhookParse::Ignored(reason)) => Err(PollError::PollFailed(reason.to_string())),
            Err(e) => Err(PollError::PollFailed(e.to_string())),
        }
    }
}
