use crate::domain::event::{PaymentEvent, PaymentOutcome};
use crate::domain::order::PaymentMethod;
use crate::gateways::{
    header_str, json_str, verify_hmac_hex, GatewayAdapter, PollError, WebhookError, WebhookParse,
};
use axum::http::HeaderMap;

pub struct MercadoPagoAdapter {
    pub base_url: String,
    pub access_token: String,
    pub webhook_secret: Option<String>,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl MercadoPagoAdapter {
    fn event_from_payment(&self, payment: &serde_json::Value) -> Option<PaymentEvent> {
        let status = json_str(payment, "/status")?;
        let outcome = match status.as_str() {
            "approved" => PaymentOutcome::Approved,
            "pending" | "in_process" | "authorized" => PaymentOutcome::Pending,
            "rejected" => PaymentOutcome::Failed,
            "cancelled" | "expired" => PaymentOutcome::Expired,
            _ => return None,
        };

        let mut event = PaymentEvent::new("mercadopago", outcome);
        event.correlation_id = json_str(payment, "/external_reference");
        event.provider_payment_id = payment
            .get("id")
            .map(|id| id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()));
        // transaction_amount comes in currency units, not cents
        event.amount_minor = payment
            .get("transaction_amount")
            .and_then(|a| a.as_f64())
            .map(|a| (a * 100.0).round() as i64);
        event.method = match json_str(payment, "/payment_method_id").as_deref() {
            Some("pix") => Some(PaymentMethod::Pix),
            Some(_) => Some(PaymentMethod::Card),
            None => None,
        };
        event.customer_email = json_str(payment, "/payer/email");
        event.customer_name = json_str(payment, "/payer/first_name");
        event.raw = payment.clone();
        Some(event)
    }

    fn verify_signature(&self, headers: &HeaderMap, data_id: &str) -> Result<(), WebhookError> {
        let secret = match &self.webhook_secret {
            Some(s) => s,
            None => return Ok(()),
        };
        let header = header_str(headers, "x-signature").ok_or(WebhookError::InvalidSignature)?;

        let mut ts = None;
        let mut v1 = None;
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("ts", t)) => ts = Some(t.to_string()),
                Some(("v1", sig)) => v1 = Some(sig.to_string()),
                _ => {}
            }
        }
        let (ts, v1) = match (ts, v1) {
            (Some(t), Some(v)) => (t, v),
            _ => return Err(WebhookError::InvalidSignature),
        };

        let request_id = header_str(headers, "x-request-id").unwrap_or("");
        let manifest = format!("id:{};request-id:{};ts:{};", data_id, request_id, ts);
        if verify_hmac_hex(secret, manifest.as_bytes(), &v1) {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}

#[async_trait::async_trait]
impl GatewayAdapter for MercadoPagoAdapter {
    fn name(&self) -> &'static str {
        "mercadopago"
    }

    fn parse_webhook(
        &self,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<WebhookParse, WebhookError> {
        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::Unparseable(e.to_string()))?;

        let topic = json_str(&payload, "/type")
            .or_else(|| json_str(&payload, "/topic"))
            .unwrap_or_default();
        if topic != "payment" {
            return Ok(WebhookParse::Ignored("non-payment topic"));
        }

        let data = payload
            .get("data")
            .cloned()
            .ok_or_else(|| WebhookError::Unparseable("missing data".to_string()))?;
        let data_id = data
            .get("id")
            .map(|id| id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()))
            .ok_or_else(|| WebhookError::Unparseable("missing data.id".to_string()))?;

        self.verify_signature(headers, &data_id)?;

        match self.event_from_payment(&data) {
            Some(mut event) => {
                let notification_id = payload
                    .get("id")
                    .map(|id| id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()));
                event.provider_event_id = notification_id.or_else(|| Some(data_id));
                Ok(WebhookParse::Event(event))
            }
            // thin ping carrying only data.id; the polling fallback completes it
            None => Ok(WebhookParse::Ignored("payment ping without resource")),
        }
    }

    async fn poll_status(&self, provider_payment_id: &str) -> Result<PaymentEvent, PollError> {
        let url = format!("{}/v1/payments/{}", self.base_url, provider_payment_id);
        let resp = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| PollError::PollFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PollError::PollFailed(format!("HTTP {}", resp.status().as_u16())));
        }

        let payment: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PollError::PollFailed(e.to_string()))?;

        self.event_from_payment(&payment)
            .ok_or_else(|| PollError::PollFailed("unrecognized payment status".to_string()))
    }
}
