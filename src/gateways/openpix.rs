use crate::domain::event::{PaymentEvent, PaymentOutcome};
use crate::domain::order::PaymentMethod;
use crate::gateways::{
    header_str, json_i64, json_str, verify_hmac_base64, GatewayAdapter, PollError, WebhookError,
    WebhookParse,
};
use axum::http::HeaderMap;

pub struct OpenPixAdapter {
    pub base_url: String,
    pub app_id: String,
    pub webhook_secret: Option<String>,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl OpenPixAdapter {
    fn event_from_charge(
        &self,
        charge: &serde_json::Value,
        outcome: PaymentOutcome,
    ) -> PaymentEvent {
        let mut event = PaymentEvent::new("openpix", outcome);
        event.correlation_id = json_str(charge, "/correlationID");
        event.provider_payment_id =
            json_str(charge, "/transactionID").or_else(|| json_str(charge, "/correlationID"));
        event.amount_minor = json_i64(charge, "/value");
        event.method = Some(PaymentMethod::Pix);
        event.customer_email = json_str(charge, "/customer/email");
        event.customer_name = json_str(charge, "/customer/name");
        event.raw = charge.clone();
        event
    }

    fn outcome_for_status(status: &str) -> Option<PaymentOutcome> {
        match status {
            "COMPLETED" => Some(PaymentOutcome::Approved),
            "ACTIVE" => Some(PaymentOutcome::Pending),
            "EXPIRED" => Some(PaymentOutcome::Expired),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl GatewayAdapter for OpenPixAdapter {
    fn name(&self) -> &'static str {
        "openpix"
    }

    fn parse_webhook(
        &self,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<WebhookParse, WebhookError> {
        if let Some(secret) = &self.webhook_secret {
            let signature = header_str(headers, "x-webhook-signature")
                .ok_or(WebhookError::InvalidSignature)?;
            if !verify_hmac_base64(secret, body, signature) {
                return Err(WebhookError::InvalidSignature);
            }
        }

        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::Unparseable(e.to_string()))?;

        let event_name = json_str(&payload, "/event").unwrap_or_default();
        let outcome = match event_name.as_str() {
            "OPENPIX:CHARGE_COMPLETED" => PaymentOutcome::Approved,
            "OPENPIX:CHARGE_CREATED" => PaymentOutcome::Pending,
            "OPENPIX:CHARGE_EXPIRED" => PaymentOutcome::Expired,
            // test pings and transaction events multiplexed through the same endpoint
            _ => return Ok(WebhookParse::Ignored("non-charge event")),
        };

        let charge = payload
            .get("charge")
            .cloned()
            .ok_or_else(|| WebhookError::Unparseable("missing charge".to_string()))?;

        let mut event = self.event_from_charge(&charge, outcome);
        // OpenPix carries no delivery id of its own; the event name plus the
        // end-to-end transaction id identifies one delivery
        event.provider_event_id =
            json_str(&charge, "/transactionID").map(|id| format!("{}:{}", event_name, id));
        Ok(WebhookParse::Event(event))
    }

    async fn poll_status(&self, provider_payment_id: &str) -> Result<PaymentEvent, PollError> {
        let url = format!("{}/api/v1/charge/{}", self.base_url, provider_payment_id);
        let resp = self
            .client
            .get(url)
            .header("Authorization", self.app_id.clone())
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

        let charge = payload.get("charge").cloned().unwrap_or(payload);
        let status = json_str(&charge, "/status").unwrap_or_default();
        let outcome = Self::outcome_for_status(&status)
            .ok_or_else(|| PollError::PollFailed(format!("unknown charge status {}", status)))?;

        Ok(self.event_from_charge(&charge, outcome))
    }
}
