use crate::domain::order::PaymentMethod;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Approved,
    Pending,
    Failed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub provider: String,
    pub provider_event_id: Option<String>,
    pub correlation_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub outcome: PaymentOutcome,
    pub amount_minor: Option<i64>,
    pub method: Option<PaymentMethod>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub raw: serde_json::Value,
}

impl PaymentEvent {
    pub fn new(provider: &str, outcome: PaymentOutcome) -> Self {
        Self {
            provider: provider.to_string(),
            provider_event_id: None,
            correlation_id: None,
            provider_payment_id: None,
            outcome,
            amount_minor: None,
            method: None,
            customer_email: None,
            customer_name: None,
            raw: serde_json::Value::Null,
        }
    }
}
