use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PendingPix,
    Paid,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Pix,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub amount_minor: i64,
    pub currency: String,
    pub plan: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub personalization: serde_json::Value,
    pub lyrics: Option<String>,
    pub provider_refs: HashMap<String, String>,
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn provider_ref(&self, provider: &str) -> Option<&str> {
        self.provider_refs.get(provider).map(String::as_str)
    }
}

pub fn new_order_id(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::random::<u32>() & 0x00ff_ffff;
    format!("ord_{}_{:06x}", now.timestamp_millis(), suffix)
}

pub fn price_for_plan(plan: &str) -> Option<i64> {
    match plan {
        "basico" => Some(4990),
        "premium" => Some(9990),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub plan: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub personalization: serde_json::Value,
    pub lyrics: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub status: OrderStatus,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub order_id: String,
    pub status: OrderStatus,
    pub approved: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_ids_are_unique_and_prefixed() {
        let now = Utc::now();
        let a = new_order_id(now);
        let b = new_order_id(now);
        assert!(a.starts_with("ord_"));
        assert_ne!(a, b);
    }

    #[test]
    fn price_table_rejects_unknown_plan() {
        assert_eq!(price_for_plan("basico"), Some(4990));
        assert_eq!(price_for_plan("gratis"), None);
    }
}
