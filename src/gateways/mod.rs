use crate::domain::event::PaymentEvent;
use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub mod mercadopago;
pub mod openpix;
pub mod pagseguro;
pub mod stripe;

#[derive(Debug)]
pub enum WebhookParse {
    Event(PaymentEvent),
    Ignored(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("unparseable payload: {0}")]
    Unparseable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("status poll failed: {0}")]
    PollFailed(String),
}

#[async_trait::async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn parse_webhook(&self, body: &[u8], headers: &HeaderMap)
        -> Result<WebhookParse, WebhookError>;

    async fn poll_status(&self, provider_payment_id: &str) -> Result<PaymentEvent, PollError>;
}

pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub fn hmac_sha256(secret: &str, payload: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn verify_hmac_hex(secret: &str, payload: &[u8], expected_hex: &str) -> bool {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected: Vec<u8> = match decode_hex(expected_hex) {
        Some(b) => b,
        None => return false,
    };
    mac.verify_slice(&expected).is_ok()
}

pub fn verify_hmac_base64(secret: &str, payload: &[u8], expected_b64: &str) -> bool {
    use base64::Engine;
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected = match base64::engine::general_purpose::STANDARD.decode(expected_b64) {
        Ok(b) => b,
        Err(_) => return false,
    };
    mac.verify_slice(&expected).is_ok()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

pub fn json_str(v: &serde_json::Value, pointer: &str) -> Option<String> {
    v.pointer(pointer).and_then(|x| x.as_str()).map(str::to_string)
}

pub fn json_i64(v: &serde_json::Value, pointer: &str) -> Option<i64> {
    v.pointer(pointer).and_then(|x| x.as_i64())
}
