use axum::http::HeaderMap;
use song_orders::domain::event::PaymentOutcome;
use song_orders::domain::order::PaymentMethod;
use song_orders::gateways::mercadopago::MercadoPagoAdapter;
use song_orders::gateways::openpix::OpenPixAdapter;
use song_orders::gateways::pagseguro::PagSeguroAdapter;
use song_orders::gateways::stripe::StripeAdapter;
use song_orders::gateways::{
    hex_encode, hmac_sha256, GatewayAdapter, WebhookError, WebhookParse,
};

fn stripe() -> StripeAdapter {
    StripeAdapter {
        base_url: "https://api.stripe.test".to_string(),
        api_key: "sk_test".to_string(),
        webhook_secret: "whsec_test".to_string(),
        timeout_ms: 1000,
        client: reqwest::Client::new(),
    }
}

fn stripe_headers(body: &[u8]) -> HeaderMap {
    let mut signed = b"1700000000.".to_vec();
    signed.extend_from_slice(body);
    let sig = hex_encode(&hmac_sha256("whsec_test", &signed));
    let mut headers = HeaderMap::new();
    headers.insert(
        "stripe-signature",
        format!("t=1700000000,v1={}", sig).parse().unwrap(),
    );
    headers
}

#[test]
fn stripe_completed_session_becomes_approved_event() {
    let body = serde_json::json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_123",
            "client_reference_id": "ord_abc",
            "amount_total": 4990,
            "customer_details": {"email": "maria@example.com", "name": "Maria"}
        }}
    })
    .to_string()
    .into_bytes();

    let parsed = stripe().parse_webhook(&body, &stripe_headers(&body)).unwrap();
    let event = match parsed {
        WebhookParse::Event(e) => e,
        other => panic!("expected event, got {:?}", other),
    };
    assert_eq!(event.outcome, PaymentOutcome::Approved);
    assert_eq!(event.provider_event_id.as_deref(), Some("evt_1"));
    assert_eq!(event.correlation_id.as_deref(), Some("ord_abc"));
    assert_eq!(event.provider_payment_id.as_deref(), Some("cs_123"));
    assert_eq!(event.amount_minor, Some(4990));
    assert_eq!(event.customer_email.as_deref(), Some("maria@example.com"));
    assert_eq!(event.method, Some(PaymentMethod::Card));
}

#[test]
fn stripe_unrelated_event_type_is_ignored_not_an_error() {
    let body = serde_json::json!({
        "id": "evt_2",
        "type": "invoice.created",
        "data": {"object": {}}
    })
    .to_string()
    .into_bytes();

    match stripe().parse_webhook(&body, &stripe_headers(&body)).unwrap() {
        WebhookParse::Ignored(_) => {}
        other => panic!("expected ignored, got {:?}", other),
    }
}

#[test]
fn stripe_bad_signature_is_rejected() {
    let body = b"{\"type\":\"checkout.session.completed\"}".to_vec();
    let mut headers = HeaderMap::new();
    headers.insert("stripe-signature", "t=1,v1=deadbeef".parse().unwrap());

    match stripe().parse_webhook(&body, &headers) {
        Err(WebhookError::InvalidSignature) => {}
        other => panic!("expected invalid signature, got {:?}", other),
    }
}

#[test]
fn stripe_garbage_body_is_unparseable() {
    let body = b"not json at all".to_vec();
    match stripe().parse_webhook(&body, &stripe_headers(&body)) {
        Err(WebhookError::Unparseable(_)) => {}
        other => panic!("expected unparseable, got {:?}", other),
    }
}

fn pagseguro() -> PagSeguroAdapter {
    PagSeguroAdapter {
        base_url: "https://api.pagseguro.test".to_string(),
        token: "tok".to_string(),
        authenticity_token: None,
        timeout_ms: 1000,
        client: reqwest::Client::new(),
    }
}

#[test]
fn pagseguro_paid_charge_becomes_approved_event() {
    let body = serde_json::json!({
        "id": "ORDE_1",
        "reference_id": "ord_abc",
        "customer": {"name": "Maria", "email": "maria@example.com"},
        "charges": [{
            "id": "CHAR_1",
            "status": "PAID",
            "amount": {"value": 4990},
            "payment_method": {"type": "CREDIT_CARD"}
        }]
    })
    .to_string()
    .into_bytes();

    let event = match pagseguro().parse_webhook(&body, &HeaderMap::new()).unwrap() {
        WebhookParse::Event(e) => e,
        other => panic!("expected event, got {:?}", other),
    };
    assert_eq!(event.outcome, PaymentOutcome::Approved);
    assert_eq!(event.correlation_id.as_deref(), Some("ord_abc"));
    assert_eq!(event.provider_payment_id.as_deref(), Some("ORDE_1"));
    assert_eq!(event.amount_minor, Some(4990));
    assert_eq!(event.method, Some(PaymentMethod::Card));
    assert!(event.provider_event_id.is_some());
}

#[test]
fn pagseguro_pix_qr_creation_is_pending() {
    let body = serde_json::json!({
        "id": "ORDE_2",
        "reference_id": "ord_pix",
        "qr_codes": [{"id": "QRCO_1"}]
    })
    .to_string()
    .into_bytes();

    let event = match pagseguro().parse_webhook(&body, &HeaderMap::new()).unwrap() {
        WebhookParse::Event(e) => e,
        other => panic!("expected event, got {:?}", other),
    };
    assert_eq!(event.outcome, PaymentOutcome::Pending);
    assert_eq!(event.method, Some(PaymentMethod::Pix));
}

#[test]
fn pagseguro_authenticity_token_is_enforced_when_configured() {
    let adapter = PagSeguroAdapter {
        authenticity_token: Some("expected".to_string()),
        ..pagseguro()
    };
    let body = b"{\"reference_id\":\"x\",\"charges\":[]}".to_vec();

    match adapter.parse_webhook(&body, &HeaderMap::new()) {
        Err(WebhookError::InvalidSignature) => {}
        other => panic!("expected invalid signature, got {:?}", other),
    }
}

fn openpix() -> OpenPixAdapter {
    OpenPixAdapter {
        base_url: "https://api.openpix.test".to_string(),
        app_id: "app".to_string(),
        webhook_secret: None,
        timeout_ms: 1000,
        client: reqwest::Client::new(),
    }
}

#[test]
fn openpix_completed_charge_becomes_approved_event() {
    let body = serde_json::json!({
        "event": "OPENPIX:CHARGE_COMPLETED",
        "charge": {
            "correlationID": "ord_abc",
            "transactionID": "tx_1",
            "status": "COMPLETED",
            "value": 4990,
            "customer": {"name": "Maria", "email": "maria@example.com"}
        }
    })
    .to_string()
    .into_bytes();

    let event = match openpix().parse_webhook(&body, &HeaderMap::new()).unwrap() {
        WebhookParse::Event(e) => e,
        other => panic!("expected event, got {:?}", other),
    };
    assert_eq!(event.outcome, PaymentOutcome::Approved);
    assert_eq!(event.correlation_id.as_deref(), Some("ord_abc"));
    assert_eq!(event.method, Some(PaymentMethod::Pix));
    assert_eq!(
        event.provider_event_id.as_deref(),
        Some("OPENPIX:CHARGE_COMPLETED:tx_1")
    );
}

#[test]
fn openpix_charge_without_transaction_id_carries_no_dedup_key() {
    let body = serde_json::json!({
        "event": "OPENPIX:CHARGE_CREATED",
        "charge": {
            "correlationID": "ord_abc",
            "status": "ACTIVE",
            "value": 4990
        }
    })
    .to_string()
    .into_bytes();

    let event = match openpix().parse_webhook(&body, &HeaderMap::new()).unwrap() {
        WebhookParse::Event(e) => e,
        other => panic!("expected event, got {:?}", other),
    };
    assert_eq!(event.outcome, PaymentOutcome::Pending);
    assert_eq!(event.provider_event_id, None);
}

#[test]
fn openpix_test_ping_is_ignored() {
    let body = serde_json::json!({"event": "teste_webhook"}).to_string().into_bytes();
    match openpix().parse_webhook(&body, &HeaderMap::new()).unwrap() {
        WebhookParse::Ignored(_) => {}
        other => panic!("expected ignored, got {:?}", other),
    }
}

fn mercadopago() -> MercadoPagoAdapter {
    MercadoPagoAdapter {
        base_url: "https://api.mercadopago.test".to_string(),
        access_token: "token".to_string(),
        webhook_secret: None,
        timeout_ms: 1000,
        client: reqwest::Client::new(),
    }
}

#[test]
fn mercadopago_full_resource_becomes_approved_event_with_minor_units() {
    let body = serde_json::json!({
        "id": 777,
        "type": "payment",
        "data": {
            "id": 123456,
            "status": "approved",
            "external_reference": "ord_abc",
            "transaction_amount": 49.90,
            "payment_method_id": "pix",
            "payer": {"email": "maria@example.com", "first_name": "Maria"}
        }
    })
    .to_string()
    .into_bytes();

    let event = match mercadopago().parse_webhook(&body, &HeaderMap::new()).unwrap() {
        WebhookParse::Event(e) => e,
        other => panic!("expected event, got {:?}", other),
    };
    assert_eq!(event.outcome, PaymentOutcome::Approved);
    assert_eq!(event.correlation_id.as_deref(), Some("ord_abc"));
    assert_eq!(event.provider_payment_id.as_deref(), Some("123456"));
    assert_eq!(event.amount_minor, Some(4990));
    assert_eq!(event.method, Some(PaymentMethod::Pix));
}

#[test]
fn mercadopago_thin_ping_is_ignored_for_the_poll_path() {
    let body = serde_json::json!({
        "type": "payment",
        "data": {"id": 123456}
    })
    .to_string()
    .into_bytes();

    match mercadopago().parse_webhook(&body, &HeaderMap::new()).unwrap() {
        WebhookParse::Ignored(_) => {}
        other => panic!("expected ignored, got {:?}", other),
    }
}

#[test]
fn mercadopago_other_topics_are_ignored() {
    let body = serde_json::json!({
        "type": "plan",
        "data": {"id": 1}
    })
    .to_string()
    .into_bytes();

    match mercadopago().parse_webhook(&body, &HeaderMap::new()).unwrap() {
        WebhookParse::Ignored(_) => {}
        other => panic!("expected ignored, got {:?}", other),
    }
}
