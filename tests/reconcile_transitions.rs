use chrono::Utc;
use song_orders::domain::event::{PaymentEvent, PaymentOutcome};
use song_orders::domain::order::{Order, OrderStatus, PaymentMethod};
use song_orders::reconcile::transitions::{apply_event, NotifyKind, ReconcilePolicy, Role};
use std::collections::HashMap;

fn pending_order(id: &str) -> Order {
    Order {
        id: id.to_string(),
        status: OrderStatus::Pending,
        payment_method: PaymentMethod::Unknown,
        amount_minor: 4990,
        currency: "BRL".to_string(),
        plan: "basico".to_string(),
        customer_name: Some("Maria".to_string()),
        customer_email: Some("maria@example.com".to_string()),
        customer_phone: None,
        personalization: serde_json::Value::Null,
        lyrics: None,
        provider_refs: HashMap::new(),
        degraded: false,
        created_at: Utc::now(),
        paid_at: None,
    }
}

fn event(outcome: PaymentOutcome) -> PaymentEvent {
    let mut e = PaymentEvent::new("stripe", outcome);
    e.correlation_id = Some("ORD-1".to_string());
    e.method = Some(PaymentMethod::Card);
    e
}

#[test]
fn approved_moves_pending_to_paid_with_both_notifications() {
    let result = apply_event(
        Some(pending_order("ORD-1")),
        &event(PaymentOutcome::Approved),
        &ReconcilePolicy::default(),
        Utc::now(),
    );

    let order = result.order.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert!(order.paid_at.is_some());
    assert_eq!(order.payment_method, PaymentMethod::Card);
    assert!(result.changed);
    assert_eq!(result.effects.len(), 2);
    assert!(result.effects.iter().any(|e| e.role == Role::Admin));
    assert!(result.effects.iter().any(|e| e.role == Role::Customer));
}

#[test]
fn customer_without_email_gets_no_customer_effect() {
    let mut order = pending_order("ORD-1");
    order.customer_email = None;

    let result = apply_event(
        Some(order),
        &event(PaymentOutcome::Approved),
        &ReconcilePolicy::default(),
        Utc::now(),
    );

    assert_eq!(result.effects.len(), 1);
    assert_eq!(result.effects[0].role, Role::Admin);
}

#[test]
fn pix_acknowledgement_enters_waiting_substate_silently() {
    let mut e = event(PaymentOutcome::Pending);
    e.method = Some(PaymentMethod::Pix);

    let result = apply_event(
        Some(pending_order("ORD-1")),
        &e,
        &ReconcilePolicy::default(),
        Utc::now(),
    );

    let order = result.order.unwrap();
    assert_eq!(order.status, OrderStatus::PendingPix);
    assert_eq!(order.payment_method, PaymentMethod::Pix);
    assert!(result.effects.is_empty());
}

#[test]
fn card_pending_does_not_change_state() {
    let result = apply_event(
        Some(pending_order("ORD-1")),
        &event(PaymentOutcome::Pending),
        &ReconcilePolicy::default(),
        Utc::now(),
    );
    assert_eq!(result.order.unwrap().status, OrderStatus::Pending);
}

#[test]
fn failed_and_expired_cancel_from_either_pending_state() {
    for start in [OrderStatus::Pending, OrderStatus::PendingPix] {
        for outcome in [PaymentOutcome::Failed, PaymentOutcome::Expired] {
            let mut order = pending_order("ORD-1");
            order.status = start.clone();
            let result =
                apply_event(Some(order), &event(outcome), &ReconcilePolicy::default(), Utc::now());
            assert_eq!(result.order.unwrap().status, OrderStatus::Cancelled);
            assert!(result.effects.is_empty());
        }
    }
}

#[test]
fn failure_alert_is_admin_only_and_policy_gated() {
    let policy = ReconcilePolicy {
        admin_alert_on_failure: true,
    };
    let result = apply_event(
        Some(pending_order("ORD-1")),
        &event(PaymentOutcome::Failed),
        &policy,
        Utc::now(),
    );
    assert_eq!(result.effects.len(), 1);
    assert_eq!(result.effects[0].role, Role::Admin);
    assert_eq!(result.effects[0].kind, NotifyKind::PaymentFailed);
}

#[test]
fn paid_never_regresses() {
    let mut order = pending_order("ORD-1");
    order.status = OrderStatus::Paid;
    let paid_at = Some(Utc::now());
    order.paid_at = paid_at;

    for outcome in [
        PaymentOutcome::Pending,
        PaymentOutcome::Failed,
        PaymentOutcome::Expired,
        PaymentOutcome::Approved,
    ] {
        let result = apply_event(
            Some(order.clone()),
            &event(outcome),
            &ReconcilePolicy::default(),
            Utc::now(),
        );
        let next = result.order.unwrap();
        assert_eq!(next.status, OrderStatus::Paid);
        assert_eq!(next.paid_at, paid_at);
        assert!(result.effects.is_empty());
    }
}

#[test]
fn cancelled_stays_terminal_but_flags_late_approval_for_review() {
    let mut order = pending_order("ORD-1");
    order.status = OrderStatus::Cancelled;

    let result = apply_event(
        Some(order),
        &event(PaymentOutcome::Approved),
        &ReconcilePolicy::default(),
        Utc::now(),
    );

    assert_eq!(result.order.unwrap().status, OrderStatus::Cancelled);
    assert_eq!(result.effects.len(), 1);
    assert_eq!(result.effects[0].kind, NotifyKind::ManualReview);
}

#[test]
fn unknown_order_with_approval_synthesizes_degraded_record() {
    let mut e = PaymentEvent::new("openpix", PaymentOutcome::Approved);
    e.correlation_id = Some("ord_gone".to_string());
    e.provider_payment_id = Some("tx_99".to_string());
    e.amount_minor = Some(4990);
    e.customer_email = Some("late@example.com".to_string());
    e.method = Some(PaymentMethod::Pix);

    let result = apply_event(None, &e, &ReconcilePolicy::default(), Utc::now());

    assert!(result.synthesized);
    let order = result.order.unwrap();
    assert_eq!(order.id, "ord_gone");
    assert_eq!(order.status, OrderStatus::Paid);
    assert!(order.degraded);
    assert_eq!(order.amount_minor, 4990);
    assert_eq!(order.provider_ref("openpix"), Some("tx_99"));
    assert_eq!(result.effects.len(), 2);
}

#[test]
fn unknown_order_without_email_alerts_admin_only() {
    let mut e = PaymentEvent::new("openpix", PaymentOutcome::Approved);
    e.provider_payment_id = Some("tx_42".to_string());

    let result = apply_event(None, &e, &ReconcilePolicy::default(), Utc::now());

    let order = result.order.unwrap();
    assert!(order.id.starts_with("ord_recovered_openpix_"));
    assert_eq!(result.effects.len(), 1);
    assert_eq!(result.effects[0].role, Role::Admin);
}

#[test]
fn unknown_order_with_non_approval_is_a_noop() {
    for outcome in [
        PaymentOutcome::Pending,
        PaymentOutcome::Failed,
        PaymentOutcome::Expired,
    ] {
        let e = PaymentEvent::new("stripe", outcome);
        let result = apply_event(None, &e, &ReconcilePolicy::default(), Utc::now());
        assert!(result.order.is_none());
        assert!(result.effects.is_empty());
    }
}

#[test]
fn provider_payment_id_is_recorded_on_the_order() {
    let mut e = event(PaymentOutcome::Pending);
    e.provider_payment_id = Some("cs_test_1".to_string());

    let result = apply_event(
        Some(pending_order("ORD-1")),
        &e,
        &ReconcilePolicy::default(),
        Utc::now(),
    );

    assert!(result.changed);
    assert_eq!(result.order.unwrap().provider_ref("stripe"), Some("cs_test_1"));
}
