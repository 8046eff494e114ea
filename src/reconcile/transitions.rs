use crate::domain::event::{PaymentEvent, PaymentOutcome};
use crate::domain::order::{Order, OrderStatus, PaymentMethod};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    PaymentApproved,
    PaymentFailed,
    ManualReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    pub role: Role,
    pub kind: NotifyKind,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcilePolicy {
    pub admin_alert_on_failure: bool,
}

#[derive(Debug)]
pub struct Reconciled {
    pub order: Option<Order>,
    pub effects: Vec<Effect>,
    pub changed: bool,
    pub synthesized: bool,
}

impl Reconciled {
    fn noop(order: Option<Order>) -> Self {
        Self {
            order,
            effects: Vec::new(),
            changed: false,
            synthesized: false,
        }
    }
}

pub fn apply_event(
    current: Option<Order>,
    event: &PaymentEvent,
    policy: &ReconcilePolicy,
    now: DateTime<Utc>,
) -> Reconciled {
    let mut order = match current {
        Some(order) => order,
        None => {
            return match event.outcome {
                PaymentOutcome::Approved => synthesize(event, now),
                _ => Reconciled::noop(None),
            };
        }
    };

    let mut changed = record_provider_ref(&mut order, event);

    if order.status.is_settled() {
        // already-terminal financial state; redeliveries and late polls are no-ops
        return Reconciled {
            order: Some(order),
            effects: Vec::new(),
            changed,
            synthesized: false,
        };
    }

    if order.status == OrderStatus::Cancelled {
        let effects = if event.outcome == PaymentOutcome::Approved {
            vec![Effect {
                role: Role::Admin,
                kind: NotifyKind::ManualReview,
            }]
        } else {
            Vec::new()
        };
        return Reconciled {
            order: Some(order),
            effects,
            changed,
            synthesized: false,
        };
    }

    let mut effects = Vec::new();
    match event.outcome {
        PaymentOutcome::Approved => {
            order.status = OrderStatus::Paid;
            order.paid_at = Some(now);
            if let Some(method) = event.method {
                order.payment_method = method;
            }
            changed = true;
            effects.push(Effect {
                role: Role::Admin,
                kind: NotifyKind::PaymentApproved,
            });
            if order.customer_email.is_some() {
                effects.push(Effect {
                    role: Role::Customer,
                    kind: NotifyKind::PaymentApproved,
                });
            }
        }
        PaymentOutcome::Pending => {
            if order.status == OrderStatus::Pending && event.method == Some(PaymentMethod::Pix) {
                order.status = OrderStatus::PendingPix;
                order.payment_method = PaymentMethod::Pix;
                changed = true;
            }
        }
        PaymentOutcome::Failed | PaymentOutcome::Expired => {
            order.status = OrderStatus::Cancelled;
            changed = true;
            if policy.admin_alert_on_failure {
                effects.push(Effect {
                    role: Role::Admin,
                    kind: NotifyKind::PaymentFailed,
                });
            }
        }
    }

    Reconciled {
        order: Some(order),
        effects,
        changed,
        synthesized: false,
    }
}

fn record_provider_ref(order: &mut Order, event: &PaymentEvent) -> bool {
    if let Some(reference) = &event.provider_payment_id {
        if order.provider_ref(&event.provider) != Some(reference.as_str()) {
            order
                .provider_refs
                .insert(event.provider.clone(), reference.clone());
            return true;
        }
    }
    false
}

fn synthesize(event: &PaymentEvent, now: DateTime<Utc>) -> Reconciled {
    let id = event
        .correlation_id
        .clone()
        .or_else(|| {
            event
                .provider_payment_id
                .as_ref()
                .map(|p| format!("ord_recovered_{}_{}", event.provider, p))
        })
        .unwrap_or_else(|| format!("ord_recovered_{}_{}", event.provider, uuid::Uuid::new_v4()));

    let mut provider_refs = HashMap::new();
    if let Some(reference) = &event.provider_payment_id {
        provider_refs.insert(event.provider.clone(), reference.clone());
    }

    let order = Order {
        id,
        status: OrderStatus::Paid,
        payment_method: event.method.unwrap_or(PaymentMethod::Unknown),
        amount_minor: event.amount_minor.unwrap_or(0),
        currency: "BRL".to_string(),
        plan: "unknown".to_string(),
        customer_name: event.customer_name.clone(),
        customer_email: event.customer_email.clone(),
        customer_phone: None,
        personalization: serde_json::Value::Null,
        lyrics: None,
        provider_refs,
        degraded: true,
        created_at: now,
        paid_at: Some(now),
    };

    let mut effects = vec![Effect {
        role: Role::Admin,
        kind: NotifyKind::PaymentApproved,
    }];
    if order.customer_email.is_some() {
        effects.push(Effect {
            role: Role::Customer,
            kind: NotifyKind::PaymentApproved,
        });
    }

    Reconciled {
        order: Some(order),
        effects,
        changed: true,
        synthesized: true,
    }
}
