use crate::domain::event::PaymentEvent;
use crate::domain::order::Order;
use crate::reconcile::transitions::{apply_event, Effect, ReconcilePolicy};
use crate::service::notifier::{DispatchResult, NotificationDispatcher};
use crate::store::{event_key, IdempotencyGuard, OrderStore, StoreError};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

pub struct ReconciliationService {
    pub store: Arc<dyn OrderStore>,
    pub guard: Arc<dyn IdempotencyGuard>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub policy: ReconcilePolicy,
    pub event_ttl: Duration,
}

#[derive(Debug)]
pub struct Applied {
    pub order: Option<Order>,
    pub duplicate: bool,
}

impl ReconciliationService {
    pub async fn apply(&self, event: &PaymentEvent) -> anyhow::Result<Applied> {
        let current = self.resolve(event).await?;

        let (order, effects) = match current {
            None => self.apply_unmatched(event).await?,
            Some(existing) => self.apply_matched(&existing.id, event).await?,
        };

        let order = match order {
            Some(order) => order,
            None => {
                return Ok(Applied {
                    order: None,
                    duplicate: false,
                })
            }
        };

        // the delivery-dedup key is claimed only after the transition is
        // durably persisted: a store failure leaves it unset, so the
        // provider's retry of the same event is processed as a first
        // delivery instead of being discarded. The transition itself is
        // idempotent, and sends are still guarded per (order, role).
        let mut duplicate = false;
        if let Some(event_id) = &event.provider_event_id {
            let fresh = self
                .guard
                .set_if_absent(&event_key(&event.provider, event_id), self.event_ttl)
                .await?;
            if !fresh {
                info!(provider = %event.provider, event_id = %event_id, "duplicate delivery, skipping effects");
                duplicate = true;
            }
        }

        if !duplicate {
            for effect in &effects {
                self.run_effect(&order, *effect).await;
            }
        }

        Ok(Applied {
            order: Some(order),
            duplicate,
        })
    }

    async fn resolve(&self, event: &PaymentEvent) -> anyhow::Result<Option<Order>> {
        if let Some(correlation) = &event.correlation_id {
            if let Some(order) = self.store.get(correlation).await? {
                return Ok(Some(order));
            }
            if let Some(order) = self
                .store
                .find_by_provider_ref(&event.provider, correlation)
                .await?
            {
                return Ok(Some(order));
            }
        }
        if let Some(payment_id) = &event.provider_payment_id {
            if let Some(order) = self
                .store
                .find_by_provider_ref(&event.provider, payment_id)
                .await?
            {
                return Ok(Some(order));
            }
        }
        Ok(None)
    }

    async fn apply_unmatched(
        &self,
        event: &PaymentEvent,
    ) -> anyhow::Result<(Option<Order>, Vec<Effect>)> {
        let result = apply_event(None, event, &self.policy, Utc::now());
        match result.order {
            Some(order) => {
                warn!(
                    provider = %event.provider,
                    order_id = %order.id,
                    "no stored order for approved payment, synthesizing degraded record"
                );
                self.store.put(&order).await?;
                Ok((Some(order), result.effects))
            }
            None => {
                info!(provider = %event.provider, outcome = ?event.outcome, "event for unknown order ignored");
                Ok((None, Vec::new()))
            }
        }
    }

    async fn apply_matched(
        &self,
        order_id: &str,
        event: &PaymentEvent,
    ) -> anyhow::Result<(Option<Order>, Vec<Effect>)> {
        let now = Utc::now();
        let captured: Mutex<Vec<Effect>> = Mutex::new(Vec::new());

        // the transition re-runs against the freshly read record inside the
        // store's per-key critical section: a pending poll result racing an
        // approved webhook can never overwrite a stored paid status
        let updated = self
            .store
            .update(order_id, &|stored| {
                let result = apply_event(Some(stored.clone()), event, &self.policy, now);
                if let Some(next) = result.order {
                    *stored = next;
                }
                *captured.lock().unwrap_or_else(|e| e.into_inner()) = result.effects;
            })
            .await;

        match updated {
            Ok(order) => {
                let effects = captured.into_inner().unwrap_or_else(|e| e.into_inner());
                info!(order_id = %order.id, status = ?order.status, "reconciled payment event");
                Ok((Some(order), effects))
            }
            // evicted between resolve and update; fall back to the degraded path
            Err(StoreError::NotFound) => self.apply_unmatched(event).await,
            Err(e) => Err(e.into()),
        }
    }

    async fn run_effect(&self, order: &Order, effect: Effect) {
        match self.dispatcher.dispatch(order, effect.role, effect.kind).await {
            Ok(DispatchResult::Sent) => {
                info!(order_id = %order.id, role = effect.role.as_str(), "notification sent");
            }
            Ok(DispatchResult::AlreadySent) => {
                info!(order_id = %order.id, role = effect.role.as_str(), "notification already sent");
            }
            Ok(DispatchResult::NoRecipient) => {}
            Err(e) => {
                // surfaced for the operator; never retried here and never
                // propagated into the webhook response
                warn!(order_id = %order.id, role = effect.role.as_str(), error = %e, "notification delivery failed");
            }
        }
    }
}
