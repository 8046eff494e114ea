use crate::domain::order::{
    new_order_id, price_for_plan, CreateOrderRequest, Order, OrderStatus, PaymentMethod,
};
use crate::store::OrderStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct OrderService {
    pub store: Arc<dyn OrderStore>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateOrderError {
    #[error("unknown plan: {0}")]
    UnknownPlan(String),
    #[error("customer name is required")]
    MissingName,
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

impl OrderService {
    pub async fn create(&self, req: CreateOrderRequest) -> Result<Order, CreateOrderError> {
        if req.customer_name.trim().is_empty() {
            return Err(CreateOrderError::MissingName);
        }
        let amount_minor = price_for_plan(&req.plan)
            .ok_or_else(|| CreateOrderError::UnknownPlan(req.plan.clone()))?;

        let now = Utc::now();
        let order = Order {
            id: new_order_id(now),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Unknown,
            amount_minor,
            currency: "BRL".to_string(),
            plan: req.plan,
            customer_name: Some(req.customer_name),
            customer_email: req.customer_email,
            customer_phone: req.customer_phone,
            personalization: req.personalization,
            lyrics: req.lyrics,
            provider_refs: HashMap::new(),
            degraded: false,
            created_at: now,
            paid_at: None,
        };

        // persisted before any checkout redirect so every provider echo
        // (client_reference_id, reference_id, correlationID) resolves back here
        self.store.put(&order).await?;
        info!(order_id = %order.id, plan = %order.plan, amount = order.amount_minor, "order created");
        Ok(order)
    }

    pub async fn record_provider_ref(
        &self,
        order_id: &str,
        provider: &str,
        reference: &str,
    ) -> Result<(), crate::store::StoreError> {
        let provider_owned = provider.to_string();
        let reference_owned = reference.to_string();
        self.store
            .update(order_id, &move |order| {
                order
                    .provider_refs
                    .insert(provider_owned.clone(), reference_owned.clone());
            })
            .await?;
        self.store.link_provider_ref(order_id, provider, reference).await
    }
}
