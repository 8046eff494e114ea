use crate::domain::order::Order;
use std::time::Duration;

pub mod memory;
pub mod redis;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("order not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<::redis::RedisError> for StoreError {
    fn from(e: ::redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

pub type Mutator<'a> = &'a (dyn Fn(&mut Order) + Send + Sync);

#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    async fn put(&self, order: &Order) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError>;

    async fn find_by_provider_ref(
        &self,
        provider: &str,
        reference: &str,
    ) -> Result<Option<Order>, StoreError>;

    async fn update(&self, id: &str, mutate: Mutator<'_>) -> Result<Order, StoreError>;

    async fn link_provider_ref(
        &self,
        id: &str,
        provider: &str,
        reference: &str,
    ) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait IdempotencyGuard: Send + Sync {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;
}

pub fn notify_key(order_id: &str, role: &str) -> String {
    format!("notify:{}:{}", order_id, role)
}

pub fn event_key(provider: &str, event_id: &str) -> String {
    format!("evt:{}:{}", provider, event_id)
}
