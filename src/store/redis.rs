use crate::domain::order::Order;
use crate::store::{IdempotencyGuard, Mutator, OrderStore, StoreError};
use redis::AsyncCommands;
use std::time::Duration;

pub struct RedisOrderStore {
    pub client: redis::Client,
    pub ttl: Duration,
}

impl RedisOrderStore {
    pub fn new(client: redis::Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    fn order_key(id: &str) -> String {
        format!("order:{}", id)
    }

    fn ref_key(provider: &str, reference: &str) -> String {
        format!("order:ref:{}:{}", provider, reference)
    }

    fn lock_key(id: &str) -> String {
        format!("order:lock:{}", id)
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn write_order(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        order: &Order,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(order)?;
        let ttl = self.ttl.as_secs();
        let _: () = conn.set_ex(Self::order_key(&order.id), payload, ttl).await?;
        for (provider, reference) in &order.provider_refs {
            let _: () = conn
                .set_ex(Self::ref_key(provider, reference), order.id.clone(), ttl)
                .await?;
        }
        Ok(())
    }

    async fn acquire_lock(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        id: &str,
    ) -> Result<String, StoreError> {
        let token = uuid::Uuid::new_v4().to_string();
        // short spin with backoff; webhook vs poll races last milliseconds
        for _ in 0..50 {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(Self::lock_key(id))
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(5000)
                .query_async(conn)
                .await?;
            if acquired.is_some() {
                return Ok(token);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Err(StoreError::Unavailable(format!(
            "could not lock order {}",
            id
        )))
    }

    async fn release_lock(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        id: &str,
    ) -> Result<(), StoreError> {
        let _: () = conn.del(Self::lock_key(id)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderStore for RedisOrderStore {
    async fn put(&self, order: &Order) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        self.write_order(&mut conn, order).await
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn.get(Self::order_key(id)).await?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    async fn find_by_provider_ref(
        &self,
        provider: &str,
        reference: &str,
    ) -> Result<Option<Order>, StoreError> {
        let mut conn = self.conn().await?;
        let id: Option<String> = conn.get(Self::ref_key(provider, reference)).await?;
        match id {
            Some(id) => self.get(&id).await,
            None => Ok(None),
        }
    }

    async fn update(&self, id: &str, mutate: Mutator<'_>) -> Result<Order, StoreError> {
        let mut conn = self.conn().await?;
        self.acquire_lock(&mut conn, id).await?;

        let result = async {
            let payload: Option<String> = conn.get(Self::order_key(id)).await?;
            let mut order: Order = match payload {
                Some(p) => serde_json::from_str(&p)?,
                None => return Err(StoreError::NotFound),
            };
            mutate(&mut order);
            self.write_order(&mut conn, &order).await?;
            Ok(order)
        }
        .await;

        let _ = self.release_lock(&mut conn, id).await;
        result
    }

    async fn link_provider_ref(
        &self,
        id: &str,
        provider: &str,
        reference: &str,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(
                Self::ref_key(provider, reference),
                id.to_string(),
                self.ttl.as_secs(),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn.del(Self::order_key(id)).await?;
        Ok(())
    }
}

pub struct RedisGuard {
    pub client: redis::Client,
}

impl RedisGuard {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl IdempotencyGuard for RedisGuard {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let set: Option<String> = redis::cmd("SET")
            .arg(format!("guard:{}", key))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(set.is_some())
    }
}
