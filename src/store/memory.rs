use crate::domain::order::Order;
use crate::store::{IdempotencyGuard, Mutator, OrderStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    order: Order,
    expires_at: Instant,
}

pub struct MemoryOrderStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
    refs: Mutex<HashMap<String, String>>,
}

impl MemoryOrderStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            refs: Mutex::new(HashMap::new()),
        }
    }

    fn ref_key(provider: &str, reference: &str) -> String {
        format!("{}:{}", provider, reference)
    }

    fn live_order(map: &mut HashMap<String, Entry>, id: &str) -> Option<Order> {
        match map.get(id) {
            Some(e) if e.expires_at > Instant::now() => Some(e.order.clone()),
            Some(_) => {
                map.remove(id);
                None
            }
            None => None,
        }
    }

    pub fn expire_now(&self, id: &str) {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(id);
    }
}

#[async_trait::async_trait]
impl OrderStore for MemoryOrderStore {
    async fn put(&self, order: &Order) -> Result<(), StoreError> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(
            order.id.clone(),
            Entry {
                order: order.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        drop(map);

        let mut refs = self.refs.lock().unwrap_or_else(|e| e.into_inner());
        for (provider, reference) in &order.provider_refs {
            refs.insert(Self::ref_key(provider, reference), order.id.clone());
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Self::live_order(&mut map, id))
    }

    async fn find_by_provider_ref(
        &self,
        provider: &str,
        reference: &str,
    ) -> Result<Option<Order>, StoreError> {
        let id = {
            let refs = self.refs.lock().unwrap_or_else(|e| e.into_inner());
            refs.get(&Self::ref_key(provider, reference)).cloned()
        };
        match id {
            Some(id) => self.get(&id).await,
            None => Ok(None),
        }
    }

    async fn update(&self, id: &str, mutate: Mutator<'_>) -> Result<Order, StoreError> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut order = Self::live_order(&mut map, id).ok_or(StoreError::NotFound)?;
        mutate(&mut order);
        map.insert(
            id.to_string(),
            Entry {
                order: order.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        drop(map);

        let mut refs = self.refs.lock().unwrap_or_else(|e| e.into_inner());
        for (provider, reference) in &order.provider_refs {
            refs.insert(Self::ref_key(provider, reference), order.id.clone());
        }
        Ok(order)
    }

    async fn link_provider_ref(
        &self,
        id: &str,
        provider: &str,
        reference: &str,
    ) -> Result<(), StoreError> {
        let mut refs = self.refs.lock().unwrap_or_else(|e| e.into_inner());
        refs.insert(Self::ref_key(provider, reference), id.to_string());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(id);
        Ok(())
    }
}

pub struct MemoryGuard {
    marks: Mutex<HashMap<String, Instant>>,
}

impl MemoryGuard {
    pub fn new() -> Self {
        Self {
            marks: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IdempotencyGuard for MemoryGuard {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut marks = self.marks.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        // keys that were never re-set would otherwise pile up for the life
        // of the process
        marks.retain(|_, expiry| *expiry > now);
        if marks.contains_key(key) {
            return Ok(false);
        }
        marks.insert(key.to_string(), now + ttl);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_sweeps_expired_marks_on_write() {
        let guard = MemoryGuard::new();
        guard.set_if_absent("evt:a", Duration::from_millis(20)).await.unwrap();
        guard.set_if_absent("evt:b", Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        guard.set_if_absent("evt:c", Duration::from_secs(60)).await.unwrap();

        let marks = guard.marks.lock().unwrap();
        assert_eq!(marks.len(), 1);
        assert!(marks.contains_key("evt:c"));
    }
}
