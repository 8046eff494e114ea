use chrono::Utc;
use song_orders::domain::order::{Order, OrderStatus, PaymentMethod};
use song_orders::store::memory::{MemoryGuard, MemoryOrderStore};
use song_orders::store::{IdempotencyGuard, OrderStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn order(id: &str) -> Order {
    Order {
        id: id.to_string(),
        status: OrderStatus::Pending,
        payment_method: PaymentMethod::Unknown,
        amount_minor: 4990,
        currency: "BRL".to_string(),
        plan: "basico".to_string(),
        customer_name: Some("Maria".to_string()),
        customer_email: None,
        customer_phone: None,
        personalization: serde_json::Value::Null,
        lyrics: None,
        provider_refs: HashMap::new(),
        degraded: false,
        created_at: Utc::now(),
        paid_at: None,
    }
}

#[tokio::test]
async fn put_get_round_trip_and_absence() {
    let store = MemoryOrderStore::new(Duration::from_secs(60));
    store.put(&order("ord_1")).await.unwrap();

    assert!(store.get("ord_1").await.unwrap().is_some());
    assert!(store.get("ord_2").await.unwrap().is_none());

    store.delete("ord_1").await.unwrap();
    assert!(store.get("ord_1").await.unwrap().is_none());
}

#[tokio::test]
async fn expired_records_silently_disappear() {
    let store = MemoryOrderStore::new(Duration::from_millis(30));
    store.put(&order("ord_ttl")).await.unwrap();
    assert!(store.get("ord_ttl").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(store.get("ord_ttl").await.unwrap().is_none());

    let err = store.update("ord_ttl", &|_| {}).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
async fn provider_ref_lookup_resolves_to_the_order() {
    let store = MemoryOrderStore::new(Duration::from_secs(60));
    let mut o = order("ord_ref");
    o.provider_refs.insert("stripe".to_string(), "cs_9".to_string());
    store.put(&o).await.unwrap();

    let found = store.find_by_provider_ref("stripe", "cs_9").await.unwrap().unwrap();
    assert_eq!(found.id, "ord_ref");
    assert!(store.find_by_provider_ref("stripe", "cs_other").await.unwrap().is_none());
    assert!(store.find_by_provider_ref("openpix", "cs_9").await.unwrap().is_none());
}

#[tokio::test]
async fn refs_added_through_update_become_searchable() {
    let store = MemoryOrderStore::new(Duration::from_secs(60));
    store.put(&order("ord_up")).await.unwrap();

    store
        .update("ord_up", &|o| {
            o.provider_refs.insert("mercadopago".to_string(), "mp_7".to_string());
        })
        .await
        .unwrap();

    let found = store
        .find_by_provider_ref("mercadopago", "mp_7")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "ord_up");
}

#[tokio::test]
async fn concurrent_updates_lose_no_increments() {
    let store = Arc::new(MemoryOrderStore::new(Duration::from_secs(60)));
    store.put(&order("ord_cc")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .update("ord_cc", &move |o| {
                    o.provider_refs
                        .insert(format!("provider_{}", i), "x".to_string());
                    o.amount_minor += 1;
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.get("ord_cc").await.unwrap().unwrap();
    assert_eq!(stored.amount_minor, 4990 + 50);
    assert_eq!(stored.provider_refs.len(), 50);
}

#[tokio::test]
async fn guard_set_if_absent_wins_once_until_expiry() {
    let guard = MemoryGuard::new();

    assert!(guard.set_if_absent("notify:ord_1:admin", Duration::from_millis(40)).await.unwrap());
    assert!(!guard.set_if_absent("notify:ord_1:admin", Duration::from_millis(40)).await.unwrap());
    assert!(guard.set_if_absent("notify:ord_1:customer", Duration::from_millis(40)).await.unwrap());

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(guard.set_if_absent("notify:ord_1:admin", Duration::from_millis(40)).await.unwrap());
}
