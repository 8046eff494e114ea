use std::sync::Arc;

pub mod config;
pub mod domain {
    pub mod event;
    pub mod order;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod lyrics;
        pub mod ops;
        pub mod orders;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod rate_limit;
    }
}
pub mod reconcile {
    pub mod transitions;
}
pub mod service {
    pub mod lyrics;
    pub mod notifier;
    pub mod order_service;
    pub mod reconciliation;
}
pub mod store;

use crate::gateways::GatewayAdapter;
use crate::service::lyrics::LyricsClient;
use crate::service::order_service::OrderService;
use crate::service::reconciliation::ReconciliationService;
use crate::store::OrderStore;

#[derive(Clone)]
pub struct AppState {
    pub order_service: Arc<OrderService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub store: Arc<dyn OrderStore>,
    pub adapters: Arc<Vec<Arc<dyn GatewayAdapter>>>,
    pub lyrics: Arc<LyricsClient>,
    pub redis_client: redis::Client,
}

impl AppState {
    pub fn adapter(&self, name: &str) -> Option<Arc<dyn GatewayAdapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }
}
