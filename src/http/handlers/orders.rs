use crate::domain::order::{
    CreateOrderRequest, CreateOrderResponse, ErrorEnvelope, ErrorPayload, Order, OrderStatus,
    StatusResponse,
};
use crate::service::order_service::CreateOrderError;
use crate::store::StoreError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> impl IntoResponse {
    match state.order_service.create(req).await {
        Ok(order) => (
            StatusCode::CREATED,
            Json(CreateOrderResponse {
                order_id: order.id,
                status: order.status,
                amount_minor: order.amount_minor,
                currency: order.currency,
            }),
        )
            .into_response(),
        Err(CreateOrderError::UnknownPlan(plan)) => {
            error_response(StatusCode::BAD_REQUEST, "UNKNOWN_PLAN", &format!("no such plan: {}", plan))
        }
        Err(CreateOrderError::MissingName) => {
            error_response(StatusCode::BAD_REQUEST, "MISSING_NAME", "customer name is required")
        }
        Err(CreateOrderError::Store(e)) => {
            warn!(error = %e, "order creation failed at store");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "try again shortly")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterCheckoutRequest {
    pub provider: String,
    pub payment_id: String,
}

// called by the wizard right after the provider hands back a session or
// charge id, so webhooks that only echo that id can find the order
pub async fn register_checkout(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(req): Json<RegisterCheckoutRequest>,
) -> impl IntoResponse {
    if state.adapter(&req.provider).is_none() {
        return error_response(StatusCode::BAD_REQUEST, "UNKNOWN_PROVIDER", "unknown provider");
    }

    match state
        .order_service
        .record_provider_ref(&order_id, &req.provider, &req.payment_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(StoreError::NotFound) => {
            error_response(StatusCode::NOT_FOUND, "ORDER_NOT_FOUND", "unknown order id")
        }
        Err(e) => {
            warn!(error = %e, "checkout registration failed at store");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "try again shortly")
        }
    }
}

pub async fn order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> impl IntoResponse {
    let order = match state.store.get(&order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, "ORDER_NOT_FOUND", "unknown order id");
        }
        Err(e) => {
            warn!(error = %e, "status read failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "try again shortly");
        }
    };

    let refreshed = refresh_if_pending(&state, order).await;
    status_response(&refreshed).into_response()
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub provider: String,
    pub payment_id: String,
}

pub async fn status_by_provider_ref(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> impl IntoResponse {
    match state
        .store
        .find_by_provider_ref(&query.provider, &query.payment_id)
        .await
    {
        Ok(Some(order)) => {
            let refreshed = refresh_if_pending(&state, order).await;
            return status_response(&refreshed).into_response();
        }
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, "status read failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "try again shortly");
        }
    }

    // no stored order: ask the provider directly, so a payment whose record
    // was TTL-evicted still converges through the reconciliation engine
    let adapter = match state.adapter(&query.provider) {
        Some(a) => a,
        None => {
            return error_response(StatusCode::NOT_FOUND, "UNKNOWN_PROVIDER", "unknown provider");
        }
    };

    match adapter.poll_status(&query.payment_id).await {
        Ok(event) => match state.reconciliation.apply(&event).await {
            Ok(applied) => match applied.order {
                Some(order) => status_response(&order).into_response(),
                None => error_response(StatusCode::NOT_FOUND, "ORDER_NOT_FOUND", "no order for payment id"),
            },
            Err(e) => {
                warn!(error = %e, "reconciliation of polled status failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "try again shortly")
            }
        },
        Err(e) => {
            warn!(provider = %query.provider, error = %e, "provider status poll failed");
            error_response(StatusCode::NOT_FOUND, "ORDER_NOT_FOUND", "no order for payment id")
        }
    }
}

async fn refresh_if_pending(state: &AppState, order: Order) -> Order {
    if order.status != OrderStatus::Pending && order.status != OrderStatus::PendingPix {
        return order;
    }

    for (provider, reference) in order.provider_refs.clone() {
        let adapter = match state.adapter(&provider) {
            Some(a) => a,
            None => continue,
        };
        match adapter.poll_status(&reference).await {
            Ok(event) => match state.reconciliation.apply(&event).await {
                Ok(applied) => return applied.order.unwrap_or(order),
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "reconciliation of polled status failed");
                    return order;
                }
            },
            Err(e) => {
                // PollFailed degrades to the stored status; the client retries
                // on its own 5s schedule
                warn!(order_id = %order.id, provider = %provider, error = %e, "status poll failed");
            }
        }
    }
    order
}

fn status_response(order: &Order) -> (StatusCode, Json<StatusResponse>) {
    (
        StatusCode::OK,
        Json(StatusResponse {
            order_id: order.id.clone(),
            status: order.status.clone(),
            approved: order.status.is_settled(),
        }),
    )
}

fn error_response(status: StatusCode, code: &str, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorEnvelope {
            error: ErrorPayload {
                code: code.to_string(),
                message: message.to_string(),
            },
        }),
    )
        .into_response()
}
