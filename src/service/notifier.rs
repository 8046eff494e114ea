use crate::domain::order::Order;
use crate::reconcile::transitions::{NotifyKind, Role};
use crate::store::{notify_key, IdempotencyGuard, StoreError};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, PartialEq, Eq)]
pub enum DispatchResult {
    Sent,
    AlreadySent,
    NoRecipient,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError>;
}

pub struct HttpMailer {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub client: reqwest::Client,
}

#[async_trait::async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "from": self.from,
                "to": message.to,
                "subject": message.subject,
                "text": message.body,
            }))
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::DeliveryFailed(format!(
                "HTTP {}",
                resp.status().as_u16()
            )))
        }
    }
}

pub struct NotificationDispatcher {
    pub guard: Arc<dyn IdempotencyGuard>,
    pub mailer: Arc<dyn Mailer>,
    pub admin_email: String,
    pub guard_ttl: Duration,
    pub send_timeout: Duration,
}

impl NotificationDispatcher {
    pub async fn dispatch(
        &self,
        order: &Order,
        role: Role,
        kind: NotifyKind,
    ) -> Result<DispatchResult, NotifyError> {
        let to = match role {
            Role::Admin => self.admin_email.clone(),
            Role::Customer => match &order.customer_email {
                Some(email) => email.clone(),
                None => return Ok(DispatchResult::NoRecipient),
            },
        };

        let won = self
            .guard
            .set_if_absent(&notify_key(&order.id, role.as_str()), self.guard_ttl)
            .await?;
        if !won {
            return Ok(DispatchResult::AlreadySent);
        }

        let message = compose(order, role, kind, &to);
        // the guard is not rolled back on failure: a transport that eventually
        // delivers asynchronously would otherwise produce duplicates on retry
        match tokio::time::timeout(self.send_timeout, self.mailer.send(&message)).await {
            Ok(Ok(())) => Ok(DispatchResult::Sent),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(NotifyError::DeliveryFailed("send timed out".to_string())),
        }
    }
}

fn compose(order: &Order, role: Role, kind: NotifyKind, to: &str) -> OutboundMessage {
    let amount = format!("R$ {},{:02}", order.amount_minor / 100, order.amount_minor % 100);
    match (role, kind) {
        (Role::Admin, NotifyKind::PaymentApproved) => {
            let marker = if order.degraded { " (incomplete data)" } else { "" };
            OutboundMessage {
                to: to.to_string(),
                subject: format!("New paid order {}{}", order.id, marker),
                body: format!(
                    "Order {} was paid: {} via {:?}, plan {}, customer {}{}",
                    order.id,
                    amount,
                    order.payment_method,
                    order.plan,
                    order.customer_name.as_deref().unwrap_or("unknown"),
                    if order.degraded {
                        "\n\nThis record was rebuilt from the provider payload; original order data was incomplete."
                    } else {
                        ""
                    },
                ),
            }
        }
        (Role::Admin, NotifyKind::PaymentFailed) => OutboundMessage {
            to: to.to_string(),
            subject: format!("Payment failed for order {}", order.id),
            body: format!("Order {} was cancelled after a failed or expired payment.", order.id),
        },
        (Role::Admin, NotifyKind::ManualReview) => OutboundMessage {
            to: to.to_string(),
            subject: format!("Manual review needed for order {}", order.id),
            body: format!(
                "Order {} received an approved payment but is already cancelled. \
                 Check the provider dashboard and reconcile manually.",
                order.id
            ),
        },
        (Role::Customer, _) => OutboundMessage {
            to: to.to_string(),
            subject: "Your song order is confirmed!".to_string(),
            body: format!(
                "Hi {}, we received your payment of {} for order {}. \
                 Production of your personalized song has started.",
                order.customer_name.as_deref().unwrap_or("there"),
                amount,
                order.id
            ),
        },
    }
}
