use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{WebhookEvent, WebhookEventType};

/// Payment notification as delivered by the external provider. The payload
/// is stored verbatim on the event row so failed deliveries can be replayed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentWebhookPayload {
    pub event_id: String,
    pub event_type: WebhookEventType,
    pub order_number: String,
    pub amount: Decimal,
    pub payment_method: String,
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookReceipt {
    pub applied: bool,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RetryReport {
    pub retried: i64,
    pub total_failed: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SimulatePaymentRequest {
    pub order_number: String,
    pub event_type: WebhookEventType,
    pub amount: Option<Decimal>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookEventList {
    pub items: Vec<WebhookEvent>,
}
