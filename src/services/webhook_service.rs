use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::webhooks::{
        PaymentWebhookPayload, RetryReport, SimulatePaymentRequest, WebhookEventList,
        WebhookReceipt,
    },
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        webhook_events::{
            ActiveModel as WebhookEventActive, Column as WebhookCol, Entity as WebhookEvents,
            Model as WebhookEventModel,
        },
    },
    error::{AppError, AppResult},
    models::{OrderStatus, PaymentStatus, WebhookEvent, WebhookEventType, WebhookStatus},
    response::{ApiResponse, Meta},
    routes::params::WebhookEventQuery,
    state::AppState,
};

const MAX_WEBHOOK_RETRIES: i32 = 3;
const RETRY_BATCH_SIZE: u64 = 10;

pub async fn process_payment_webhook(
    state: &AppState,
    payload: PaymentWebhookPayload,
) -> AppResult<ApiResponse<WebhookReceipt>> {
    let receipt = process_webhook_attempt(state, &payload).await?;
    let message = receipt.message.clone();
    Ok(ApiResponse::success(message, receipt, Some(Meta::empty())))
}

async fn process_webhook_attempt(
    state: &AppState,
    payload: &PaymentWebhookPayload,
) -> AppResult<WebhookReceipt> {
    let outcome = match tokio::time::timeout(state.txn_deadline, apply_webhook(state, payload)).await
    {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout),
    };

    match outcome {
        Ok(receipt) => Ok(receipt),
        Err(err) => {
            let payload_json =
                serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
            record_failure(state, &payload.event_id, payload.event_type.as_str(), &payload_json)
                .await;
            Err(err)
        }
    }
}

async fn apply_webhook(
    state: &AppState,
    payload: &PaymentWebhookPayload,
) -> AppResult<WebhookReceipt> {
    let txn = state.orm.begin().await?;

    // The event row is the idempotency key: lock it (or create it) before
    // touching the order, so concurrent deliveries of the same event_id
    // serialize here.
    let existing = WebhookEvents::find()
        .filter(WebhookCol::EventId.eq(&payload.event_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    if let Some(event) = &existing {
        if event.status == WebhookStatus::Processed.as_str() {
            return Ok(WebhookReceipt {
                applied: false,
                message: "Webhook already processed".to_string(),
            });
        }
    }

    if existing.is_none() {
        WebhookEventActive {
            id: Set(Uuid::new_v4()),
            event_id: Set(payload.event_id.clone()),
            event_type: Set(payload.event_type.to_string()),
            payload: Set(serde_json::to_value(payload).map_err(anyhow::Error::from)?),
            status: Set(WebhookStatus::Pending.to_string()),
            retry_count: Set(0),
            processed_at: Set(None),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    let order = Orders::find()
        .filter(OrderCol::OrderNumber.eq(&payload.order_number))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {}", payload.order_number)))?;

    let old_payment_status = order.payment_status.clone();
    let order_id = order.id;

    match payload.event_type {
        WebhookEventType::PaymentSuccess => {
            let difference = (order.total_amount - payload.amount).abs();
            if difference > Decimal::new(1, 2) {
                return Err(AppError::AmountMismatch {
                    expected: order.total_amount,
                    received: payload.amount,
                });
            }

            let advance = order.status == OrderStatus::Pending.as_str();
            let mut active: OrderActive = order.into();
            active.payment_status = Set(PaymentStatus::Paid.to_string());
            active.payment_method = Set(Some(payload.payment_method.clone()));
            if advance {
                active.status = Set(OrderStatus::Confirmed.to_string());
            }
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?;

            log_audit(
                &txn,
                order_id,
                "payment_status_change",
                Some(old_payment_status),
                Some(PaymentStatus::Paid.to_string()),
                &format!("webhook-{}", payload.event_id),
            )
            .await?;
        }
        WebhookEventType::PaymentFailed => {
            let mut active: OrderActive = order.into();
            active.payment_status = Set(PaymentStatus::Failed.to_string());
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?;

            log_audit(
                &txn,
                order_id,
                "payment_status_change",
                Some(old_payment_status),
                Some(PaymentStatus::Failed.to_string()),
                &format!("webhook-{}", payload.event_id),
            )
            .await?;
        }
    }

    WebhookEvents::update_many()
        .col_expr(
            WebhookCol::Status,
            Expr::value(WebhookStatus::Processed.as_str()),
        )
        .col_expr(WebhookCol::ProcessedAt, Expr::value(Some(Utc::now())))
        .filter(WebhookCol::EventId.eq(&payload.event_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(WebhookReceipt {
        applied: true,
        message: format!(
            "Payment webhook for order {} processed",
            payload.order_number
        ),
    })
}

/// Failure bookkeeping runs on the raw pool so it survives the rolled-back
/// business transaction. The upsert also covers first-sight events whose row
/// insert was rolled back along with it; a plain UPDATE would lose those
/// attempts entirely.
async fn record_failure(
    state: &AppState,
    event_id: &str,
    event_type: &str,
    payload: &serde_json::Value,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO webhook_events (id, event_id, event_type, payload, status, retry_count)
        VALUES ($1, $2, $3, $4, 'failed', 1)
        ON CONFLICT (event_id) DO UPDATE
        SET status = 'failed', retry_count = webhook_events.retry_count + 1
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(event_type)
    .bind(payload)
    .execute(&state.pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(error = %err, event_id, "failed to record webhook failure");
    }
}

/// Re-drive failed events from their stored payloads, oldest first. Each
/// retry is independent; one failure does not block the rest of the sweep.
pub async fn retry_failed_webhooks(state: &AppState) -> AppResult<ApiResponse<RetryReport>> {
    let failed = WebhookEvents::find()
        .filter(
            Condition::all()
                .add(WebhookCol::Status.eq(WebhookStatus::Failed.as_str()))
                .add(WebhookCol::RetryCount.lt(MAX_WEBHOOK_RETRIES)),
        )
        .order_by_asc(WebhookCol::CreatedAt)
        .limit(RETRY_BATCH_SIZE)
        .all(&state.orm)
        .await?;

    let total_failed = failed.len() as i64;
    let mut retried: i64 = 0;

    for event in failed {
        let payload: PaymentWebhookPayload = match serde_json::from_value(event.payload.clone()) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    event_id = %event.event_id,
                    "stored webhook payload does not deserialize"
                );
                record_failure(state, &event.event_id, &event.event_type, &event.payload).await;
                continue;
            }
        };

        match process_webhook_attempt(state, &payload).await {
            Ok(_) => retried += 1,
            Err(err) => {
                tracing::warn!(error = %err, event_id = %event.event_id, "webhook retry failed");
            }
        }
    }

    let report = RetryReport {
        retried,
        total_failed,
    };
    let message = format!(
        "Retried {} of {} failed webhooks",
        report.retried, report.total_failed
    );
    Ok(ApiResponse::success(message, report, Some(Meta::empty())))
}

pub async fn get_webhook_event(
    state: &AppState,
    event_id: &str,
) -> AppResult<ApiResponse<WebhookEvent>> {
    let event = WebhookEvents::find()
        .filter(WebhookCol::EventId.eq(event_id))
        .one(&state.orm)
        .await?;
    let event = match event {
        Some(e) => e,
        None => return Err(AppError::NotFound(format!("Webhook event {event_id}"))),
    };

    Ok(ApiResponse::success(
        "Webhook event",
        webhook_event_from_entity(event)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_webhook_events(
    state: &AppState,
    query: WebhookEventQuery,
) -> AppResult<ApiResponse<WebhookEventList>> {
    let (page, limit, offset) = query.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(WebhookCol::Status.eq(status.as_str()));
    }

    let finder = WebhookEvents::find()
        .filter(condition)
        .order_by_desc(WebhookCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(webhook_event_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Webhook events",
        WebhookEventList { items },
        Some(meta),
    ))
}

/// Testing hook: fabricate a provider payload and feed the normal workflow.
pub async fn simulate_payment_webhook(
    state: &AppState,
    payload: SimulatePaymentRequest,
) -> AppResult<ApiResponse<WebhookReceipt>> {
    let payload = PaymentWebhookPayload {
        event_id: format!("evt_{}", Uuid::new_v4().simple()),
        event_type: payload.event_type,
        order_number: payload.order_number,
        amount: payload.amount.unwrap_or(Decimal::ZERO),
        payment_method: payload
            .payment_method
            .unwrap_or_else(|| "simulated".to_string()),
        transaction_id: format!("txn_{}", Uuid::new_v4().simple()),
        timestamp: Utc::now(),
    };

    process_payment_webhook(state, payload).await
}

fn webhook_event_from_entity(model: WebhookEventModel) -> AppResult<WebhookEvent> {
    Ok(WebhookEvent {
        id: model.id,
        event_id: model.event_id,
        event_type: model.event_type.parse().map_err(anyhow::Error::msg)?,
        payload: model.payload,
        status: model.status.parse().map_err(anyhow::Error::msg)?,
        retry_count: model.retry_count,
        processed_at: model.processed_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    })
}
