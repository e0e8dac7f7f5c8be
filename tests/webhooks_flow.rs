mod common;

use axum_orders_api::{
    dto::{
        orders::{CreateOrderItemRequest, CreateOrderRequest},
        webhooks::{PaymentWebhookPayload, SimulatePaymentRequest},
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        orders::{ActiveModel as OrderActive, Entity as Orders},
        webhook_events::{Column as WebhookCol, Entity as WebhookEvents},
    },
    error::AppError,
    models::{OrderStatus, PaymentStatus, WebhookEventType},
    services::{order_service, webhook_service},
    state::AppState,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal literal")
}

fn payment_payload(
    order_number: &str,
    event_type: WebhookEventType,
    amount: Decimal,
) -> PaymentWebhookPayload {
    PaymentWebhookPayload {
        event_id: format!("evt_{}", Uuid::new_v4().simple()),
        event_type,
        order_number: order_number.to_string(),
        amount,
        payment_method: "card".to_string(),
        transaction_id: format!("txn_{}", Uuid::new_v4().simple()),
        timestamp: Utc::now(),
    }
}

async fn create_pending_order(
    state: &AppState,
    unit_price: Decimal,
    quantity: i32,
) -> anyhow::Result<(Uuid, String)> {
    let customer = common::create_customer(state, "Webhook Customer").await?;
    let product = common::create_product(state, "Payable", unit_price, quantity + 10).await?;

    let response = order_service::create_order(
        state,
        CreateOrderRequest {
            customer_id: customer.id,
            items: vec![CreateOrderItemRequest {
                product_id: product.id,
                quantity,
            }],
            payment_method: None,
            shipping_address: None,
            notes: None,
        },
    )
    .await?;
    let created = response.data.expect("order data");

    Ok((created.order.id, created.order.order_number))
}

#[tokio::test]
async fn success_webhook_applies_exactly_once() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let (order_id, order_number) = create_pending_order(&state, dec("10.00"), 2).await?;
    let payload = payment_payload(&order_number, WebhookEventType::PaymentSuccess, dec("20.00"));

    let first = webhook_service::process_payment_webhook(&state, payload.clone()).await?;
    assert!(first.data.expect("receipt").applied);

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert_eq!(order.status, OrderStatus::Confirmed.as_str());
    assert_eq!(order.payment_status, PaymentStatus::Paid.as_str());
    assert_eq!(order.payment_method.as_deref(), Some("card"));

    // Replaying the same event is a no-op.
    let second = webhook_service::process_payment_webhook(&state, payload.clone()).await?;
    assert!(!second.data.expect("receipt").applied);

    let transitions = AuditLogs::find()
        .filter(AuditCol::OrderId.eq(order_id))
        .filter(AuditCol::Action.eq("payment_status_change"))
        .count(&state.orm)
        .await?;
    assert_eq!(transitions, 1);

    let event = WebhookEvents::find()
        .filter(WebhookCol::EventId.eq(&payload.event_id))
        .one(&state.orm)
        .await?
        .expect("event row");
    assert_eq!(event.status, "processed");
    assert!(event.processed_at.is_some());

    Ok(())
}

#[tokio::test]
async fn amount_mismatch_is_rejected_and_recorded() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let (order_id, order_number) = create_pending_order(&state, dec("10.00"), 2).await?;
    let payload = payment_payload(&order_number, WebhookEventType::PaymentSuccess, dec("25.00"));

    let err = webhook_service::process_payment_webhook(&state, payload.clone())
        .await
        .expect_err("mismatched amount");
    assert!(matches!(err, AppError::AmountMismatch { .. }));

    // The order is untouched...
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert_eq!(order.status, OrderStatus::Pending.as_str());
    assert_eq!(order.payment_status, PaymentStatus::Pending.as_str());

    // ...but the attempt is durably recorded despite the rollback.
    let event = WebhookEvents::find()
        .filter(WebhookCol::EventId.eq(&payload.event_id))
        .one(&state.orm)
        .await?
        .expect("event row");
    assert_eq!(event.status, "failed");
    assert!(event.retry_count >= 1);

    Ok(())
}

#[tokio::test]
async fn amount_within_tolerance_applies() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let (order_id, order_number) = create_pending_order(&state, dec("10.00"), 2).await?;
    let payload = payment_payload(&order_number, WebhookEventType::PaymentSuccess, dec("20.01"));

    let receipt = webhook_service::process_payment_webhook(&state, payload).await?;
    assert!(receipt.data.expect("receipt").applied);

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert_eq!(order.payment_status, PaymentStatus::Paid.as_str());

    Ok(())
}

#[tokio::test]
async fn failed_payment_marks_order_failed() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let (order_id, order_number) = create_pending_order(&state, dec("10.00"), 1).await?;
    let payload = payment_payload(&order_number, WebhookEventType::PaymentFailed, dec("0.00"));

    let receipt = webhook_service::process_payment_webhook(&state, payload).await?;
    assert!(receipt.data.expect("receipt").applied);

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert_eq!(order.payment_status, PaymentStatus::Failed.as_str());
    // A failed payment does not advance the order lifecycle.
    assert_eq!(order.status, OrderStatus::Pending.as_str());

    Ok(())
}

#[tokio::test]
async fn retry_sweep_applies_stored_payload() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    // The sweep takes the ten oldest failed events; drop leftovers from
    // earlier runs so this test's event makes the batch. Events from tests
    // running right now are newer than the cutoff and stay untouched.
    sqlx::query(
        "DELETE FROM webhook_events WHERE status = 'failed' AND created_at < now() - INTERVAL '1 hour'",
    )
    .execute(&state.pool)
    .await?;

    let order_number = format!("ORD-RETRY-{}", Uuid::new_v4().simple());
    let payload = payment_payload(&order_number, WebhookEventType::PaymentSuccess, dec("15.00"));

    // First delivery arrives before the order exists and fails durably.
    let err = webhook_service::process_payment_webhook(&state, payload.clone())
        .await
        .expect_err("order does not exist yet");
    assert!(matches!(err, AppError::NotFound(_)));

    let event = WebhookEvents::find()
        .filter(WebhookCol::EventId.eq(&payload.event_id))
        .one(&state.orm)
        .await?
        .expect("event row");
    assert_eq!(event.status, "failed");

    // The order shows up afterwards.
    let customer = common::create_customer(&state, "Late Order Customer").await?;
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer.id),
        order_number: Set(order_number.clone()),
        status: Set(OrderStatus::Pending.to_string()),
        total_amount: Set(dec("15.00")),
        payment_status: Set(PaymentStatus::Pending.to_string()),
        payment_method: Set(None),
        shipping_address: Set(None),
        notes: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    webhook_service::retry_failed_webhooks(&state).await?;

    let order = Orders::find_by_id(order.id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert_eq!(order.payment_status, PaymentStatus::Paid.as_str());
    assert_eq!(order.status, OrderStatus::Confirmed.as_str());

    let event = WebhookEvents::find()
        .filter(WebhookCol::EventId.eq(&payload.event_id))
        .one(&state.orm)
        .await?
        .expect("event row");
    assert_eq!(event.status, "processed");

    Ok(())
}

#[tokio::test]
async fn simulated_webhook_flows_through_the_workflow() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let (order_id, order_number) = create_pending_order(&state, dec("5.00"), 4).await?;

    let receipt = webhook_service::simulate_payment_webhook(
        &state,
        SimulatePaymentRequest {
            order_number,
            event_type: WebhookEventType::PaymentSuccess,
            amount: Some(dec("20.00")),
            payment_method: None,
        },
    )
    .await?;
    assert!(receipt.data.expect("receipt").applied);

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert_eq!(order.payment_method.as_deref(), Some("simulated"));
    assert_eq!(order.payment_status, PaymentStatus::Paid.as_str());

    Ok(())
}
