mod common;

use axum_orders_api::{
    dto::orders::{
        BulkCreateOrderRequest, CancelOrderRequest, CreateOrderItemRequest, CreateOrderRequest,
        UpdateOrderStatusRequest,
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        inventory_transactions::{Column as InventoryCol, Entity as InventoryTransactions},
        orders::{Column as OrderCol, Entity as Orders},
        products::Entity as Products,
    },
    error::AppError,
    models::{OrderStatus, PaymentStatus},
    services::order_service,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal literal")
}

fn order_request(customer_id: Uuid, items: Vec<(Uuid, i32)>) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_id,
        items: items
            .into_iter()
            .map(|(product_id, quantity)| CreateOrderItemRequest {
                product_id,
                quantity,
            })
            .collect(),
        payment_method: None,
        shipping_address: Some("12 Test Street".to_string()),
        notes: None,
    }
}

#[tokio::test]
async fn create_order_totals_stock_and_ledger() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::create_customer(&state, "Order Flow Customer").await?;
    let product = common::create_product(&state, "Widget", dec("10.00"), 5).await?;

    let response =
        order_service::create_order(&state, order_request(customer.id, vec![(product.id, 2)]))
            .await?;
    let created = response.data.expect("order data");

    assert_eq!(created.order.total_amount, dec("20.00"));
    assert_eq!(created.order.status, OrderStatus::Pending);
    assert_eq!(created.order.payment_status, PaymentStatus::Pending);
    assert!(created.order.order_number.starts_with("ORD-"));
    assert_eq!(created.items.len(), 1);
    assert_eq!(created.items[0].subtotal, dec("20.00"));
    assert_eq!(created.customer_name, customer.name);

    let product_after = Products::find_by_id(product.id)
        .one(&state.orm)
        .await?
        .expect("product row");
    assert_eq!(product_after.stock_quantity, 3);

    let ledger = InventoryTransactions::find()
        .filter(InventoryCol::ProductId.eq(product.id))
        .all(&state.orm)
        .await?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].quantity_change, -2);
    assert_eq!(ledger[0].stock_after, 3);
    assert_eq!(ledger[0].transaction_type, "sale");
    assert_eq!(ledger[0].order_id, Some(created.order.id));

    let audits = AuditLogs::find()
        .filter(AuditCol::OrderId.eq(created.order.id))
        .all(&state.orm)
        .await?;
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "order_created");

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_leaves_no_partial_state() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::create_customer(&state, "Stock Floor Customer").await?;
    let cheap = common::create_product(&state, "Plentiful", dec("5.00"), 10).await?;
    let scarce = common::create_product(&state, "Scarce", dec("10.00"), 1).await?;

    let err = order_service::create_order(
        &state,
        order_request(customer.id, vec![(cheap.id, 3), (scarce.id, 2)]),
    )
    .await
    .expect_err("order should fail");
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    // Nothing persisted: both stocks unchanged, no ledger rows, no orders.
    for (product, expected) in [(&cheap, 10), (&scarce, 1)] {
        let after = Products::find_by_id(product.id)
            .one(&state.orm)
            .await?
            .expect("product row");
        assert_eq!(after.stock_quantity, expected);

        let ledger_rows = InventoryTransactions::find()
            .filter(InventoryCol::ProductId.eq(product.id))
            .count(&state.orm)
            .await?;
        assert_eq!(ledger_rows, 0);
    }

    let orders = Orders::find()
        .filter(OrderCol::CustomerId.eq(customer.id))
        .count(&state.orm)
        .await?;
    assert_eq!(orders, 0);

    Ok(())
}

#[tokio::test]
async fn unknown_customer_or_product_is_not_found() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let product = common::create_product(&state, "Orphan", dec("1.00"), 5).await?;

    let err = order_service::create_order(
        &state,
        order_request(Uuid::new_v4(), vec![(product.id, 1)]),
    )
    .await
    .expect_err("unknown customer");
    assert!(matches!(err, AppError::NotFound(_)));

    let customer = common::create_customer(&state, "Known Customer").await?;
    let err = order_service::create_order(
        &state,
        order_request(customer.id, vec![(Uuid::new_v4(), 1)]),
    )
    .await
    .expect_err("unknown product");
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn multi_item_order_prices_each_line() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::create_customer(&state, "Multi Item Customer").await?;
    let first = common::create_product(&state, "First", dec("10.00"), 5).await?;
    let second = common::create_product(&state, "Second", dec("2.50"), 8).await?;

    let response = order_service::create_order(
        &state,
        order_request(customer.id, vec![(first.id, 2), (second.id, 4)]),
    )
    .await?;
    let created = response.data.expect("order data");

    assert_eq!(created.order.total_amount, dec("30.00"));
    assert_eq!(created.items.len(), 2);

    for product in [&first, &second] {
        let ledger = InventoryTransactions::find()
            .filter(InventoryCol::ProductId.eq(product.id))
            .all(&state.orm)
            .await?;
        assert_eq!(ledger.len(), 1);

        let after = Products::find_by_id(product.id)
            .one(&state.orm)
            .await?
            .expect("product row");
        assert_eq!(ledger[0].stock_after, after.stock_quantity);
    }

    Ok(())
}

#[tokio::test]
async fn bulk_orders_report_partial_failures() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::create_customer(&state, "Bulk Customer").await?;
    let product = common::create_product(&state, "Bulk Widget", dec("4.00"), 3).await?;

    let response = order_service::create_bulk_orders(
        &state,
        BulkCreateOrderRequest {
            orders: vec![
                order_request(customer.id, vec![(product.id, 2)]),
                order_request(customer.id, vec![(product.id, 5)]),
            ],
        },
    )
    .await?;
    let result = response.data.expect("bulk result");

    assert_eq!(result.created, 1);
    assert_eq!(result.orders.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 1);
    assert!(result.errors[0].error.contains("Insufficient stock"));

    // Only the first order's decrement is visible.
    let after = Products::find_by_id(product.id)
        .one(&state.orm)
        .await?
        .expect("product row");
    assert_eq!(after.stock_quantity, 1);

    Ok(())
}

#[tokio::test]
async fn cancel_order_restores_stock() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::create_customer(&state, "Cancelling Customer").await?;
    let product = common::create_product(&state, "Returnable", dec("7.50"), 6).await?;

    let response =
        order_service::create_order(&state, order_request(customer.id, vec![(product.id, 4)]))
            .await?;
    let created = response.data.expect("order data");

    let cancelled = order_service::cancel_order(
        &state,
        created.order.id,
        CancelOrderRequest {
            reason: Some("customer changed their mind".to_string()),
        },
    )
    .await?;
    assert_eq!(
        cancelled.data.expect("order data").order.status,
        OrderStatus::Cancelled
    );

    let after = Products::find_by_id(product.id)
        .one(&state.orm)
        .await?
        .expect("product row");
    assert_eq!(after.stock_quantity, 6);

    let returns = InventoryTransactions::find()
        .filter(InventoryCol::ProductId.eq(product.id))
        .filter(InventoryCol::TransactionType.eq("return"))
        .all(&state.orm)
        .await?;
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].quantity_change, 4);
    assert_eq!(returns[0].stock_after, 6);

    let audit_count = AuditLogs::find()
        .filter(AuditCol::OrderId.eq(created.order.id))
        .filter(AuditCol::Action.eq("order_cancelled"))
        .count(&state.orm)
        .await?;
    assert_eq!(audit_count, 1);

    let err = order_service::cancel_order(
        &state,
        created.order.id,
        CancelOrderRequest { reason: None },
    )
    .await
    .expect_err("double cancel");
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn status_update_writes_audit_row() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::create_customer(&state, "Status Customer").await?;
    let product = common::create_product(&state, "Shippable", dec("3.00"), 5).await?;

    let response =
        order_service::create_order(&state, order_request(customer.id, vec![(product.id, 1)]))
            .await?;
    let created = response.data.expect("order data");

    let updated = order_service::update_order_status(
        &state,
        created.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Processing,
        },
    )
    .await?;
    assert_eq!(
        updated.data.expect("order").status,
        OrderStatus::Processing
    );

    let audits = AuditLogs::find()
        .filter(AuditCol::OrderId.eq(created.order.id))
        .filter(AuditCol::Action.eq("order_status_change"))
        .all(&state.orm)
        .await?;
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].old_value.as_deref(), Some("pending"));
    assert_eq!(audits[0].new_value.as_deref(), Some("processing"));

    // Cancellation goes through the cancel endpoint, not a status write.
    let err = order_service::update_order_status(
        &state,
        created.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Cancelled,
        },
    )
    .await
    .expect_err("cancel via status update");
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}
