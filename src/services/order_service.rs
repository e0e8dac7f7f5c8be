use std::collections::HashMap;

use chrono::{Days, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        BulkCreateOrderRequest, BulkCreateResult, BulkOrderError, CancelOrderRequest,
        CreateOrderItemRequest, CreateOrderRequest, OrderList, OrderWithDetails,
        UpdateOrderStatusRequest,
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs, Model as AuditLogModel},
        customers::{Column as CustomerCol, Entity as Customers},
        inventory_transactions::ActiveModel as InventoryTransactionActive,
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{Column as ProductCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{AuditLog, Order, OrderItem, OrderStatus, PaymentStatus, TransactionType},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, OrderSortBy, SortOrder},
    state::AppState,
};

const ORDER_NUMBER_ATTEMPTS: usize = 3;

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    let order = create_order_impl(state, payload).await?;
    Ok(ApiResponse::success("Order created", order, Some(Meta::empty())))
}

/// Apply each order independently; one failure never aborts the rest.
pub async fn create_bulk_orders(
    state: &AppState,
    payload: BulkCreateOrderRequest,
) -> AppResult<ApiResponse<BulkCreateResult>> {
    let mut result = BulkCreateResult {
        created: 0,
        orders: Vec::new(),
        errors: Vec::new(),
    };

    for (index, order) in payload.orders.into_iter().enumerate() {
        match create_order_impl(state, order).await {
            Ok(order) => {
                result.orders.push(order);
                result.created += 1;
            }
            Err(err) => result.errors.push(BulkOrderError {
                index,
                error: err.to_string(),
            }),
        }
    }

    let message = format!("{} orders created", result.created);
    Ok(ApiResponse::success(message, result, Some(Meta::empty())))
}

async fn create_order_impl(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<OrderWithDetails> {
    validate_order_request(&payload)?;
    tokio::time::timeout(state.txn_deadline, create_order_txn(state, payload))
        .await
        .map_err(|_| AppError::Timeout)?
}

fn validate_order_request(payload: &CreateOrderRequest) -> AppResult<()> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must contain at least one item".into(),
        ));
    }
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "Invalid quantity {} for product {}",
                item.quantity, item.product_id
            )));
        }
    }
    Ok(())
}

struct PricedLine {
    product: ProductModel,
    quantity: i32,
    subtotal: Decimal,
}

async fn create_order_txn(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<OrderWithDetails> {
    let txn = state.orm.begin().await?;

    let customer = Customers::find_by_id(payload.customer_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {}", payload.customer_id)))?;

    // Lock products in ascending id order so concurrent multi-item orders
    // touching overlapping products cannot deadlock.
    let mut items: Vec<CreateOrderItemRequest> = payload.items.clone();
    items.sort_by_key(|item| item.product_id);

    let mut reserved: HashMap<Uuid, i32> = HashMap::new();
    let mut lines: Vec<PricedLine> = Vec::with_capacity(items.len());
    let mut total_amount = Decimal::ZERO;

    for item in &items {
        let product = Products::find_by_id(item.product_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", item.product_id)))?;

        let already_reserved = reserved.get(&product.id).copied().unwrap_or(0);
        let available = product.stock_quantity - already_reserved;
        if available < item.quantity {
            return Err(AppError::InsufficientStock {
                product: product.name,
                available,
            });
        }
        reserved.insert(product.id, already_reserved + item.quantity);

        let subtotal = product.price * Decimal::from(item.quantity);
        total_amount += subtotal;
        lines.push(PricedLine {
            product,
            quantity: item.quantity,
            subtotal,
        });
    }

    let order_number = generate_unique_order_number(&txn).await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(payload.customer_id),
        order_number: Set(order_number),
        status: Set(OrderStatus::Pending.to_string()),
        total_amount: Set(total_amount),
        payment_status: Set(PaymentStatus::Pending.to_string()),
        payment_method: Set(payload.payment_method),
        shipping_address: Set(payload.shipping_address),
        notes: Set(payload.notes),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut stock_now: HashMap<Uuid, i32> = lines
        .iter()
        .map(|line| (line.product.id, line.product.stock_quantity))
        .collect();
    let mut order_items: Vec<OrderItem> = Vec::with_capacity(lines.len());

    for line in &lines {
        let stock_after = stock_now[&line.product.id] - line.quantity;
        stock_now.insert(line.product.id, stock_after);

        Products::update_many()
            .col_expr(ProductCol::StockQuantity, Expr::value(stock_after))
            .col_expr(ProductCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(ProductCol::Id.eq(line.product.id))
            .exec(&txn)
            .await?;

        InventoryTransactionActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(line.product.id),
            order_id: Set(Some(order.id)),
            transaction_type: Set(TransactionType::Sale.to_string()),
            quantity_change: Set(-line.quantity),
            stock_after: Set(stock_after),
            notes: Set(Some("Sold via order creation".to_string())),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product.id),
            quantity: Set(line.quantity),
            unit_price: Set(line.product.price),
            subtotal: Set(line.subtotal),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        order_items.push(order_item_from_entity(
            item,
            &line.product.name,
            &line.product.sku,
        ));
    }

    log_audit(
        &txn,
        order.id,
        "order_created",
        None,
        Some(
            serde_json::json!({ "status": "pending", "items": order_items.len() }).to_string(),
        ),
        "system",
    )
    .await?;

    txn.commit().await?;

    Ok(OrderWithDetails {
        order: order_from_entity(order)?,
        customer_name: customer.name,
        customer_email: customer.email,
        items: order_items,
        audit_logs: None,
    })
}

async fn generate_unique_order_number(txn: &DatabaseTransaction) -> AppResult<String> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = build_order_number(Uuid::new_v4());
        let taken = Orders::find()
            .filter(OrderCol::OrderNumber.eq(candidate.clone()))
            .count(txn)
            .await?
            > 0;
        if !taken {
            return Ok(candidate);
        }
    }
    Err(AppError::Conflict(
        "Could not allocate a unique order number".into(),
    ))
}

fn build_order_number(seed: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = seed.to_string();
    let short = &suffix[..8];
    format!("ORD-{date}-{short}")
}

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(payment_status) = query.payment_status {
        condition = condition.add(OrderCol::PaymentStatus.eq(payment_status.as_str()));
    }
    if let Some(customer_id) = query.customer_id {
        condition = condition.add(OrderCol::CustomerId.eq(customer_id));
    }
    if let Some(from) = query.date_from {
        condition = condition.add(OrderCol::CreatedAt.gte(from.and_time(NaiveTime::MIN).and_utc()));
    }
    if let Some(to) = query.date_to {
        let next = to
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::BadRequest("date_to out of range".into()))?;
        condition = condition.add(OrderCol::CreatedAt.lt(next.and_time(NaiveTime::MIN).and_utc()));
    }
    if let Some(min) = query.min_amount {
        condition = condition.add(OrderCol::TotalAmount.gte(min));
    }
    if let Some(max) = query.max_amount {
        condition = condition.add(OrderCol::TotalAmount.lte(max));
    }
    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Orders, OrderCol::OrderNumber)).ilike(pattern.clone()))
                .add(Expr::col((Customers, CustomerCol::Name)).ilike(pattern.clone()))
                .add(Expr::col((Customers, CustomerCol::Email)).ilike(pattern)),
        );
    }

    let sort_by = query.sort_by.unwrap_or(OrderSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        OrderSortBy::CreatedAt => OrderCol::CreatedAt,
        OrderSortBy::TotalAmount => OrderCol::TotalAmount,
        OrderSortBy::OrderNumber => OrderCol::OrderNumber,
    };

    let mut finder = Orders::find().find_also_related(Customers).filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let mut orders = Vec::with_capacity(rows.len());
    for (order, customer) in rows {
        let customer = customer.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("order {} has no customer row", order.id))
        })?;
        let items = load_order_items(&state.orm, order.id).await?;
        orders.push(OrderWithDetails {
            order: order_from_entity(order)?,
            customer_name: customer.name,
            customer_email: customer.email,
            items,
            audit_logs: None,
        });
    }

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderWithDetails>> {
    let row = Orders::find_by_id(id)
        .find_also_related(Customers)
        .one(&state.orm)
        .await?;
    let (order, customer) = match row {
        Some(r) => r,
        None => return Err(AppError::NotFound(format!("Order {id}"))),
    };
    let customer = customer.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("order {} has no customer row", order.id))
    })?;

    let items = load_order_items(&state.orm, order.id).await?;
    let audit_logs = load_audit_logs(&state.orm, order.id).await?;

    let data = OrderWithDetails {
        order: order_from_entity(order)?,
        customer_name: customer.name,
        customer_email: customer.email,
        items,
        audit_logs: Some(audit_logs),
    };
    Ok(ApiResponse::success("Order", data, Some(Meta::empty())))
}

pub async fn get_order_by_number(
    state: &AppState,
    order_number: &str,
) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find()
        .filter(OrderCol::OrderNumber.eq(order_number))
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound(format!("Order {order_number}"))),
    };

    Ok(ApiResponse::success(
        "Order",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.status == OrderStatus::Cancelled {
        return Err(AppError::BadRequest(
            "Use the cancel endpoint to cancel an order".into(),
        ));
    }

    let order = tokio::time::timeout(state.txn_deadline, async {
        let txn = state.orm.begin().await?;

        let order = Orders::find_by_id(id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;

        let old_status: OrderStatus = order.status.parse().map_err(anyhow::Error::msg)?;
        if old_status == payload.status {
            return Ok(order);
        }
        if old_status == OrderStatus::Cancelled {
            return Err(AppError::Conflict("Order is cancelled".into()));
        }

        let mut active: OrderActive = order.into();
        active.status = Set(payload.status.to_string());
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&txn).await?;

        log_audit(
            &txn,
            order.id,
            "order_status_change",
            Some(old_status.to_string()),
            Some(payload.status.to_string()),
            "system",
        )
        .await?;

        txn.commit().await?;
        Ok(order)
    })
    .await
    .map_err(|_| AppError::Timeout)??;

    Ok(ApiResponse::success(
        "Order status updated",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    id: Uuid,
    payload: CancelOrderRequest,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    let order = tokio::time::timeout(state.txn_deadline, cancel_order_txn(state, id, payload.reason))
        .await
        .map_err(|_| AppError::Timeout)??;

    Ok(ApiResponse::success(
        "Order cancelled",
        order,
        Some(Meta::empty()),
    ))
}

async fn cancel_order_txn(
    state: &AppState,
    id: Uuid,
    reason: Option<String>,
) -> AppResult<OrderWithDetails> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;
    let customer = Customers::find_by_id(order.customer_id)
        .one(&txn)
        .await?
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("order {} has no customer row", order.id))
        })?;

    let old_status: OrderStatus = order.status.parse().map_err(anyhow::Error::msg)?;
    match old_status {
        OrderStatus::Cancelled => {
            return Err(AppError::Conflict("Order already cancelled".into()));
        }
        OrderStatus::Shipped | OrderStatus::Delivered => {
            return Err(AppError::BadRequest(format!(
                "Cannot cancel order in status {old_status}"
            )));
        }
        _ => {}
    }

    let mut item_models = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?;
    // Same canonical lock order as creation.
    item_models.sort_by_key(|item| item.product_id);

    let mut items = Vec::with_capacity(item_models.len());
    for item in item_models {
        let product = Products::find_by_id(item.product_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", item.product_id)))?;
        let stock_after = product.stock_quantity + item.quantity;

        Products::update_many()
            .col_expr(ProductCol::StockQuantity, Expr::value(stock_after))
            .col_expr(ProductCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(ProductCol::Id.eq(product.id))
            .exec(&txn)
            .await?;

        InventoryTransactionActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            order_id: Set(Some(order.id)),
            transaction_type: Set(TransactionType::Return.to_string()),
            quantity_change: Set(item.quantity),
            stock_after: Set(stock_after),
            notes: Set(Some("Restocked from cancelled order".to_string())),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        items.push(order_item_from_entity(item, &product.name, &product.sku));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    log_audit(
        &txn,
        order.id,
        "order_cancelled",
        Some(old_status.to_string()),
        Some(serde_json::json!({ "status": "cancelled", "reason": reason }).to_string()),
        "system",
    )
    .await?;

    txn.commit().await?;

    Ok(OrderWithDetails {
        order: order_from_entity(order)?,
        customer_name: customer.name,
        customer_email: customer.email,
        items,
        audit_logs: None,
    })
}

async fn load_order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderItem>> {
    let rows = OrderItems::find()
        .find_also_related(Products)
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?;

    rows.into_iter()
        .map(|(item, product)| {
            let product = product.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("order item {} has no product row", item.id))
            })?;
            Ok(order_item_from_entity(item, &product.name, &product.sku))
        })
        .collect()
}

async fn load_audit_logs<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<AuditLog>> {
    let rows = AuditLogs::find()
        .filter(AuditCol::OrderId.eq(order_id))
        .order_by_asc(AuditCol::CreatedAt)
        .all(conn)
        .await?;

    Ok(rows.into_iter().map(audit_log_from_entity).collect())
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        customer_id: model.customer_id,
        order_number: model.order_number,
        status: model.status.parse().map_err(anyhow::Error::msg)?,
        total_amount: model.total_amount,
        payment_status: model.payment_status.parse().map_err(anyhow::Error::msg)?,
        payment_method: model.payment_method,
        shipping_address: model.shipping_address,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel, product_name: &str, product_sku: &str) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        subtotal: model.subtotal,
        product_name: product_name.to_string(),
        product_sku: product_sku.to_string(),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn audit_log_from_entity(model: AuditLogModel) -> AuditLog {
    AuditLog {
        id: model.id,
        order_id: model.order_id,
        action: model.action,
        old_value: model.old_value,
        new_value: model.new_value,
        changed_by: model.changed_by,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_has_date_and_suffix() {
        let seed = Uuid::new_v4();
        let number = build_order_number(seed);
        // ORD- + YYYYMMDD + - + 8 hex chars
        assert_eq!(number.len(), 21);
        assert!(number.starts_with("ORD-"));
        assert!(number.ends_with(&seed.to_string()[..8]));
    }

    #[test]
    fn empty_order_is_rejected_before_any_transaction() {
        let payload = CreateOrderRequest {
            customer_id: Uuid::new_v4(),
            items: vec![],
            payment_method: None,
            shipping_address: None,
            notes: None,
        };
        assert!(matches!(
            validate_order_request(&payload),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let payload = CreateOrderRequest {
            customer_id: Uuid::new_v4(),
            items: vec![CreateOrderItemRequest {
                product_id: Uuid::new_v4(),
                quantity: 0,
            }],
            payment_method: None,
            shipping_address: None,
            notes: None,
        };
        assert!(matches!(
            validate_order_request(&payload),
            Err(AppError::BadRequest(_))
        ));
    }
}
