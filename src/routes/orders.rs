use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        BulkCreateOrderRequest, BulkCreateResult, CancelOrderRequest, CreateOrderRequest,
        OrderList, OrderWithDetails, UpdateOrderStatusRequest,
    },
    error::AppResult,
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/bulk", post(create_bulk_orders))
        .route("/number/{order_number}", get(get_order_by_number))
        .route("/{id}", get(get_order))
        .route("/{id}/status", put(update_order_status))
        .route("/{id}/cancel", post(cancel_order))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("payment_status" = Option<String>, Query, description = "Filter by payment status"),
        ("customer_id" = Option<Uuid>, Query, description = "Filter by customer"),
        ("search" = Option<String>, Query, description = "Search order number, customer name or email"),
    ),
    responses(
        (status = 200, description = "List orders", body = ApiResponse<OrderList>)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(order_service::list_orders(&state, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<OrderWithDetails>),
        (status = 400, description = "Insufficient stock or invalid request"),
        (status = 404, description = "Customer or product not found"),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    Ok(Json(order_service::create_order(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders/bulk",
    request_body = BulkCreateOrderRequest,
    responses(
        (status = 200, description = "Per-order results", body = ApiResponse<BulkCreateResult>)
    ),
    tag = "Orders"
)]
pub async fn create_bulk_orders(
    State(state): State<AppState>,
    Json(payload): Json<BulkCreateOrderRequest>,
) -> AppResult<Json<ApiResponse<BulkCreateResult>>> {
    Ok(Json(
        order_service::create_bulk_orders(&state, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders/number/{order_number}",
    params(
        ("order_number" = String, Path, description = "Order number")
    ),
    responses(
        (status = 200, description = "Order", body = ApiResponse<Order>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn get_order_by_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(
        order_service::get_order_by_number(&state, &order_number).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with items and audit trail", body = ApiResponse<OrderWithDetails>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    Ok(Json(order_service::get_order(&state, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(
        order_service::update_order_status(&state, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled and stock restored", body = ApiResponse<OrderWithDetails>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already cancelled"),
    ),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    Ok(Json(order_service::cancel_order(&state, id, payload).await?))
}
