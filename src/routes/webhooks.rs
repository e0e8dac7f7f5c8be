use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::webhooks::{
        PaymentWebhookPayload, RetryReport, SimulatePaymentRequest, WebhookEventList,
        WebhookReceipt,
    },
    error::AppResult,
    models::WebhookEvent,
    response::ApiResponse,
    routes::params::WebhookEventQuery,
    services::webhook_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payment", post(receive_payment_webhook))
        .route("/retry", post(retry_failed_webhooks))
        .route("/events", get(list_webhook_events))
        .route("/events/{event_id}", get(get_webhook_event))
        .route("/simulate-payment", post(simulate_payment_webhook))
}

#[utoipa::path(
    post,
    path = "/api/webhooks/payment",
    request_body = PaymentWebhookPayload,
    responses(
        (status = 200, description = "Applied, or no-op replay", body = ApiResponse<WebhookReceipt>),
        (status = 400, description = "Amount mismatch"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Webhooks"
)]
pub async fn receive_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhookPayload>,
) -> AppResult<Json<ApiResponse<WebhookReceipt>>> {
    Ok(Json(
        webhook_service::process_payment_webhook(&state, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/webhooks/retry",
    responses(
        (status = 200, description = "Retry sweep report", body = ApiResponse<RetryReport>)
    ),
    tag = "Webhooks"
)]
pub async fn retry_failed_webhooks(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<RetryReport>>> {
    Ok(Json(webhook_service::retry_failed_webhooks(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/webhooks/events",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10"),
        ("status" = Option<String>, Query, description = "Filter by event status"),
    ),
    responses(
        (status = 200, description = "Webhook events", body = ApiResponse<WebhookEventList>)
    ),
    tag = "Webhooks"
)]
pub async fn list_webhook_events(
    State(state): State<AppState>,
    Query(query): Query<WebhookEventQuery>,
) -> AppResult<Json<ApiResponse<WebhookEventList>>> {
    Ok(Json(
        webhook_service::list_webhook_events(&state, query).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/webhooks/events/{event_id}",
    params(
        ("event_id" = String, Path, description = "External event ID")
    ),
    responses(
        (status = 200, description = "Webhook event", body = ApiResponse<WebhookEvent>),
        (status = 404, description = "Webhook event not found"),
    ),
    tag = "Webhooks"
)]
pub async fn get_webhook_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> AppResult<Json<ApiResponse<WebhookEvent>>> {
    Ok(Json(
        webhook_service::get_webhook_event(&state, &event_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/webhooks/simulate-payment",
    request_body = SimulatePaymentRequest,
    responses(
        (status = 200, description = "Simulated webhook outcome", body = ApiResponse<WebhookReceipt>)
    ),
    tag = "Webhooks"
)]
pub async fn simulate_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<SimulatePaymentRequest>,
) -> AppResult<Json<ApiResponse<WebhookReceipt>>> {
    Ok(Json(
        webhook_service::simulate_payment_webhook(&state, payload).await?,
    ))
}
