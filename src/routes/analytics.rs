use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::AppResult,
    response::ApiResponse,
    services::analytics_service::{self, DashboardMetrics},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[utoipa::path(
    get,
    path = "/api/analytics/dashboard",
    responses(
        (status = 200, description = "Dashboard metrics", body = ApiResponse<DashboardMetrics>)
    ),
    tag = "Analytics"
)]
pub async fn dashboard(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DashboardMetrics>>> {
    Ok(Json(analytics_service::dashboard_metrics(&state).await?))
}
