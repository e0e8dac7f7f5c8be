use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct Summary {
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub average_order_value: Decimal,
    pub total_items_sold: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct StatusBreakdownRow {
    pub status: String,
    pub count: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct PaymentBreakdownRow {
    pub payment_status: String,
    pub count: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DailyRevenueRow {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub order_count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TopProductRow {
    pub product_id: Uuid,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TopCustomerRow {
    pub customer_id: Uuid,
    pub name: String,
    pub email: String,
    pub total_spent: Decimal,
    pub order_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenueTrendPoint {
    pub date: NaiveDate,
    pub daily_revenue: Decimal,
    pub cumulative_revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardMetrics {
    pub summary: Summary,
    pub status_breakdown: Vec<StatusBreakdownRow>,
    pub payment_breakdown: Vec<PaymentBreakdownRow>,
    pub daily_revenue: Vec<DailyRevenueRow>,
    pub top_products: Vec<TopProductRow>,
    pub top_customers: Vec<TopCustomerRow>,
    pub revenue_trend: Vec<RevenueTrendPoint>,
}

#[derive(FromRow)]
struct OrderSummaryRow {
    total_orders: i64,
    total_revenue: Decimal,
    average_order_value: Decimal,
}

/// Compose the dashboard from aggregate reads. Cancelled orders are excluded
/// everywhere.
pub async fn dashboard_metrics(state: &AppState) -> AppResult<ApiResponse<DashboardMetrics>> {
    let summary = summary(state).await?;
    let status_breakdown = status_breakdown(state).await?;
    let payment_breakdown = payment_breakdown(state).await?;
    let daily_revenue = daily_revenue(state).await?;
    let top_products = top_products(state).await?;
    let top_customers = top_customers(state).await?;
    let revenue_trend = revenue_trend(&daily_revenue);

    let data = DashboardMetrics {
        summary,
        status_breakdown,
        payment_breakdown,
        daily_revenue,
        top_products,
        top_customers,
        revenue_trend,
    };

    Ok(ApiResponse::success(
        "Dashboard metrics",
        data,
        Some(Meta::empty()),
    ))
}

async fn summary(state: &AppState) -> AppResult<Summary> {
    let orders: OrderSummaryRow = sqlx::query_as(
        r#"
        SELECT
            COUNT(id) AS total_orders,
            COALESCE(SUM(total_amount), 0) AS total_revenue,
            COALESCE(AVG(total_amount), 0) AS average_order_value
        FROM orders
        WHERE status != 'cancelled'
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let total_items_sold: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(oi.quantity), 0)
        FROM order_items oi
        JOIN orders o ON oi.order_id = o.id
        WHERE o.status != 'cancelled'
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(Summary {
        total_orders: orders.total_orders,
        total_revenue: orders.total_revenue,
        average_order_value: orders.average_order_value,
        total_items_sold,
    })
}

async fn status_breakdown(state: &AppState) -> AppResult<Vec<StatusBreakdownRow>> {
    let rows = sqlx::query_as(
        r#"
        SELECT status, COUNT(*) AS count, COALESCE(SUM(total_amount), 0) AS revenue
        FROM orders
        WHERE status != 'cancelled'
        GROUP BY status
        ORDER BY count DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(rows)
}

async fn payment_breakdown(state: &AppState) -> AppResult<Vec<PaymentBreakdownRow>> {
    let rows = sqlx::query_as(
        r#"
        SELECT payment_status, COUNT(*) AS count, COALESCE(SUM(total_amount), 0) AS revenue
        FROM orders
        WHERE status != 'cancelled'
        GROUP BY payment_status
        ORDER BY count DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(rows)
}

async fn daily_revenue(state: &AppState) -> AppResult<Vec<DailyRevenueRow>> {
    let rows = sqlx::query_as(
        r#"
        SELECT
            created_at::date AS date,
            COALESCE(SUM(total_amount), 0) AS revenue,
            COUNT(*) AS order_count
        FROM orders
        WHERE status != 'cancelled'
          AND created_at >= now() - INTERVAL '30 days'
        GROUP BY created_at::date
        ORDER BY date ASC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(rows)
}

async fn top_products(state: &AppState) -> AppResult<Vec<TopProductRow>> {
    let rows = sqlx::query_as(
        r#"
        SELECT
            p.id AS product_id,
            p.name,
            COALESCE(SUM(oi.quantity), 0) AS quantity_sold,
            COALESCE(SUM(oi.subtotal), 0) AS revenue
        FROM products p
        JOIN order_items oi ON p.id = oi.product_id
        JOIN orders o ON oi.order_id = o.id
        WHERE o.status != 'cancelled'
        GROUP BY p.id, p.name
        ORDER BY quantity_sold DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(rows)
}

async fn top_customers(state: &AppState) -> AppResult<Vec<TopCustomerRow>> {
    let rows = sqlx::query_as(
        r#"
        SELECT
            c.id AS customer_id,
            c.name,
            c.email,
            COALESCE(SUM(o.total_amount), 0) AS total_spent,
            COUNT(o.id) AS order_count
        FROM customers c
        JOIN orders o ON c.id = o.customer_id
        WHERE o.status != 'cancelled'
        GROUP BY c.id, c.name, c.email
        ORDER BY total_spent DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(rows)
}

/// Cumulative sum over the daily series, computed here rather than in SQL.
fn revenue_trend(daily: &[DailyRevenueRow]) -> Vec<RevenueTrendPoint> {
    let mut cumulative = Decimal::ZERO;
    daily
        .iter()
        .map(|row| {
            cumulative += row.revenue;
            RevenueTrendPoint {
                date: row.date,
                daily_revenue: row.revenue,
                cumulative_revenue: cumulative,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, n).expect("valid date")
    }

    #[test]
    fn revenue_trend_accumulates_in_order() {
        let daily = vec![
            DailyRevenueRow {
                date: day(1),
                revenue: Decimal::new(1000, 2),
                order_count: 2,
            },
            DailyRevenueRow {
                date: day(2),
                revenue: Decimal::new(250, 2),
                order_count: 1,
            },
        ];

        let trend = revenue_trend(&daily);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].cumulative_revenue, Decimal::new(1000, 2));
        assert_eq!(trend[1].cumulative_revenue, Decimal::new(1250, 2));
    }

    #[test]
    fn revenue_trend_empty_series() {
        assert!(revenue_trend(&[]).is_empty());
    }
}
