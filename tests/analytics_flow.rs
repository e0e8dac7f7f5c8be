mod common;

use axum_orders_api::{
    dto::orders::{CreateOrderItemRequest, CreateOrderRequest},
    services::{analytics_service, order_service},
};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal literal")
}

// The dashboard aggregates globally, so assertions stay monotonic: totals
// must reflect at least the order created here.
#[tokio::test]
async fn dashboard_reflects_created_orders() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::create_customer(&state, "Analytics Customer").await?;
    let product = common::create_product(&state, "Tracked Widget", dec("12.50"), 9).await?;

    order_service::create_order(
        &state,
        CreateOrderRequest {
            customer_id: customer.id,
            items: vec![CreateOrderItemRequest {
                product_id: product.id,
                quantity: 2,
            }],
            payment_method: None,
            shipping_address: None,
            notes: None,
        },
    )
    .await?;

    let response = analytics_service::dashboard_metrics(&state).await?;
    let metrics = response.data.expect("dashboard data");

    assert!(metrics.summary.total_orders >= 1);
    assert!(metrics.summary.total_revenue >= dec("25.00"));
    assert!(metrics.summary.total_items_sold >= 2);
    assert!(!metrics.status_breakdown.is_empty());
    assert!(!metrics.payment_breakdown.is_empty());

    // The trend is the running sum of the daily series.
    if let (Some(first), Some(last)) = (
        metrics.revenue_trend.first(),
        metrics.revenue_trend.last(),
    ) {
        assert!(last.cumulative_revenue >= first.daily_revenue);
    }

    Ok(())
}
