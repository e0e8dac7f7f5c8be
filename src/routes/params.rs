use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{OrderStatus, PaymentStatus, WebhookStatus};

// Query structs keep page/per_page inline: serde_urlencoded cannot drive
// numeric fields through #[serde(flatten)].
pub fn normalize_pagination(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;
    (page, per_page, offset)
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortBy {
    CreatedAt,
    TotalAmount,
    OrderNumber,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Name,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub customer_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: Option<OrderSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn normalize(&self) -> (i64, i64, i64) {
        normalize_pagination(self.page, self.per_page)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub is_active: Option<bool>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    pub fn normalize(&self) -> (i64, i64, i64) {
        normalize_pagination(self.page, self.per_page)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookEventQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<WebhookStatus>,
}

impl WebhookEventQuery {
    pub fn normalize(&self) -> (i64, i64, i64) {
        normalize_pagination(self.page, self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(normalize_pagination(None, None), (1, 10, 0));
        assert_eq!(normalize_pagination(Some(0), Some(1000)), (1, 100, 0));
        assert_eq!(normalize_pagination(Some(3), Some(20)), (3, 20, 40));
    }
}
