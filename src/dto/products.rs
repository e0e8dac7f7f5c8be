use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{InventoryTransaction, Product, TransactionType};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: Option<i32>,
    pub sku: String,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

/// Stock movements accepted from the adjustment endpoint. Sales and returns
/// only ever enter the ledger through the order workflows.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockAdjustmentType {
    Purchase,
    Adjustment,
}

impl From<StockAdjustmentType> for TransactionType {
    fn from(kind: StockAdjustmentType) -> Self {
        match kind {
            StockAdjustmentType::Purchase => TransactionType::Purchase,
            StockAdjustmentType::Adjustment => TransactionType::Adjustment,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub quantity_change: i32,
    pub transaction_type: StockAdjustmentType,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryHistory {
    pub items: Vec<InventoryTransaction>,
}
