use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::products::{
        AdjustStockRequest, CreateProductRequest, InventoryHistory, ProductList,
        UpdateProductRequest,
    },
    entity::{
        inventory_transactions::{
            ActiveModel as InventoryTransactionActive, Column as InventoryCol,
            Entity as InventoryTransactions, Model as InventoryTransactionModel,
        },
        products::{
            ActiveModel as ProductActive, Column as ProductCol, Entity as Products,
            Model as ProductModel,
        },
    },
    error::{AppError, AppResult},
    models::{InventoryTransaction, Product, TransactionType},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

const INVENTORY_HISTORY_LIMIT: u64 = 50;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ProductCol::Name).ilike(pattern.clone()))
                .add(Expr::col(ProductCol::Description).ilike(pattern)),
        );
    }

    if let Some(is_active) = query.is_active {
        condition = condition.add(ProductCol::IsActive.eq(is_active));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => ProductCol::CreatedAt,
        ProductSortBy::Price => ProductCol::Price,
        ProductSortBy::Name => ProductCol::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound(format!("Product {id}"))),
    };
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.price < Decimal::ZERO {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if payload.stock_quantity.is_some_and(|q| q < 0) {
        return Err(AppError::BadRequest(
            "stock_quantity must not be negative".into(),
        ));
    }

    let existing = Products::find()
        .filter(ProductCol::Sku.eq(&payload.sku))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Product with this SKU already exists".into(),
        ));
    }

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock_quantity: Set(payload.stock_quantity.unwrap_or(0)),
        sku: Set(payload.sku),
        category: Set(payload.category),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound(format!("Product {id}"))),
    };

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        if price < Decimal::ZERO {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
        active.price = Set(price);
    }
    if let Some(category) = payload.category {
        active.category = Set(Some(category));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Products are deactivated, never deleted, so historical orders and ledger
/// rows keep their references.
pub async fn delete_product(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound(format!("Product {id}"))),
    };

    let mut active: ProductActive = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Product deactivated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn adjust_stock(
    state: &AppState,
    id: Uuid,
    payload: AdjustStockRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.quantity_change == 0 {
        return Err(AppError::BadRequest("quantity_change must not be 0".into()));
    }

    let product = tokio::time::timeout(state.txn_deadline, adjust_stock_txn(state, id, payload))
        .await
        .map_err(|_| AppError::Timeout)??;

    Ok(ApiResponse::success(
        "Stock adjusted",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

async fn adjust_stock_txn(
    state: &AppState,
    id: Uuid,
    payload: AdjustStockRequest,
) -> AppResult<ProductModel> {
    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    let new_stock = product.stock_quantity + payload.quantity_change;
    if new_stock < 0 {
        return Err(AppError::InsufficientStock {
            product: product.name,
            available: product.stock_quantity,
        });
    }

    let mut active: ProductActive = product.into();
    active.stock_quantity = Set(new_stock);
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&txn).await?;

    InventoryTransactionActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        order_id: Set(None),
        transaction_type: Set(TransactionType::from(payload.transaction_type).to_string()),
        quantity_change: Set(payload.quantity_change),
        stock_after: Set(new_stock),
        notes: Set(payload.notes),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(product)
}

pub async fn inventory_history(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<InventoryHistory>> {
    let exists = Products::find_by_id(id).count(&state.orm).await? > 0;
    if !exists {
        return Err(AppError::NotFound(format!("Product {id}")));
    }

    let items = InventoryTransactions::find()
        .filter(InventoryCol::ProductId.eq(id))
        .order_by_desc(InventoryCol::CreatedAt)
        .limit(INVENTORY_HISTORY_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(inventory_transaction_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Inventory transactions",
        InventoryHistory { items },
        Some(Meta::empty()),
    ))
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock_quantity: model.stock_quantity,
        sku: model.sku,
        category: model.category,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn inventory_transaction_from_entity(
    model: InventoryTransactionModel,
) -> AppResult<InventoryTransaction> {
    Ok(InventoryTransaction {
        id: model.id,
        product_id: model.product_id,
        order_id: model.order_id,
        transaction_type: model.transaction_type.parse().map_err(anyhow::Error::msg)?,
        quantity_change: model.quantity_change,
        stock_after: model.stock_after,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
