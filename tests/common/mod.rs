use std::time::Duration;

use axum_orders_api::{
    db::{create_orm_conn, create_pool},
    entity::{
        customers::{ActiveModel as CustomerActive, Model as CustomerModel},
        products::{ActiveModel as ProductActive, Model as ProductModel},
    },
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

/// Connect to the test database, or return None (and skip) when no database
/// is configured in the environment. Tests create their own uniquely-keyed
/// rows, so no global cleanup is needed and tests can run in parallel.
pub async fn try_setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let orm = create_orm_conn(&database_url).await?;

    Ok(Some(AppState {
        pool,
        orm,
        txn_deadline: Duration::from_secs(30),
    }))
}

pub fn unique_tag() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub async fn create_customer(state: &AppState, name: &str) -> anyhow::Result<CustomerModel> {
    let customer = CustomerActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(format!("{}@example.com", unique_tag())),
        phone: Set(None),
        address: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(customer)
}

pub async fn create_product(
    state: &AppState,
    name: &str,
    price: Decimal,
    stock: i32,
) -> anyhow::Result<ProductModel> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(Some("A product for testing".to_string())),
        price: Set(price),
        stock_quantity: Set(stock),
        sku: Set(format!("SKU-{}", unique_tag())),
        category: Set(None),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product)
}
