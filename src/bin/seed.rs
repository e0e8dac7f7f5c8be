use axum_orders_api::{config::AppConfig, db::create_pool};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    seed_customers(&pool).await?;
    seed_products(&pool).await?;

    println!("Seed completed");
    Ok(())
}

async fn seed_customers(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let customers = vec![
        ("Alice Johnson", "alice@example.com", Some("+1-555-0100")),
        ("Bob Martinez", "bob@example.com", Some("+1-555-0101")),
        ("Carol Nguyen", "carol@example.com", None),
    ];

    for (name, email, phone) in customers {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(phone)
        .execute(pool)
        .await?;
    }

    println!("Seeded customers");
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        ("Wireless Mouse", "Ergonomic 2.4GHz mouse", "29.99", 150, "WM-001", "electronics"),
        ("Mechanical Keyboard", "Tenkeyless, brown switches", "89.50", 80, "MK-002", "electronics"),
        ("USB-C Hub", "7-in-1 aluminium hub", "45.00", 120, "UH-003", "electronics"),
        ("Laptop Stand", "Adjustable aluminium stand", "39.95", 60, "LS-004", "accessories"),
        ("Desk Mat", "900x400mm felt mat", "19.99", 200, "DM-005", "accessories"),
    ];

    for (name, description, price, stock, sku, category) in products {
        let price: Decimal = price.parse()?;
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock_quantity, sku, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (sku) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(stock)
        .bind(sku)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
