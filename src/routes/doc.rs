use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiSpec;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{
            BulkCreateOrderRequest, BulkCreateResult, BulkOrderError, CancelOrderRequest,
            CreateOrderItemRequest, CreateOrderRequest, OrderList, OrderWithDetails,
            UpdateOrderStatusRequest,
        },
        products::{
            AdjustStockRequest, CreateProductRequest, InventoryHistory, ProductList,
            StockAdjustmentType, UpdateProductRequest,
        },
        webhooks::{
            PaymentWebhookPayload, RetryReport, SimulatePaymentRequest, WebhookEventList,
            WebhookReceipt,
        },
    },
    models::{
        AuditLog, Customer, InventoryTransaction, Order, OrderItem, OrderStatus, PaymentStatus,
        Product, TransactionType, WebhookEvent, WebhookEventType, WebhookStatus,
    },
    response::{ApiResponse, Meta},
    routes::{analytics, health, orders, products, webhooks},
    services::analytics_service::DashboardMetrics,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::adjust_stock,
        products::inventory_history,
        orders::list_orders,
        orders::create_order,
        orders::create_bulk_orders,
        orders::get_order_by_number,
        orders::get_order,
        orders::update_order_status,
        orders::cancel_order,
        webhooks::receive_payment_webhook,
        webhooks::retry_failed_webhooks,
        webhooks::list_webhook_events,
        webhooks::get_webhook_event,
        webhooks::simulate_payment_webhook,
        analytics::dashboard
    ),
    components(
        schemas(
            Customer,
            Product,
            Order,
            OrderItem,
            AuditLog,
            InventoryTransaction,
            WebhookEvent,
            OrderStatus,
            PaymentStatus,
            TransactionType,
            WebhookStatus,
            WebhookEventType,
            CreateOrderRequest,
            CreateOrderItemRequest,
            BulkCreateOrderRequest,
            BulkCreateResult,
            BulkOrderError,
            UpdateOrderStatusRequest,
            CancelOrderRequest,
            OrderWithDetails,
            OrderList,
            CreateProductRequest,
            UpdateProductRequest,
            AdjustStockRequest,
            StockAdjustmentType,
            ProductList,
            InventoryHistory,
            PaymentWebhookPayload,
            WebhookReceipt,
            RetryReport,
            SimulatePaymentRequest,
            WebhookEventList,
            DashboardMetrics,
            Meta
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Product catalog and inventory endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Webhooks", description = "Payment webhook endpoints"),
        (name = "Analytics", description = "Dashboard analytics endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
