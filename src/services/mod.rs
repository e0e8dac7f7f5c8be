pub mod analytics_service;
pub mod order_service;
pub mod product_service;
pub mod webhook_service;
