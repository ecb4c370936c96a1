pub mod admin_service;
pub mod auth_service;
pub mod book_service;
pub mod category_service;
pub mod import_service;
pub mod order_service;
pub mod stock;
