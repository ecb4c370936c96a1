use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        books::{BookCount, BookList, CategoryStat, CategoryStatList, CreateBookRequest, UpdateBookRequest},
        categories::{CategoryList, CreateCategoryRequest},
        imports::{CreateImportRequest, ImportList, ImportWithDetails},
        orders::{CreateOrderRequest, OrderList, OrderWithDetails},
    },
    inventory::StockLine,
    models::{
        Book, BookImport, BookImportDetail, Category, Order, OrderDetail, OrderStatus,
        PaymentMethod, User, UserRole,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, books, categories, health, imports, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::register,
        auth::login,
        auth::me,
        categories::list_categories,
        categories::create_category,
        books::list_books,
        books::count_books,
        books::category_stats,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        imports::import_books,
        imports::list_imports,
        imports::get_import,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status
    ),
    components(
        schemas(
            User,
            UserRole,
            Category,
            Book,
            BookImport,
            BookImportDetail,
            Order,
            OrderDetail,
            OrderStatus,
            PaymentMethod,
            StockLine,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateCategoryRequest,
            CategoryList,
            CreateBookRequest,
            UpdateBookRequest,
            BookList,
            BookCount,
            CategoryStat,
            CategoryStatList,
            CreateImportRequest,
            ImportWithDetails,
            ImportList,
            CreateOrderRequest,
            OrderWithDetails,
            OrderList,
            admin::UpdateOrderStatusRequest,
            params::Pagination,
            params::BookQuery,
            params::OrderListQuery,
            params::SortOrder,
            Meta,
            ApiResponse<Book>,
            ApiResponse<BookList>,
            ApiResponse<ImportWithDetails>,
            ApiResponse<OrderWithDetails>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Categories", description = "Book categories"),
        (name = "Books", description = "Catalogue browsing and maintenance"),
        (name = "Imports", description = "Stock import receipts"),
        (name = "Orders", description = "Customer orders"),
        (name = "Admin", description = "Staff order management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
