use bookstore_api::{
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::RegisterRequest,
        books::{CreateBookRequest, UpdateBookRequest},
        categories::CreateCategoryRequest,
        imports::CreateImportRequest,
        orders::CreateOrderRequest,
    },
    entity::{
        books::Entity as Books,
        categories::ActiveModel as CategoryActive,
    },
    error::AppError,
    inventory::{StockLine, StockRuleError},
    middleware::auth::AuthUser,
    models::{PaymentMethod, UserRole},
    routes::{admin::UpdateOrderStatusRequest, params::{BookQuery, Pagination}},
    services::{
        admin_service, auth_service, book_service, category_service, import_service,
        order_service,
    },
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use uuid::Uuid;

// Integration flow: staff imports stock, a customer orders and cancels,
// staff marks a second order as paid.
#[tokio::test]
async fn import_order_and_status_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let staff = register(&state, "staff", UserRole::Staff).await?;
    let customer = register(&state, "reader", UserRole::Customer).await?;

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set("Thiếu nhi".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let doraemon = create_book(&state, &staff, category.id, "Doraemon Tập 1", 25_000).await?;
    let conan = create_book(&state, &staff, category.id, "Conan Tập 1", 30_000).await?;

    // Below the receipt minimum: nothing changes.
    let err = import_service::import_books(
        &state,
        &staff,
        CreateImportRequest {
            lines: vec![line(doraemon, 100), line(conan, 49)],
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::StockRule(StockRuleError::BelowMinimumTotal { .. })
    ));
    assert_eq!(stock_of(&state, doraemon).await?, 0);

    // Accepted import raises both books.
    let receipt = import_service::import_books(
        &state,
        &staff,
        CreateImportRequest {
            lines: vec![line(doraemon, 200), line(conan, 100)],
            notes: Some("first delivery".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(receipt.receipt.total_quantity, 300);
    assert_eq!(receipt.details.len(), 2);
    assert_eq!(stock_of(&state, doraemon).await?, 200);
    assert_eq!(stock_of(&state, conan).await?, 100);

    // Would push Doraemon past the cap: whole batch rejected, Conan untouched.
    let err = import_service::import_books(
        &state,
        &staff,
        CreateImportRequest {
            lines: vec![line(conan, 100), line(doraemon, 101)],
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::StockRule(StockRuleError::WouldExceed { .. })
    ));
    assert_eq!(stock_of(&state, conan).await?, 100);

    // Customers cannot import.
    let err = import_service::import_books(
        &state,
        &customer,
        CreateImportRequest {
            lines: vec![line(conan, 150)],
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // Order snapshots the price and reduces stock.
    let placed = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            payment_method: PaymentMethod::Offline,
            lines: vec![line(doraemon, 2), line(conan, 1)],
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(placed.order.status, "pending");
    assert_eq!(placed.total_amount, 2 * 25_000 + 30_000);
    assert_eq!(stock_of(&state, doraemon).await?, 198);

    // Ordering more than is on the shelf is rejected.
    let err = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            payment_method: PaymentMethod::Online,
            lines: vec![line(conan, 100)],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::StockRule(StockRuleError::InsufficientStock { .. })
    ));

    // Cancelling restores stock; a cancelled order is final.
    let cancelled = order_service::cancel_order(&state, &customer, placed.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.order.status, "cancelled");
    assert_eq!(stock_of(&state, doraemon).await?, 200);
    assert_eq!(stock_of(&state, conan).await?, 100);

    let err = admin_service::update_order_status(
        &state,
        &staff,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "paid".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Staff marks a fresh order as paid.
    let second = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            payment_method: PaymentMethod::Online,
            lines: vec![line(conan, 3)],
        },
    )
    .await?
    .data
    .unwrap();
    let paid = admin_service::update_order_status(
        &state,
        &staff,
        second.order.id,
        UpdateOrderStatusRequest {
            status: "paid".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(paid.order.status, "paid");
    assert_eq!(stock_of(&state, conan).await?, 97);

    // Browsing filters by keyword and category and pages with the configured size.
    let found = book_service::list_books(
        &state,
        BookQuery {
            kw: Some("doraemon".into()),
            category_id: Some(category.id),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(found.meta.as_ref().and_then(|m| m.total), Some(1));
    assert_eq!(found.data.unwrap().items[0].id, doraemon);

    let first_page = book_service::list_books(
        &state,
        BookQuery {
            per_page: Some(1),
            ..Default::default()
        },
    )
    .await?;
    let meta = first_page.meta.unwrap();
    assert_eq!(meta.total, Some(2));
    assert_eq!(meta.total_pages, Some(2));

    let count = book_service::count_books(&state).await?.data.unwrap();
    assert_eq!(count.total, 2);

    let imports = import_service::list_imports(&state, &staff, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(imports.items.len(), 1);

    let customer_orders = order_service::list_orders(&state, &customer, Default::default())
        .await?
        .data
        .unwrap();
    assert_eq!(customer_orders.items.len(), 2);

    let stats = book_service::category_stats(&state, &staff)
        .await?
        .data
        .unwrap();
    assert_eq!(stats.items.len(), 1);
    assert_eq!(stats.items[0].book_count, 2);
    assert_eq!(stats.items[0].total_stock, 297);

    // A receipt reads back with its lines.
    let fetched = import_service::get_import(&state, &staff, receipt.receipt.id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.receipt.total_quantity, 300);
    assert_eq!(fetched.details.len(), 2);
    let err = import_service::get_import(&state, &staff, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Fill Doraemon to the cap; any later receipt naming it is refused whole.
    import_service::import_books(
        &state,
        &staff,
        CreateImportRequest {
            lines: vec![line(doraemon, 100), line(conan, 50)],
            notes: None,
        },
    )
    .await?;
    assert_eq!(stock_of(&state, doraemon).await?, 300);
    let err = import_service::import_books(
        &state,
        &staff,
        CreateImportRequest {
            lines: vec![line(doraemon, 1), line(conan, 149)],
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::StockRule(StockRuleError::AlreadyFull { current: 300, .. })
    ));
    assert_eq!(stock_of(&state, conan).await?, 147);

    // Orders belong to the customer who placed them.
    let neighbour = register(&state, "neighbour", UserRole::Customer).await?;
    let err = order_service::get_order(&state, &neighbour, second.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let third = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            payment_method: PaymentMethod::Offline,
            lines: vec![line(conan, 1)],
        },
    )
    .await?
    .data
    .unwrap();
    let err = order_service::cancel_order(&state, &neighbour, third.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    assert_eq!(stock_of(&state, conan).await?, 146);

    // A deactivated book leaves the shelf for buyers.
    let hidden = book_service::update_book(
        &state,
        &staff,
        doraemon,
        UpdateBookRequest {
            active: Some(false),
            description: Some(Some("Tập 1".into())),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert!(!hidden.active);
    assert_eq!(hidden.description.as_deref(), Some("Tập 1"));
    let err = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            payment_method: PaymentMethod::Online,
            lines: vec![line(doraemon, 1)],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::StockRule(StockRuleError::NotForSale { .. })
    ));
    assert_eq!(stock_of(&state, doraemon).await?, 300);

    // An explicit null clears the description again.
    let cleared = book_service::update_book(
        &state,
        &staff,
        doraemon,
        UpdateBookRequest {
            description: Some(None),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cleared.description, None);

    // Only books without history can be deleted.
    let err = book_service::delete_book(&state, &staff, doraemon)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let draft = create_book(&state, &staff, category.id, "Bản nháp", 10_000).await?;
    book_service::delete_book(&state, &staff, draft).await?;
    let err = book_service::get_book(&state, draft).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Categories: admins only, names unique.
    let admin = register(&state, "admin", UserRole::Admin).await?;
    let err = category_service::create_category(
        &state,
        &staff,
        CreateCategoryRequest {
            name: "Kỹ năng sống".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: " Thiếu nhi ".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(&err, AppError::BadRequest(msg) if msg == "Category already exists"));

    // A duplicate that slips past the lookup is still a client error.
    let raced = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set("Thiếu nhi".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::unique_or(e, "Category already exists"))
    .unwrap_err();
    assert!(matches!(&raced, AppError::BadRequest(msg) if msg == "Category already exists"));

    let created = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: "Kỹ năng sống".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(created.name, "Kỹ năng sống");

    Ok(())
}

#[tokio::test]
async fn login_checks_trimmed_password() -> anyhow::Result<()> {
    let Some(state) = setup_state_named("login").await? else {
        return Ok(());
    };

    auth_service::add_user(
        &state.orm,
        RegisterRequest {
            name: Some("Reader".into()),
            username: "login-reader".into(),
            password: " secret ".into(),
            avatar: None,
        },
        UserRole::Customer,
    )
    .await?;

    let found = auth_service::auth_user(&state.orm, "login-reader", "secret").await?;
    assert!(found.is_some());
    let user = found.unwrap();
    assert_eq!(user.role, "customer");
    assert!(!user.avatar.is_empty());

    assert!(
        auth_service::auth_user(&state.orm, "login-reader", "wrong")
            .await?
            .is_none()
    );
    assert!(
        auth_service::auth_user(&state.orm, "nobody", "secret")
            .await?
            .is_none()
    );

    let err = auth_service::add_user(
        &state.orm,
        RegisterRequest {
            name: None,
            username: "login-reader".into(),
            password: "other".into(),
            avatar: None,
        },
        UserRole::Customer,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

fn line(book_id: Uuid, quantity: i32) -> StockLine {
    StockLine { book_id, quantity }
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    setup_state_named("flow").await
}

// Both tests share one database, so only the flow test truncates.
async fn setup_state_named(name: &str) -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping {name}: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    if name == "flow" {
        let backend = orm.get_database_backend();
        orm.execute(Statement::from_string(
            backend,
            "TRUNCATE TABLE order_details, orders, book_import_details, book_imports, books, categories, audit_logs RESTART IDENTITY CASCADE",
        ))
        .await?;
        orm.execute(Statement::from_string(
            backend,
            "DELETE FROM users WHERE username IN ('admin-flow', 'staff-flow', 'reader-flow', 'neighbour-flow')",
        ))
        .await?;
    } else {
        let backend = orm.get_database_backend();
        orm.execute(Statement::from_string(
            backend,
            "DELETE FROM users WHERE username = 'login-reader'",
        ))
        .await?;
    }

    Ok(Some(AppState::new(orm, 3)))
}

async fn register(state: &AppState, name: &str, role: UserRole) -> anyhow::Result<AuthUser> {
    let user = auth_service::add_user(
        &state.orm,
        RegisterRequest {
            name: Some(name.into()),
            username: format!("{name}-flow"),
            password: "123456".into(),
            avatar: None,
        },
        role,
    )
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

async fn create_book(
    state: &AppState,
    staff: &AuthUser,
    category_id: Uuid,
    title: &str,
    price: i64,
) -> anyhow::Result<Uuid> {
    let book = book_service::create_book(
        state,
        staff,
        CreateBookRequest {
            title: title.into(),
            author: "Test Author".into(),
            description: None,
            price,
            image: None,
            category_id,
            active: None,
        },
    )
    .await?
    .data
    .unwrap();
    Ok(book.id)
}

async fn stock_of(state: &AppState, book_id: Uuid) -> anyhow::Result<i32> {
    let book = Books::find_by_id(book_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("book {book_id} missing"))?;
    Ok(book.quantity_in_stock)
}
