use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit,
    dto::books::{BookCount, BookList, CategoryStat, CategoryStatList, CreateBookRequest, UpdateBookRequest},
    entity::{
        book_import_details::{Column as ImportDetailCol, Entity as BookImportDetails},
        books::{ActiveModel, Column, Entity as Books, Model as BookModel},
        categories::Entity as Categories,
        order_details::{Column as OrderDetailCol, Entity as OrderDetails},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Book,
    response::{ApiResponse, Meta},
    routes::params::BookQuery,
    state::AppState,
};

/// Browse books by category and title keyword, one page at a time.
pub async fn list_books(state: &AppState, query: BookQuery) -> AppResult<ApiResponse<BookList>> {
    let (page, limit, offset) = query.pagination().normalize(state.page_size);
    let mut condition = Condition::all();

    if let Some(kw) = query.kw.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", kw);
        condition = condition.add(Expr::col(Column::Title).ilike(pattern));
    }

    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    let finder = Books::find()
        .filter(condition)
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(book_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Books", BookList { items }, Some(meta)))
}

pub async fn count_books(state: &AppState) -> AppResult<ApiResponse<BookCount>> {
    let total = Books::find().count(&state.orm).await? as i64;
    Ok(ApiResponse::single("Book count", BookCount { total }))
}

pub async fn get_book(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Book>> {
    let book = Books::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(book_from_entity)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Book", book, None))
}

pub async fn create_book(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBookRequest,
) -> AppResult<ApiResponse<Book>> {
    ensure_staff(user)?;
    let title = required(&payload.title, "title")?;
    let author = required(&payload.author, "author")?;
    if payload.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    ensure_category(state, payload.category_id).await?;

    let book = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        author: Set(author),
        description: Set(payload.description),
        price: Set(payload.price),
        image: Set(payload.image),
        active: Set(payload.active.unwrap_or(true)),
        category_id: Set(payload.category_id),
        quantity_in_stock: Set(0),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "book_create",
        "books",
        serde_json::json!({ "book_id": book.id }),
    )
    .await;

    Ok(ApiResponse::single("Book created", book_from_entity(book)))
}

pub async fn update_book(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateBookRequest,
) -> AppResult<ApiResponse<Book>> {
    ensure_staff(user)?;
    let existing = Books::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(required(&title, "title")?);
    }
    if let Some(author) = payload.author {
        active.author = Set(required(&author, "author")?);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
        active.price = Set(price);
    }
    if let Some(image) = payload.image {
        active.image = Set(image);
    }
    if let Some(category_id) = payload.category_id {
        ensure_category(state, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }

    let book = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "book_update",
        "books",
        serde_json::json!({ "book_id": book.id }),
    )
    .await;

    Ok(ApiResponse::single("Updated", book_from_entity(book)))
}

/// Books with import or sales history are kept; deactivate them instead.
pub async fn delete_book(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;

    let imported = BookImportDetails::find()
        .filter(ImportDetailCol::BookId.eq(id))
        .count(&state.orm)
        .await?;
    let sold = OrderDetails::find()
        .filter(OrderDetailCol::BookId.eq(id))
        .count(&state.orm)
        .await?;
    if imported > 0 || sold > 0 {
        return Err(AppError::BadRequest(
            "Book has import or order history, deactivate it instead".into(),
        ));
    }

    let result = Books::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "book_delete",
        "books",
        serde_json::json!({ "book_id": id }),
    )
    .await;

    Ok(ApiResponse::single("Deleted", serde_json::json!({})))
}

/// Book count and stock per category, including empty categories.
pub async fn category_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CategoryStatList>> {
    ensure_staff(user)?;
    let items = sqlx::query_as::<_, CategoryStat>(
        r#"
        SELECT c.id AS category_id,
               c.name AS name,
               COUNT(b.id) AS book_count,
               COALESCE(SUM(b.quantity_in_stock), 0)::BIGINT AS total_stock
        FROM categories c
        LEFT JOIN books b ON b.category_id = c.id
        GROUP BY c.id, c.name, c.created_at
        ORDER BY c.created_at, c.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::single(
        "Category stats",
        CategoryStatList { items },
    ))
}

async fn ensure_category(state: &AppState, category_id: Uuid) -> AppResult<()> {
    Categories::find_by_id(category_id)
        .one(&state.orm)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest(format!("Category with id {category_id} not found")))
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

pub(crate) fn book_from_entity(model: BookModel) -> Book {
    Book {
        id: model.id,
        title: model.title,
        author: model.author,
        description: model.description,
        price: model.price,
        image: model.image,
        active: model.active,
        category_id: model.category_id,
        quantity_in_stock: model.quantity_in_stock,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
