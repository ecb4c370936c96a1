//! Row-level stock access shared by imports and orders.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    entity::books::{Column as BookCol, Entity as Books},
    error::AppResult,
    inventory::{StockLine, StockMap, StockSnapshot},
};

/// Load and lock the books named by `lines`, keyed by id.
///
/// Rows are locked in id order so concurrent receipts and orders touching the
/// same books cannot deadlock each other.
pub async fn lock_stock<C>(conn: &C, lines: &[StockLine]) -> AppResult<StockMap>
where
    C: ConnectionTrait,
{
    let mut ids: Vec<Uuid> = lines.iter().map(|l| l.book_id).collect();
    ids.sort();
    ids.dedup();

    let books = Books::find()
        .filter(BookCol::Id.is_in(ids))
        .order_by_asc(BookCol::Id)
        .lock(LockType::Update)
        .all(conn)
        .await?;

    Ok(books
        .into_iter()
        .map(|b| {
            (
                b.id,
                StockSnapshot {
                    title: b.title,
                    quantity_in_stock: b.quantity_in_stock,
                    price: b.price,
                    active: b.active,
                },
            )
        })
        .collect())
}

/// Add (or, with a negative delta, remove) stock for one book.
pub async fn shift_stock<C>(conn: &C, book_id: Uuid, delta: i32) -> AppResult<()>
where
    C: ConnectionTrait,
{
    Books::update_many()
        .col_expr(
            BookCol::QuantityInStock,
            Expr::col(BookCol::QuantityInStock).add(delta),
        )
        .filter(BookCol::Id.eq(book_id))
        .exec(conn)
        .await?;
    Ok(())
}
