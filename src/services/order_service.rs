use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderList, OrderWithDetails},
    entity::{
        order_details::{
            ActiveModel as DetailActive, Column as DetailCol, Entity as OrderDetails,
            Model as DetailModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    inventory,
    middleware::auth::AuthUser,
    models::{Order, OrderDetail, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::stock::{lock_stock, shift_stock},
    state::AppState,
};

/// Place an order: price snapshot per line, stock decremented atomically.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    let txn = state.orm.begin().await?;

    let stock = lock_stock(&txn, &payload.lines).await?;
    let accepted = match inventory::validate_sale(&payload.lines, &stock) {
        Ok(lines) => lines,
        Err(err) => {
            tracing::info!(customer_id = %user.user_id, reason = %err, "order rejected");
            return Err(err.into());
        }
    };

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(user.user_id),
        order_date: NotSet,
        status: Set(OrderStatus::Pending.as_str().into()),
        payment_method: Set(payload.payment_method.as_str().into()),
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut details = Vec::with_capacity(accepted.len());
    for line in &accepted {
        let price = stock
            .get(&line.book_id)
            .map(|b| b.price)
            .ok_or(AppError::NotFound)?;

        let detail = DetailActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            book_id: Set(line.book_id),
            quantity: Set(line.quantity),
            price: Set(price),
        }
        .insert(&txn)
        .await?;
        details.push(detail_from_entity(detail));

        shift_stock(&txn, line.book_id, -line.quantity).await?;
    }

    txn.commit().await?;

    let total_amount = order_total(&details);
    tracing::info!(
        order_id = %order.id,
        customer_id = %user.user_id,
        total_amount,
        "order placed"
    );

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": total_amount }),
    )
    .await;

    Ok(ApiResponse::single(
        "Order placed",
        OrderWithDetails {
            order: order_from_entity(order),
            details,
            total_amount,
        },
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::CustomerId.eq(user.user_id));
    let (items, meta) = page_orders(state, condition, query).await?;
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CustomerId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = with_details(&state.orm, order).await?;
    Ok(ApiResponse::single("OK", data))
}

/// A customer may cancel their own order while it is still pending.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CustomerId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = transition(&txn, order, OrderStatus::Cancelled).await?;
    let data = with_details(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(order_id = %data.order.id, customer_id = %user.user_id, "order cancelled");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": data.order.id }),
    )
    .await;

    Ok(ApiResponse::single("Order cancelled", data))
}

/// Move a locked order to `next`, restoring stock when it is cancelled.
pub(crate) async fn transition<C>(
    conn: &C,
    order: OrderModel,
    next: OrderStatus,
) -> AppResult<OrderModel>
where
    C: ConnectionTrait,
{
    let current = order
        .status
        .parse::<OrderStatus>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot change order status from {current} to {next}"
        )));
    }

    if next == OrderStatus::Cancelled {
        let details = OrderDetails::find()
            .filter(DetailCol::OrderId.eq(order.id))
            .order_by_asc(DetailCol::BookId)
            .all(conn)
            .await?;
        for detail in details {
            shift_stock(conn, detail.book_id, detail.quantity).await?;
        }
    }

    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

/// Shared listing used by the customer and staff order views.
pub(crate) async fn page_orders(
    state: &AppState,
    mut condition: Condition,
    query: OrderListQuery,
) -> AppResult<(Vec<Order>, Meta)> {
    let (page, limit, offset) = query.pagination().normalize(state.page_size);
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status = status
            .parse::<OrderStatus>()
            .map_err(|_| AppError::BadRequest("Invalid order status".into()))?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::OrderDate),
        SortOrder::Desc => finder.order_by_desc(OrderCol::OrderDate),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    Ok((orders, Meta::new(page, limit, total)))
}

pub(crate) async fn with_details<C>(conn: &C, order: OrderModel) -> AppResult<OrderWithDetails>
where
    C: ConnectionTrait,
{
    let details: Vec<OrderDetail> = OrderDetails::find()
        .filter(DetailCol::OrderId.eq(order.id))
        .all(conn)
        .await?
        .into_iter()
        .map(detail_from_entity)
        .collect();

    Ok(OrderWithDetails {
        total_amount: order_total(&details),
        order: order_from_entity(order),
        details,
    })
}

pub fn order_total(details: &[OrderDetail]) -> i64 {
    details
        .iter()
        .map(|d| d.price * i64::from(d.quantity))
        .sum()
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        customer_id: model.customer_id,
        order_date: model.order_date.with_timezone(&Utc),
        status: model.status,
        payment_method: model.payment_method,
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn detail_from_entity(model: DetailModel) -> OrderDetail {
    OrderDetail {
        id: model.id,
        order_id: model.order_id,
        book_id: model.book_id,
        quantity: model.quantity,
        price: model.price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(quantity: i32, price: i64) -> OrderDetail {
        OrderDetail {
            id: Uuid::new_v4(),
            order_id: Uuid::nil(),
            book_id: Uuid::new_v4(),
            quantity,
            price,
        }
    }

    #[test]
    fn total_uses_the_price_snapshot_of_each_line() {
        let details = vec![detail(2, 88_000), detail(1, 25_000)];
        assert_eq!(order_total(&details), 201_000);
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(order_total(&[]), 0);
    }
}
