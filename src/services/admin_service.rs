use sea_orm::{Condition, EntityTrait, QuerySelect, TransactionTrait};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, OrderWithDetails},
    entity::orders::Entity as Orders,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::OrderStatus,
    response::ApiResponse,
    routes::{admin::UpdateOrderStatusRequest, params::OrderListQuery},
    services::order_service::{page_orders, transition, with_details},
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_staff(user)?;
    let (items, meta) = page_orders(state, Condition::all(), query).await?;
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    ensure_staff(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = with_details(&state.orm, order).await?;
    Ok(ApiResponse::single("Order found", data))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    ensure_staff(user)?;
    let next = validate_order_status(&payload.status)?;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = transition(&txn, order, next).await?;
    let data = with_details(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(order_id = %data.order.id, status = %next, staff_id = %user.user_id, "order status updated");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": data.order.id, "status": next.as_str() }),
    )
    .await;

    Ok(ApiResponse::single("Order updated", data))
}

fn validate_order_status(status: &str) -> Result<OrderStatus, AppError> {
    status
        .trim()
        .parse::<OrderStatus>()
        .map_err(|_| AppError::BadRequest("Invalid order status".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_statuses_only() {
        assert_eq!(validate_order_status("paid").unwrap(), OrderStatus::Paid);
        assert_eq!(validate_order_status(" cancelled ").unwrap(), OrderStatus::Cancelled);
        assert!(matches!(
            validate_order_status("shipped"),
            Err(AppError::BadRequest(_))
        ));
    }
}
