use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    inventory::StockLine,
    models::{Order, OrderDetail, PaymentMethod},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub payment_method: PaymentMethod,
    pub lines: Vec<StockLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithDetails {
    pub order: Order,
    pub details: Vec<OrderDetail>,
    pub total_amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
