use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Order;

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
    pub shipping_address: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCreated {
    pub order_id: i64,
}

/// Order line joined with its product name for display.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemDto {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItemDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
