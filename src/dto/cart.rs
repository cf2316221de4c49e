use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: i64,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// Cart row joined with its product for display.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemDto {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub brand: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub stock_quantity: i32,
    pub size_chart: Vec<String>,
    pub product_image: Option<String>,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartSummary {
    pub subtotal: i64,
    pub discount: i64,
    pub shipping: i64,
    pub tax: i64,
    pub total: i64,
    pub free_shipping_threshold: i64,
    pub free_shipping_eligible: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub items: Vec<CartItemDto>,
    pub summary: CartSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartCount {
    pub count: i64,
}
