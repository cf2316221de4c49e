use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToWishlistRequest {
    pub product_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistItemDto {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub price: i64,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistList {
    pub items: Vec<WishlistItemDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistCount {
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToggleOutcome {
    pub added: bool,
}
