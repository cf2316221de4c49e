use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductDto {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub original_price: Option<i64>,
    pub discount_percentage: i64,
    pub stock_quantity: i32,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub brand_id: Option<i64>,
    pub brand_name: Option<String>,
    pub size_chart: Vec<String>,
    pub featured: bool,
    pub primary_image: Option<String>,
    pub average_rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<ProductDto>,
}

/// Filter options offered alongside the catalog listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogFilters {
    pub categories: Vec<String>,
    pub brands: Vec<String>,
    pub sizes: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogPage {
    pub products: Vec<ProductDto>,
    pub filters: CatalogFilters,
}
