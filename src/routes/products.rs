use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    db::DbPool,
    dto::products::{CatalogPage, ProductDto, ProductList},
    error::{AppError, AppResult},
    response::ApiResponse,
    routes::params::{ProductQuery, SearchQuery},
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/search", get(search_products))
        .route("/slug/{slug}", get(get_product_by_slug))
        .route("/category/{category}", get(list_by_category))
        .route("/{id}", get(get_product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 12"),
        ("search" = Option<String>, Query, description = "Match against name and description"),
        ("category" = Option<String>, Query, description = "Category name"),
        ("brand" = Option<String>, Query, description = "Brand name"),
        ("discount" = Option<bool>, Query, description = "Only discounted products"),
        ("featured" = Option<bool>, Query, description = "Only featured products"),
        ("sort_by" = Option<String>, Query, description = "created_at | price | name"),
        ("sort_order" = Option<String>, Query, description = "asc | desc"),
    ),
    responses(
        (status = 200, description = "Filtered catalog page", body = ApiResponse<CatalogPage>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(pool): State<DbPool>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<CatalogPage>>> {
    let resp = product_service::list_products(&pool, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/search",
    params(("q" = String, Query, description = "Search query")),
    responses(
        (status = 200, description = "Matching products", body = ApiResponse<ProductList>),
        (status = 400, description = "Missing query"),
    ),
    tag = "Products"
)]
pub async fn search_products(
    State(pool): State<DbPool>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Search query is required".into()))?;
    let resp = product_service::search_products(&pool, q).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/slug/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<ProductDto>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product_by_slug(
    State(pool): State<DbPool>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<ProductDto>>> {
    let resp = product_service::get_product_by_slug(&pool, &slug).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/category/{category}",
    params(("category" = String, Path, description = "Category name")),
    responses(
        (status = 200, description = "Products in category", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_by_category(
    State(pool): State<DbPool>,
    Path(category): Path<String>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_by_category(&pool, &category).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<ProductDto>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(pool): State<DbPool>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<ProductDto>>> {
    let resp = product_service::get_product(&pool, id).await?;
    Ok(Json(resp))
}
