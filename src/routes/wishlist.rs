use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    db::DbPool,
    dto::wishlist::{AddToWishlistRequest, ToggleOutcome, WishlistCount, WishlistList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::wishlist_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist).post(add_to_wishlist).delete(clear_wishlist))
        .route("/toggle/{product_id}", post(toggle_wishlist))
        .route("/count", get(wishlist_count))
        .route("/{product_id}", axum::routing::delete(remove_from_wishlist))
}

#[utoipa::path(
    get,
    path = "/api/wishlist",
    responses(
        (status = 200, description = "Wishlist items with product data", body = ApiResponse<WishlistList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn wishlist(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WishlistList>>> {
    let resp = wishlist_service::list_wishlist(&pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/wishlist/toggle/{product_id}",
    params(("product_id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Added when absent, removed when present", body = ApiResponse<ToggleOutcome>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn toggle_wishlist(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<ApiResponse<ToggleOutcome>>> {
    let resp = wishlist_service::toggle_wishlist(&pool, &user, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/wishlist",
    request_body = AddToWishlistRequest,
    responses(
        (status = 200, description = "Added", body = ApiResponse<ToggleOutcome>),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Already in wishlist"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn add_to_wishlist(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<AddToWishlistRequest>,
) -> AppResult<Json<ApiResponse<ToggleOutcome>>> {
    let resp = wishlist_service::add_to_wishlist(&pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/wishlist/{product_id}",
    params(("product_id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Item not in wishlist"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn remove_from_wishlist(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = wishlist_service::remove_from_wishlist(&pool, &user, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/wishlist",
    responses(
        (status = 200, description = "Wishlist cleared", body = ApiResponse<serde_json::Value>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn clear_wishlist(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = wishlist_service::clear_wishlist(&pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/wishlist/count",
    responses(
        (status = 200, description = "Number of wishlist rows", body = ApiResponse<WishlistCount>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn wishlist_count(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WishlistCount>>> {
    let resp = wishlist_service::wishlist_count(&pool, &user).await?;
    Ok(Json(resp))
}
