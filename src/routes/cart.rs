use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};

use crate::{
    db::DbPool,
    dto::cart::{AddToCartRequest, CartCount, CartResponse, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::CartItem,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_list).delete(clear_cart))
        .route("/add", post(add_to_cart))
        .route("/count", get(cart_count))
        .route("/{id}", put(update_cart_item).delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart items and price summary", body = ApiResponse<CartResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartResponse>>> {
    let resp = cart_service::list_cart(&pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/add",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added or quantity bumped", body = ApiResponse<CartItem>),
        (status = 400, description = "Bad quantity"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let resp = cart_service::add_to_cart(&pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart/{id}",
    params(("id" = i64, Path, description = "Cart item ID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated; zero removes the row", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Bad quantity"),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = cart_service::update_cart_item(&pool, &user, id, payload.quantity).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{id}",
    params(("id" = i64, Path, description = "Cart item ID")),
    responses(
        (status = 200, description = "Removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = cart_service::remove_cart_item(&pool, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart cleared", body = ApiResponse<serde_json::Value>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = cart_service::clear_cart(&pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/cart/count",
    responses(
        (status = 200, description = "Number of cart rows", body = ApiResponse<CartCount>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_count(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartCount>>> {
    let resp = cart_service::cart_count(&pool, &user).await?;
    Ok(Json(resp))
}
