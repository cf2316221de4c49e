use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::{
    db::DbPool,
    dto::wishlist::{
        AddToWishlistRequest, ToggleOutcome, WishlistCount, WishlistItemDto, WishlistList,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct WishlistRow {
    id: i64,
    product_id: i64,
    product_name: String,
    price: i64,
    stock_quantity: i32,
    created_at: DateTime<Utc>,
}

pub async fn list_wishlist(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<WishlistList>> {
    let rows: Vec<WishlistRow> = sqlx::query_as(
        r#"
        SELECT w.id, w.product_id, w.created_at,
               p.name AS product_name, p.price, p.stock_quantity
        FROM wishlist_items w
        JOIN products p ON p.id = w.product_id
        WHERE w.user_id = $1
        ORDER BY w.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| WishlistItemDto {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            price: row.price,
            stock_quantity: row.stock_quantity,
            created_at: row.created_at,
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        WishlistList { items },
        Some(Meta::empty()),
    ))
}

/// Add the product when absent, remove it when present.
pub async fn toggle_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    product_id: i64,
) -> AppResult<ApiResponse<ToggleOutcome>> {
    ensure_product_exists(pool, product_id).await?;

    let exist: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(product_id)
            .fetch_optional(pool)
            .await?;

    if let Some((id,)) = exist {
        sqlx::query("DELETE FROM wishlist_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(ApiResponse::success(
            "Item removed from wishlist",
            ToggleOutcome { added: false },
            None,
        ))
    } else {
        sqlx::query("INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2)")
            .bind(user.user_id)
            .bind(product_id)
            .execute(pool)
            .await?;
        Ok(ApiResponse::success(
            "Item added to wishlist",
            ToggleOutcome { added: true },
            None,
        ))
    }
}

pub async fn add_to_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToWishlistRequest,
) -> AppResult<ApiResponse<ToggleOutcome>> {
    ensure_product_exists(pool, payload.product_id).await?;

    let exist: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Item already in wishlist".into()));
    }

    sqlx::query("INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2)")
        .bind(user.user_id)
        .bind(payload.product_id)
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Item added to wishlist",
        ToggleOutcome { added: true },
        None,
    ))
}

pub async fn remove_from_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    product_id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(user.user_id)
        .bind(product_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Item removed from wishlist",
        serde_json::json!({ "removed": true }),
        Some(Meta::empty()),
    ))
}

pub async fn clear_wishlist(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Wishlist cleared",
        serde_json::json!({ "cleared": true }),
        Some(Meta::empty()),
    ))
}

pub async fn wishlist_count(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<WishlistCount>> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wishlist_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        WishlistCount { count: count.0 },
        None,
    ))
}

async fn ensure_product_exists(pool: &DbPool, product_id: i64) -> AppResult<()> {
    let exist: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    if exist.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(())
}
