use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::{
    db::DbPool,
    dto::cart::{AddToCartRequest, CartCount, CartItemDto, CartResponse, CartSummary},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Meta},
    services::product_service::parse_size_chart,
};

pub const FREE_SHIPPING_THRESHOLD: i64 = 1000;
pub const FLAT_SHIPPING_FEE: i64 = 50;
pub const FIXED_TAX: i64 = 50;

/// Price summary for a cart. Stateless; recomputed on every read.
/// Discount is a placeholder kept at zero.
pub fn summarize(subtotal: i64) -> CartSummary {
    let discount = 0;
    let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_FEE
    };
    let tax = FIXED_TAX;
    CartSummary {
        subtotal,
        discount,
        shipping,
        tax,
        total: subtotal - discount + shipping + tax,
        free_shipping_threshold: FREE_SHIPPING_THRESHOLD,
        free_shipping_eligible: subtotal >= FREE_SHIPPING_THRESHOLD,
    }
}

#[derive(FromRow)]
struct CartRow {
    id: i64,
    product_id: i64,
    product_name: String,
    brand: Option<String>,
    unit_price: i64,
    quantity: i32,
    stock_quantity: i32,
    size_chart: Option<String>,
    product_image: Option<String>,
    total_price: i64,
    created_at: DateTime<Utc>,
}

pub async fn list_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartResponse>> {
    let rows: Vec<CartRow> = sqlx::query_as(
        r#"
        SELECT ci.id, ci.product_id, ci.quantity, ci.created_at,
               p.name AS product_name, p.price AS unit_price,
               p.stock_quantity, p.size_chart,
               b.name AS brand,
               (SELECT pi.image_url FROM product_images pi
                WHERE pi.product_id = p.id ORDER BY pi.id LIMIT 1) AS product_image,
               (ci.quantity * p.price) AS total_price
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        LEFT JOIN brands b ON b.id = p.brand_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let items: Vec<CartItemDto> = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            brand: row.brand,
            unit_price: row.unit_price,
            quantity: row.quantity,
            stock_quantity: row.stock_quantity,
            size_chart: parse_size_chart(row.size_chart.as_deref()),
            product_image: row.product_image,
            total_price: row.total_price,
            created_at: row.created_at,
        })
        .collect();

    let subtotal = items.iter().map(|item| item.total_price).sum();
    let summary = summarize(subtotal);

    Ok(ApiResponse::success(
        "OK",
        CartResponse { items, summary },
        Some(Meta::empty()),
    ))
}

/// Add a product to the cart, or bump the quantity of the existing row.
pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".into(),
        ));
    }

    let product_exist: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::NotFound);
    }

    let exist: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;

    let (message, cart_item) = if let Some(item) = exist {
        let updated: CartItem = sqlx::query_as(
            r#"
            UPDATE cart_items
            SET quantity = quantity + $3, updated_at = datetime('now')
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(user.user_id)
        .bind(quantity)
        .fetch_one(pool)
        .await?;
        ("Cart item updated", updated)
    } else {
        let inserted: CartItem = sqlx::query_as(
            "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user.user_id)
        .bind(payload.product_id)
        .bind(quantity)
        .fetch_one(pool)
        .await?;
        ("Item added to cart", inserted)
    };

    Ok(ApiResponse::success(message, cart_item, None))
}

/// Set the quantity of a cart row; zero removes it.
pub async fn update_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    cart_item_id: i64,
    quantity: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if quantity < 0 {
        return Err(AppError::BadRequest("Valid quantity is required".into()));
    }

    let exist: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(cart_item_id)
            .bind(user.user_id)
            .fetch_optional(pool)
            .await?;
    if exist.is_none() {
        return Err(AppError::NotFound);
    }

    if quantity == 0 {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(cart_item_id)
            .execute(pool)
            .await?;
        return Ok(ApiResponse::success(
            "Item removed from cart",
            serde_json::json!({ "removed": true }),
            Some(Meta::empty()),
        ));
    }

    sqlx::query("UPDATE cart_items SET quantity = $2, updated_at = datetime('now') WHERE id = $1")
        .bind(cart_item_id)
        .bind(quantity)
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Cart item updated",
        serde_json::json!({ "updated": true }),
        Some(Meta::empty()),
    ))
}

pub async fn remove_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    cart_item_id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(cart_item_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Item removed from cart",
        serde_json::json!({ "removed": true }),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({ "cleared": true }),
        Some(Meta::empty()),
    ))
}

pub async fn cart_count(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartCount>> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        CartCount { count: count.0 },
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_empty_cart_is_flat_fees_only() {
        let summary = summarize(0);
        assert_eq!(summary.subtotal, 0);
        assert_eq!(summary.discount, 0);
        assert_eq!(summary.shipping, FLAT_SHIPPING_FEE);
        assert_eq!(summary.tax, FIXED_TAX);
        assert_eq!(summary.total, FLAT_SHIPPING_FEE + FIXED_TAX);
        assert!(!summary.free_shipping_eligible);
    }

    #[test]
    fn shipping_is_zero_exactly_when_subtotal_exceeds_threshold() {
        assert_eq!(summarize(FREE_SHIPPING_THRESHOLD - 1).shipping, FLAT_SHIPPING_FEE);
        assert_eq!(summarize(FREE_SHIPPING_THRESHOLD).shipping, FLAT_SHIPPING_FEE);
        assert_eq!(summarize(FREE_SHIPPING_THRESHOLD + 1).shipping, 0);
    }

    #[test]
    fn eligibility_is_inclusive_at_the_threshold() {
        assert!(!summarize(FREE_SHIPPING_THRESHOLD - 1).free_shipping_eligible);
        assert!(summarize(FREE_SHIPPING_THRESHOLD).free_shipping_eligible);
    }

    #[test]
    fn total_is_subtotal_minus_discount_plus_shipping_plus_tax() {
        for subtotal in [0, 1, 499, 999, 1000, 1001, 250_000] {
            let s = summarize(subtotal);
            assert_eq!(s.total, s.subtotal - s.discount + s.shipping + s.tax);
        }
    }
}
