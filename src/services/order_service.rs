use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::{
    db::DbPool,
    dto::orders::{CreateOrderRequest, OrderCreated, OrderItemDto, OrderList, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Order,
    response::{ApiResponse, Meta},
};

pub async fn list_orders(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.user_id)
            .fetch_all(pool)
            .await?;

    let total = orders.len() as i64;
    Ok(ApiResponse::success(
        "OK",
        OrderList { items: orders },
        Some(Meta::new(1, total.max(1), total)),
    ))
}

pub async fn get_order(
    pool: &DbPool,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.user_id)
            .fetch_optional(pool)
            .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    #[derive(FromRow)]
    struct ItemRow {
        id: i64,
        product_id: i64,
        product_name: String,
        quantity: i32,
        price: i64,
        created_at: DateTime<Utc>,
    }

    let rows: Vec<ItemRow> = sqlx::query_as(
        r#"
        SELECT oi.id, oi.product_id, oi.quantity, oi.price, oi.created_at,
               p.name AS product_name
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = $1
        "#,
    )
    .bind(order.id)
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| OrderItemDto {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            price: row.price,
            created_at: row.created_at,
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

/// Insert the order and all its line items in one transaction. Any failure
/// mid-loop rolls everything back; there is no partial order.
pub async fn create_order(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderCreated>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order items are required".into()));
    }
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".into(),
            ));
        }
        if item.price < 0 {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
    }

    let mut tx = pool.begin().await?;

    let order_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO orders (user_id, shipping_address, payment_method, status)
        VALUES ($1, $2, $3, 'Pending')
        RETURNING id
        "#,
    )
    .bind(user.user_id)
    .bind(payload.shipping_address.as_deref())
    .bind(payload.payment_method.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    for item in &payload.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(order_id, user_id = user.user_id, "order created");
    Ok(ApiResponse::success(
        "Order created successfully",
        OrderCreated { order_id },
        Some(Meta::empty()),
    ))
}
