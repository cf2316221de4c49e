use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserStats {
    pub total_spent: i64,
    pub average_order_value: f64,
    pub favorite_category: Option<String>,
    pub last_order_date: Option<DateTime<Utc>>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(user_stats))
}

#[utoipa::path(
    get,
    path = "/api/users/stats",
    responses(
        (status = 200, description = "Spend statistics for the caller", body = ApiResponse<UserStats>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn user_stats(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserStats>>> {
    let total_spent: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(oi.price * oi.quantity), 0)
        FROM orders o
        JOIN order_items oi ON oi.order_id = o.id
        WHERE o.user_id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_one(&pool)
    .await?;

    let average_order_value: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT AVG(total) FROM (
            SELECT SUM(oi.price * oi.quantity) AS total
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            WHERE o.user_id = $1
            GROUP BY o.id
        )
        "#,
    )
    .bind(user.user_id)
    .fetch_one(&pool)
    .await?;

    let favorite_category: Option<String> = sqlx::query_scalar(
        r#"
        SELECT c.name
        FROM orders o
        JOIN order_items oi ON oi.order_id = o.id
        JOIN products p ON p.id = oi.product_id
        JOIN categories c ON c.id = p.category_id
        WHERE o.user_id = $1
        GROUP BY c.id
        ORDER BY SUM(oi.price * oi.quantity) DESC
        LIMIT 1
        "#,
    )
    .bind(user.user_id)
    .fetch_optional(&pool)
    .await?;

    let last_order_date: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT MAX(created_at) FROM orders WHERE user_id = $1")
            .bind(user.user_id)
            .fetch_one(&pool)
            .await?;

    let stats = UserStats {
        total_spent,
        average_order_value: average_order_value.unwrap_or(0.0),
        favorite_category,
        last_order_date,
    };

    Ok(Json(ApiResponse::success("OK", stats, None)))
}
