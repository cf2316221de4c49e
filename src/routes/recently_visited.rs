use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::product_service::{discount_percentage, parse_size_chart},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentlyVisitedDto {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub discount_percentage: i64,
    pub stock_quantity: i32,
    pub size_chart: Vec<String>,
    pub image_url: Option<String>,
    pub visited_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentlyVisitedList {
    pub items: Vec<RecentlyVisitedDto>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recently_visited))
        .route("/{product_id}", post(record_visit))
}

#[utoipa::path(
    get,
    path = "/api/recently-visited",
    responses(
        (status = 200, description = "Recently viewed products, newest visit first", body = ApiResponse<RecentlyVisitedList>)
    ),
    security(("bearer_auth" = [])),
    tag = "RecentlyVisited"
)]
pub async fn list_recently_visited(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<RecentlyVisitedList>>> {
    #[derive(FromRow)]
    struct Row {
        id: i64,
        product_id: i64,
        product_name: String,
        price: i64,
        original_price: Option<i64>,
        stock_quantity: i32,
        size_chart: Option<String>,
        image_url: Option<String>,
        visited_at: DateTime<Utc>,
    }

    let rows: Vec<Row> = sqlx::query_as(
        r#"
        SELECT rv.id, rv.product_id, rv.visited_at,
               p.name AS product_name, p.price, p.original_price,
               p.stock_quantity, p.size_chart,
               (SELECT pi.image_url FROM product_images pi
                WHERE pi.product_id = p.id ORDER BY pi.id LIMIT 1) AS image_url
        FROM recently_visited rv
        JOIN products p ON p.id = rv.product_id
        WHERE rv.user_id = $1
        ORDER BY rv.visited_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| RecentlyVisitedDto {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            discount_percentage: discount_percentage(row.price, row.original_price),
            price: row.price,
            original_price: row.original_price,
            stock_quantity: row.stock_quantity,
            size_chart: parse_size_chart(row.size_chart.as_deref()),
            image_url: row.image_url,
            visited_at: row.visited_at,
        })
        .collect();

    Ok(Json(ApiResponse::success(
        "OK",
        RecentlyVisitedList { items },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/recently-visited/{product_id}",
    params(("product_id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Visit recorded (or its timestamp bumped)", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "RecentlyVisited"
)]
pub async fn record_visit(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let exist: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&pool)
        .await?;
    if exist.is_none() {
        return Err(AppError::NotFound);
    }

    sqlx::query(
        r#"
        INSERT INTO recently_visited (user_id, product_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, product_id) DO UPDATE SET visited_at = datetime('now')
        "#,
    )
    .bind(user.user_id)
    .bind(product_id)
    .execute(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Product added to recently visited",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}
