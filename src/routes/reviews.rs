use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

/// Review joined with the reviewer's name.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ReviewDto {
    pub id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewList {
    pub items: Vec<ReviewDto>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{slug}", get(list_reviews).post(create_review))
}

#[utoipa::path(
    get,
    path = "/api/reviews/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Reviews for the product, newest first", body = ApiResponse<ReviewList>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(pool): State<DbPool>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let product_id = product_id_by_slug(&pool, &slug).await?;

    let items: Vec<ReviewDto> = sqlx::query_as(
        r#"
        SELECT r.id, r.rating, r.comment, r.created_at, u.first_name, u.last_name
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        WHERE r.product_id = $1
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(product_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/reviews/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Review submitted", body = ApiResponse<Review>),
        (status = 400, description = "Rating out of range"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".into(),
        ));
    }

    let product_id = product_id_by_slug(&pool, &slug).await?;

    let review: Review = sqlx::query_as(
        r#"
        INSERT INTO reviews (product_id, user_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(user.user_id)
    .bind(payload.rating)
    .bind(payload.comment.as_deref())
    .fetch_one(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Review submitted successfully",
        review,
        None,
    )))
}

async fn product_id_by_slug(pool: &DbPool, slug: &str) -> AppResult<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    match row {
        Some((id,)) => Ok(id),
        None => Err(AppError::NotFound),
    }
}
