use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    models::Category,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{id}", get(get_category))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "All categories", body = ApiResponse<Vec<Category>>)
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(pool): State<DbPool>,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let categories: Vec<Category> = sqlx::query_as("SELECT * FROM categories ORDER BY name")
        .fetch_all(&pool)
        .await?;

    Ok(Json(ApiResponse::success(
        "Categories",
        categories,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Categories"
)]
pub async fn get_category(
    State(pool): State<DbPool>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let category: Option<Category> = sqlx::query_as("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    let category = match category {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    Ok(Json(ApiResponse::success("Category", category, None)))
}
