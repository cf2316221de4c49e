use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::{post, put},
};
use chrono::Utc;
use serde::Deserialize;
use tokio::fs;
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    dto::auth::UserProfile,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const ALLOWED_AVATAR_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", put(update_profile).delete(delete_profile))
        .route("/avatar", post(upload_avatar))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<UserProfile>),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email already in use"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update_profile(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let UpdateProfileRequest {
        first_name,
        last_name,
        email,
        phone,
    } = payload;

    if [&first_name, &last_name, &email, &phone]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(AppError::BadRequest("All fields are required".into()));
    }

    let taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id != $2")
        .bind(email.as_str())
        .bind(user.user_id)
        .fetch_optional(&pool)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(
            "Email is already in use by another user".into(),
        ));
    }

    let updated: User = sqlx::query_as(
        r#"
        UPDATE users
        SET first_name = $2, last_name = $3, email = $4, phone = $5,
            updated_at = datetime('now')
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(phone)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ApiResponse::success("Profile updated", updated.into(), None)))
}

#[utoipa::path(
    post,
    path = "/api/profile/avatar",
    responses(
        (status = 200, description = "Avatar stored and profile updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "No file or unsupported type"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("avatar") {
            continue;
        }

        let extension = field
            .file_name()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| ALLOWED_AVATAR_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| {
                AppError::BadRequest("Only image files (JPEG, PNG, GIF) are allowed".into())
            })?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let filename = format!(
            "avatar_{}_{}.{extension}",
            user.user_id,
            Utc::now().timestamp_millis()
        );
        fs::create_dir_all(&state.config.avatars_dir)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        let path = format!("{}/{filename}", state.config.avatars_dir);
        fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let avatar_url = format!("/api/avatars/{filename}");
        let updated: User = sqlx::query_as(
            "UPDATE users SET avatar_url = $2, updated_at = datetime('now') WHERE id = $1 RETURNING *",
        )
        .bind(user.user_id)
        .bind(avatar_url)
        .fetch_one(&state.pool)
        .await?;

        return Ok(Json(ApiResponse::success(
            "Avatar uploaded successfully",
            updated.into(),
            None,
        )));
    }

    Err(AppError::BadRequest("No file uploaded".into()))
}

#[utoipa::path(
    delete,
    path = "/api/profile",
    responses(
        (status = 200, description = "Account deleted", body = ApiResponse<serde_json::Value>)
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn delete_profile(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    // Dependent rows (cart, wishlist, orders, reviews, otps, tokens) cascade.
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.user_id)
        .execute(&pool)
        .await?;

    Ok(Json(ApiResponse::success(
        "User profile deleted successfully",
        serde_json::json!({ "deleted": true }),
        Some(Meta::empty()),
    )))
}
