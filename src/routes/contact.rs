use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(submit_contact))
}

#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Submission stored", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Missing fields"),
    ),
    tag = "Contact"
)]
pub async fn submit_contact(
    State(pool): State<DbPool>,
    Json(payload): Json<ContactRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let ContactRequest {
        name,
        email,
        message,
    } = payload;

    if [&name, &email, &message].iter().any(|f| f.trim().is_empty()) {
        return Err(AppError::BadRequest(
            "Please provide name, email, and message.".into(),
        ));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO contact_messages (name, email, message) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name.as_str())
    .bind(email.as_str())
    .bind(message.as_str())
    .fetch_one(&pool)
    .await?;

    tracing::info!(contact_id = id, from = %email, "contact submission received");

    Ok(Json(ApiResponse::success(
        "Message sent successfully.",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    )))
}
