use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
};

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatReply {
    pub response: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/response", post(chat_response))
}

#[utoipa::path(
    post,
    path = "/api/chatbot/response",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ApiResponse<ChatReply>),
        (status = 400, description = "Missing message"),
        (status = 500, description = "Upstream failure"),
    ),
    tag = "Chatbot"
)]
pub async fn chat_response(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> AppResult<Json<ApiResponse<ChatReply>>> {
    if payload.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message is required".into()));
    }

    let api_key = state
        .config
        .gemini_api_key
        .clone()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("GEMINI_API_KEY is not set")))?;

    let body = serde_json::json!({
        "contents": [{ "parts": [{ "text": support_prompt(&payload.message) }] }]
    });

    let upstream = state
        .http
        .post(GEMINI_ENDPOINT)
        .query(&[("key", api_key.as_str())])
        .json(&body)
        .send()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    let status = upstream.status();
    if !status.is_success() {
        return Err(AppError::Internal(anyhow::anyhow!(
            "chat upstream returned {status}"
        )));
    }

    let reply: serde_json::Value = upstream
        .json()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    let response = reply["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unexpected upstream response shape")))?
        .to_string();

    Ok(Json(ApiResponse::success(
        "OK",
        ChatReply { response },
        None,
    )))
}

fn support_prompt(message: &str) -> String {
    format!(
        r#"You are a helpful customer support assistant for Modern Mart, an e-commerce store specializing in premium interview outfits including formal shirts, pants, ties, watches, bags, socks, and shoes.

Key information about Modern Mart:
- Free shipping on orders above ₹999 across India
- Delivery typically takes 3-7 business days
- 30-day return policy (items must be in original condition with tags)
- Products range from ₹499 to ₹2999
- Support email: support@modernmart.com
- Support phone: +91 1800-123-4567
- Wide range of premium interview outfits

Customer message: "{message}"

Please provide a helpful, friendly, and concise response as a customer support assistant. Keep responses professional and focused on assisting with their query."#
    )
}
