use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    db::DbPool,
    dto::auth::{LoginRequest, RegisterRequest, TokenResponse, UserProfile, VerifyOtpRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-otp", post(verify_otp))
        .route("/me", get(me))
}

// The original exposed the same flow under /api/login as well.
pub fn login_router() -> Router<AppState> {
    Router::new()
        .route("/", post(login))
        .route("/verify-otp", post(verify_otp))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Register user", body = ApiResponse<UserProfile>),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "Auth"
)]
pub async fn register(
    State(pool): State<DbPool>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = auth_service::register_user(&pool, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Password accepted, OTP issued", body = ApiResponse<serde_json::Value>),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "Unknown email"),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(pool): State<DbPool>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::login_user(&pool, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP accepted, bearer token issued", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Missing, expired, or wrong OTP"),
    ),
    tag = "Auth"
)]
pub async fn verify_otp(
    State(pool): State<DbPool>,
    Json(payload): Json<VerifyOtpRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let resp = auth_service::verify_otp(&pool, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user profile", body = ApiResponse<UserProfile>),
        (status = 403, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = auth_service::get_profile(&pool, user.user_id).await?;
    Ok(Json(resp))
}
