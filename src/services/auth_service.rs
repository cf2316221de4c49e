use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use password_hash::rand_core::OsRng;
use rand::{Rng, RngCore};
use sqlx::FromRow;

use crate::{
    db::DbPool,
    dto::auth::{LoginRequest, RegisterRequest, TokenResponse, UserProfile, VerifyOtpRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
};

const OTP_TTL_MINUTES: i64 = 5;
const TOKEN_TTL_HOURS: i64 = 24;

pub async fn register_user(
    pool: &DbPool,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    let RegisterRequest {
        first_name,
        last_name,
        email,
        phone,
        password,
    } = payload;

    if [&first_name, &last_name, &email, &phone, &password]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(AppError::BadRequest("All fields are required".into()));
    }

    let exist: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let password_hash = hash_password(&password)?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(email.as_str())
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .bind(phone)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = user.id, email = %user.email, "user registered");
    Ok(ApiResponse::success(
        "User registered successfully",
        user.into(),
        None,
    ))
}

/// Password step of login. On success an OTP is stored and surfaced through
/// the log, standing in for email delivery.
pub async fn login_user(
    pool: &DbPool,
    payload: LoginRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let LoginRequest { email, password } = payload;
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".into(),
        ));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    verify_password(&password, &user.password_hash)?;

    let otp = generate_otp();
    let expires_at = otp_expiry()?;
    sqlx::query("INSERT INTO otps (user_id, otp_code, expires_at) VALUES ($1, $2, $3)")
        .bind(user.id)
        .bind(otp.as_str())
        .bind(expires_at)
        .execute(pool)
        .await?;

    // Stand-in for email delivery.
    tracing::info!(email = %user.email, %otp, "login OTP issued");

    Ok(ApiResponse::success(
        "OTP sent to email (check server logs)",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn verify_otp(
    pool: &DbPool,
    payload: VerifyOtpRequest,
) -> AppResult<ApiResponse<TokenResponse>> {
    let VerifyOtpRequest { email, otp } = payload;
    if email.trim().is_empty() || otp.trim().is_empty() {
        return Err(AppError::BadRequest("Email and OTP are required".into()));
    }

    let user: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;
    let (user_id,) = match user {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    #[derive(FromRow)]
    struct OtpRow {
        otp_code: String,
        expires_at: DateTime<Utc>,
    }

    let record: Option<OtpRow> = sqlx::query_as(
        "SELECT otp_code, expires_at FROM otps WHERE user_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    let record = match record {
        Some(r) => r,
        None => {
            return Err(AppError::BadRequest(
                "OTP not found. Please request a new one.".into(),
            ));
        }
    };

    if record.expires_at < Utc::now() {
        return Err(AppError::BadRequest(
            "OTP expired. Please request a new one.".into(),
        ));
    }
    if record.otp_code != otp {
        return Err(AppError::BadRequest("Invalid OTP".into()));
    }

    let token = issue_token(pool, user_id).await?;
    Ok(ApiResponse::success(
        "Logged in",
        TokenResponse { token },
        Some(Meta::empty()),
    ))
}

/// Mint an opaque bearer token and persist it with its expiry.
pub async fn issue_token(pool: &DbPool, user_id: i64) -> AppResult<String> {
    let token = generate_token();
    let expires_at = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    sqlx::query("INSERT INTO tokens (user_id, token, expires_at) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(token.as_str())
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a bearer token to a user. Unknown and expired tokens are both
/// rejected with 403; expiry is compared against the current wall clock.
pub async fn authenticate_token(pool: &DbPool, token: &str) -> AppResult<AuthUser> {
    #[derive(FromRow)]
    struct TokenRow {
        user_id: i64,
        expires_at: DateTime<Utc>,
    }

    let record: Option<TokenRow> =
        sqlx::query_as("SELECT user_id, expires_at FROM tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(pool)
            .await?;

    let record = match record {
        Some(r) => r,
        None => return Err(AppError::Forbidden),
    };
    if record.expires_at < Utc::now() {
        return Err(AppError::Forbidden);
    }

    Ok(AuthUser {
        user_id: record.user_id,
    })
}

pub async fn get_profile(pool: &DbPool, user_id: i64) -> AppResult<ApiResponse<UserProfile>> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("OK", user.into(), None))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, password_hash: &str) -> AppResult<()> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid password".into()))?;
    Ok(())
}

fn generate_otp() -> String {
    rand::rng().random_range(100_000..1_000_000).to_string()
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn otp_expiry() -> AppResult<DateTime<Utc>> {
    Utc::now()
        .checked_add_signed(Duration::minutes(OTP_TTL_MINUTES))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..32 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).is_ok());
        assert!(verify_password("hunter3", &hash).is_err());
    }
}
