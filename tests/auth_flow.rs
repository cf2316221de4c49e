use std::str::FromStr;

use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use modern_mart_api::{
    db::{DbPool, run_migrations},
    dto::auth::{LoginRequest, RegisterRequest, VerifyOtpRequest},
    error::AppError,
    services::auth_service,
};

async fn setup_pool() -> anyhow::Result<DbPool> {
    // A single connection keeps the in-memory database alive for the test.
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

fn register_payload(email: &str) -> RegisterRequest {
    RegisterRequest {
        first_name: "Asha".into(),
        last_name: "Verma".into(),
        email: email.into(),
        phone: "+91 9876543210".into(),
        password: "correct horse".into(),
    }
}

#[tokio::test]
async fn duplicate_registration_returns_conflict() -> anyhow::Result<()> {
    let pool = setup_pool().await?;

    auth_service::register_user(&pool, register_payload("asha@example.com")).await?;

    let err = auth_service::register_user(&pool, register_payload("asha@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind("asha@example.com")
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 1, "conflict must not leave a duplicate row");

    Ok(())
}

#[tokio::test]
async fn register_rejects_missing_fields() -> anyhow::Result<()> {
    let pool = setup_pool().await?;

    let mut payload = register_payload("blank@example.com");
    payload.phone = "   ".into();
    let err = auth_service::register_user(&pool, payload).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn login_otp_and_token_flow() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    auth_service::register_user(&pool, register_payload("asha@example.com")).await?;

    let err = auth_service::login_user(
        &pool,
        LoginRequest {
            email: "asha@example.com".into(),
            password: "wrong".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    auth_service::login_user(
        &pool,
        LoginRequest {
            email: "asha@example.com".into(),
            password: "correct horse".into(),
        },
    )
    .await?;

    let otp: String = sqlx::query_scalar("SELECT otp_code FROM otps ORDER BY id DESC LIMIT 1")
        .fetch_one(&pool)
        .await?;
    assert_eq!(otp.len(), 6);

    // The real OTP is random; skip the mismatch probe on the off chance it is 000000.
    if otp != "000000" {
        let err = auth_service::verify_otp(
            &pool,
            VerifyOtpRequest {
                email: "asha@example.com".into(),
                otp: "000000".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    let resp = auth_service::verify_otp(
        &pool,
        VerifyOtpRequest {
            email: "asha@example.com".into(),
            otp: otp.clone(),
        },
    )
    .await?;
    let token = resp.data.expect("token payload").token;
    assert_eq!(token.len(), 64);

    let auth_user = auth_service::authenticate_token(&pool, &token).await?;
    let user_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind("asha@example.com")
        .fetch_one(&pool)
        .await?;
    assert_eq!(auth_user.user_id, user_id);

    Ok(())
}

#[tokio::test]
async fn expired_otp_is_rejected() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    auth_service::register_user(&pool, register_payload("asha@example.com")).await?;
    auth_service::login_user(
        &pool,
        LoginRequest {
            email: "asha@example.com".into(),
            password: "correct horse".into(),
        },
    )
    .await?;

    let otp: String = sqlx::query_scalar("SELECT otp_code FROM otps ORDER BY id DESC LIMIT 1")
        .fetch_one(&pool)
        .await?;
    sqlx::query("UPDATE otps SET expires_at = $1")
        .bind(Utc::now() - Duration::minutes(10))
        .execute(&pool)
        .await?;

    let err = auth_service::verify_otp(
        &pool,
        VerifyOtpRequest {
            email: "asha@example.com".into(),
            otp,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    auth_service::register_user(&pool, register_payload("asha@example.com")).await?;
    let user_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind("asha@example.com")
        .fetch_one(&pool)
        .await?;

    let token = auth_service::issue_token(&pool, user_id).await?;
    assert!(auth_service::authenticate_token(&pool, &token).await.is_ok());

    sqlx::query("UPDATE tokens SET expires_at = $1 WHERE token = $2")
        .bind(Utc::now() - Duration::hours(1))
        .bind(&token)
        .execute(&pool)
        .await?;

    let err = auth_service::authenticate_token(&pool, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = auth_service::authenticate_token(&pool, "not-a-token")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}
