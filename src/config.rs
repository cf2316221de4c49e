use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub frontend_origin: String,
    pub images_dir: String,
    pub avatars_dir: String,
    pub gemini_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "database/modern_mart.db".to_string());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(5000);
        let frontend_origin =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let images_dir = env::var("IMAGES_DIR").unwrap_or_else(|_| "database/images".to_string());
        let avatars_dir = env::var("AVATARS_DIR").unwrap_or_else(|_| "images/avatars".to_string());
        let gemini_api_key = env::var("GEMINI_API_KEY").ok();
        Ok(Self {
            database_path,
            host,
            port,
            frontend_origin,
            images_dir,
            avatars_dir,
            gemini_api_key,
        })
    }
}
