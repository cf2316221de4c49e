use std::path::Path;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::fs;

pub type DbPool = sqlx::SqlitePool;

/// Open (and create, if missing) the SQLite database at `path`.
///
/// Foreign keys are enforced per connection; the order transaction and the
/// cascade deletes in the schema rely on it.
pub async fn create_pool(path: &str) -> Result<DbPool> {
    if let Some(dir) = Path::new(path).parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).await?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
