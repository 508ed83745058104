pub mod queries;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use queries::categories::Category;
pub use queries::questions::{NewQuestion, Question};

use sqlx::Error;

pub async fn establish_connection(path: &str) -> Result<SqlitePool, Error> {
    let options = SqliteConnectOptions::from_str(format!("sqlite:{}", path).as_str())?
        .create_if_missing(true);
    SqlitePool::connect_with(options).await
}

/// Private database living as long as the returned pool, used by tests.
///
/// Every sqlite in-memory connection opens a fresh database, so the pool is pinned to
/// one connection that is never recycled.
pub async fn in_memory() -> Result<SqlitePool, Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_seed_stock_categories() {
        let pool = in_memory().await.unwrap();
        let categories = queries::categories::get_all_categories(&pool).await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(
            names,
            ["Science", "Art", "Geography", "History", "Entertainment", "Sports"]
        );
    }

    #[tokio::test]
    async fn file_database_is_created_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trivia.db");
        let pool = establish_connection(path.to_str().unwrap()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        assert!(path.exists());
    }
}
