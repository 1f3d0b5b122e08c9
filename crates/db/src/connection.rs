use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

/// Opens the registration database, creating the file when it does not exist.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use super::connect_with_settings;

    #[tokio::test]
    async fn in_memory_pool_answers_queries() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        let (one,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.expect("query");
        assert_eq!(one, 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn rejects_non_sqlite_urls() {
        assert!(connect_with_settings("postgres://localhost/wb", 1, 5).await.is_err());
    }
}
