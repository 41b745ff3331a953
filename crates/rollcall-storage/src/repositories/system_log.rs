#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::SystemLog;
use sqlx::SqlitePool;

/// Repository trait for flushed operator logs.
pub trait SystemLogRepository: Send + Sync {
    /// Append one log text
    async fn append(&self, message: &str) -> StorageResult<i64>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: i64) -> StorageResult<Vec<SystemLog>>;
}

/// SQLite implementation of SystemLogRepository
#[derive(Debug, Clone)]
pub struct SqliteSystemLogRepository {
    pool: SqlitePool,
}

impl SqliteSystemLogRepository {
    /// Create a new SQLite system log repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SystemLogRepository for SqliteSystemLogRepository {
    async fn append(&self, message: &str) -> StorageResult<i64> {
        let result = sqlx::query("INSERT INTO system_logs (message) VALUES (?)")
            .bind(message)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn recent(&self, limit: i64) -> StorageResult<Vec<SystemLog>> {
        let logs = sqlx::query_as::<_, SystemLog>(
            r#"
            SELECT id, message, created_at
            FROM system_logs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    #[tokio::test]
    async fn test_append_and_recent() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteSystemLogRepository::new(db.pool().clone());

        repo.append("first").await.unwrap();
        repo.append("second").await.unwrap();

        let logs = repo.recent(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "second");
        assert_eq!(logs[1].message, "first");
    }
}
