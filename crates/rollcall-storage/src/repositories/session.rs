#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::{NewSession, Session, SessionClose};
use chrono::{DateTime, Utc};
use rollcall_core::{MemberId, SessionId};
use sqlx::SqlitePool;

/// Repository trait for attendance sessions.
pub trait SessionRepository: Send + Sync {
    /// The member's open session, newest first if several exist
    async fn find_active(&self, member_id: MemberId) -> StorageResult<Option<Session>>;

    /// Open a session
    async fn create(&self, session: &NewSession) -> StorageResult<Session>;

    /// Close a session that is still open.
    ///
    /// Returns `false` when the session does not exist or was already
    /// closed, so a tap and the nightly sweep cannot both close it.
    async fn close(&self, id: SessionId, close: &SessionClose) -> StorageResult<bool>;

    /// Sessions of a member signed in at or after `since`, oldest first
    async fn find_since(
        &self,
        member_id: MemberId,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<Session>>;
}

/// SQLite implementation of SessionRepository
#[derive(Debug, Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    /// Create a new SQLite session repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn find_active(&self, member_id: MemberId) -> StorageResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, member_id, sign_in_time, sign_out_time, duration, message
            FROM sessions
            WHERE member_id = ? AND sign_out_time IS NULL
            ORDER BY sign_in_time DESC
            LIMIT 1
            "#,
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn create(&self, session: &NewSession) -> StorageResult<Session> {
        let created = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (member_id, sign_in_time, message)
            VALUES (?, ?, ?)
            RETURNING id, member_id, sign_in_time, sign_out_time, duration, message
            "#,
        )
        .bind(session.member_id)
        .bind(session.sign_in_time)
        .bind(&session.message)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn close(&self, id: SessionId, close: &SessionClose) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET sign_out_time = ?, duration = ?, message = COALESCE(?, message)
            WHERE id = ? AND sign_out_time IS NULL
            "#,
        )
        .bind(close.sign_out_time)
        .bind(close.duration)
        .bind(&close.message)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_since(
        &self,
        member_id: MemberId,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, member_id, sign_in_time, sign_out_time, duration, message
            FROM sessions
            WHERE member_id = ? AND sign_in_time >= ?
            ORDER BY sign_in_time
            "#,
        )
        .bind(member_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::NewMember;
    use crate::repositories::{MemberRepository, SqliteMemberRepository};
    use chrono::{Duration, TimeZone};

    async fn setup() -> (SqliteSessionRepository, MemberId) {
        let db = Database::in_memory().await.unwrap();
        let members = SqliteMemberRepository::new(db.pool().clone());
        let member = members
            .create(&NewMember::new("Ada", "Treasurer"))
            .await
            .unwrap();
        (SqliteSessionRepository::new(db.pool().clone()), member.id)
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 3, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_active() {
        let (repo, member_id) = setup().await;

        assert!(repo.find_active(member_id).await.unwrap().is_none());

        let created = repo
            .create(&NewSession {
                member_id,
                sign_in_time: at(9, 0),
                message: None,
            })
            .await
            .unwrap();
        assert!(created.is_active());
        assert_eq!(created.sign_in_time, at(9, 0));

        let active = repo.find_active(member_id).await.unwrap().unwrap();
        assert_eq!(active.id, created.id);
    }

    #[tokio::test]
    async fn test_close_is_conditional() {
        let (repo, member_id) = setup().await;
        let session = repo
            .create(&NewSession {
                member_id,
                sign_in_time: at(9, 0),
                message: None,
            })
            .await
            .unwrap();

        let close = SessionClose {
            sign_out_time: at(11, 30),
            duration: 2.5,
            message: Some("Ada signed out".to_string()),
        };
        assert!(repo.close(session.id, &close).await.unwrap());
        assert!(!repo.close(session.id, &close).await.unwrap());
        assert!(!repo.close(9999, &close).await.unwrap());

        assert!(repo.find_active(member_id).await.unwrap().is_none());
        let history = repo.find_since(member_id, at(0, 0)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].duration, Some(2.5));
        assert_eq!(history[0].sign_out_time, Some(at(11, 30)));
        assert_eq!(history[0].message.as_deref(), Some("Ada signed out"));
    }

    #[tokio::test]
    async fn test_find_since_filters_by_sign_in() {
        let (repo, member_id) = setup().await;

        for start in [at(8, 0) - Duration::days(2), at(8, 0), at(13, 0)] {
            repo.create(&NewSession {
                member_id,
                sign_in_time: start,
                message: None,
            })
            .await
            .unwrap();
        }

        let sessions = repo.find_since(member_id, at(0, 0)).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].sign_in_time, at(8, 0));
        assert_eq!(sessions[1].sign_in_time, at(13, 0));
    }
}
