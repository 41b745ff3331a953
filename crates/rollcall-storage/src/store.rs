//! The member directory and session store as one capability.
//!
//! Controllers depend on [`AttendanceStore`] rather than on individual
//! repositories so tests can wrap or replace the whole store (for example to
//! inject failures). Every call goes straight to the database; nothing is
//! cached.

#![allow(async_fn_in_trait)]

use crate::connection::Database;
use crate::error::StorageResult;
use crate::models::{Member, MemberUpdate, NewMember, NewSession, Session, SessionClose};
use crate::repositories::{
    MemberRepository, SessionRepository, SqliteMemberRepository, SqliteSessionRepository,
    SqliteSystemLogRepository, SystemLogRepository,
};
use crate::transaction;
use chrono::{DateTime, Utc};
use rollcall_core::{CardId, MemberId, SessionId};
use sqlx::SqlitePool;
use tracing::{debug, warn};

/// Operations the kiosk core performs against persistent storage.
pub trait AttendanceStore: Send + Sync {
    /// Member bound to the card, if any.
    async fn find_member_by_card(&self, card: &CardId) -> StorageResult<Option<Member>>;

    async fn find_member_by_id(&self, id: MemberId) -> StorageResult<Option<Member>>;

    /// The member's session with no sign-out time.
    async fn find_active_session(&self, member_id: MemberId) -> StorageResult<Option<Session>>;

    /// Every record holding `position`, vacant seats included, oldest first.
    async fn list_members_by_position(&self, position: &str) -> StorageResult<Vec<Member>>;

    /// Positions of named members in first-seen order, without duplicates.
    async fn list_distinct_positions(&self) -> StorageResult<Vec<String>>;

    /// Returns `false` if the member does not exist.
    async fn update_member_fields(
        &self,
        id: MemberId,
        update: &MemberUpdate,
    ) -> StorageResult<bool>;

    async fn create_session(&self, session: &NewSession) -> StorageResult<Session>;

    /// Close a still-open session. Returns `false` if it was already closed.
    async fn close_session(&self, id: SessionId, close: &SessionClose) -> StorageResult<bool>;

    /// Members whose presence flag is set.
    async fn list_present_members(&self) -> StorageResult<Vec<Member>>;

    async fn append_system_log(&self, text: &str) -> StorageResult<bool>;

    /// Sessions of a member that started at or after `since`.
    async fn list_sessions_since(
        &self,
        member_id: MemberId,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<Session>>;

    async fn create_member(&self, member: &NewMember) -> StorageResult<Member>;

    /// Bind `card` to member `to`, clearing it from `from` in the same
    /// transaction. Returns `false`, with nothing written, if `to` does not
    /// exist.
    async fn rebind_tag(
        &self,
        from: Option<MemberId>,
        to: MemberId,
        card: &CardId,
    ) -> StorageResult<bool>;
}

/// SQLite-backed store sharing one connection pool.
#[derive(Debug, Clone)]
pub struct SqliteAttendanceStore {
    pool: SqlitePool,
    members: SqliteMemberRepository,
    sessions: SqliteSessionRepository,
    logs: SqliteSystemLogRepository,
}

impl SqliteAttendanceStore {
    pub fn new(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            members: SqliteMemberRepository::new(pool.clone()),
            sessions: SqliteSessionRepository::new(pool.clone()),
            logs: SqliteSystemLogRepository::new(pool.clone()),
            pool,
        }
    }
}

impl AttendanceStore for SqliteAttendanceStore {
    async fn find_member_by_card(&self, card: &CardId) -> StorageResult<Option<Member>> {
        self.members.find_by_tag(card.as_str()).await
    }

    async fn find_member_by_id(&self, id: MemberId) -> StorageResult<Option<Member>> {
        self.members.find_by_id(id).await
    }

    async fn find_active_session(&self, member_id: MemberId) -> StorageResult<Option<Session>> {
        self.sessions.find_active(member_id).await
    }

    async fn list_members_by_position(&self, position: &str) -> StorageResult<Vec<Member>> {
        self.members.find_by_position(position).await
    }

    async fn list_distinct_positions(&self) -> StorageResult<Vec<String>> {
        self.members.distinct_positions().await
    }

    async fn update_member_fields(
        &self,
        id: MemberId,
        update: &MemberUpdate,
    ) -> StorageResult<bool> {
        let updated = self.members.update(id, update).await?;
        if !updated {
            warn!(member_id = id, "member update matched no record");
        }
        Ok(updated)
    }

    async fn create_session(&self, session: &NewSession) -> StorageResult<Session> {
        let created = self.sessions.create(session).await?;
        debug!(
            session_id = created.id,
            member_id = created.member_id,
            "session opened"
        );
        Ok(created)
    }

    async fn close_session(&self, id: SessionId, close: &SessionClose) -> StorageResult<bool> {
        let closed = self.sessions.close(id, close).await?;
        debug!(session_id = id, closed, duration = close.duration, "session close");
        Ok(closed)
    }

    async fn list_present_members(&self) -> StorageResult<Vec<Member>> {
        self.members.find_present().await
    }

    async fn append_system_log(&self, text: &str) -> StorageResult<bool> {
        self.logs.append(text).await?;
        Ok(true)
    }

    async fn list_sessions_since(
        &self,
        member_id: MemberId,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<Session>> {
        self.sessions.find_since(member_id, since).await
    }

    async fn create_member(&self, member: &NewMember) -> StorageResult<Member> {
        self.members.create(member).await
    }

    async fn rebind_tag(
        &self,
        from: Option<MemberId>,
        to: MemberId,
        card: &CardId,
    ) -> StorageResult<bool> {
        let tx = self.pool.begin().await?;
        let bound = transaction::rebind_tag(tx, from, to, card.as_str()).await?;
        if !bound {
            warn!(member_id = to, "tag rebind matched no record, rolled back");
        }
        Ok(bound)
    }
}
