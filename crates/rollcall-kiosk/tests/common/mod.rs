//! Shared fixtures for the kiosk integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, Utc};
use rollcall_core::{CardId, MemberId, SessionId};
use rollcall_storage::{
    AttendanceStore, Database, Member, MemberUpdate, NewMember, NewSession, Session,
    SessionClose, SqliteAttendanceStore, StorageError, StorageResult,
};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FindMemberByCard,
    FindMemberById,
    FindActiveSession,
    ListMembersByPosition,
    ListDistinctPositions,
    UpdateMember,
    CreateSession,
    CloseSession,
    ListPresentMembers,
    AppendSystemLog,
    ListSessionsSince,
}

/// SQLite store with failure injection, per operation or per member.
#[derive(Debug)]
pub struct FlakyStore {
    inner: SqliteAttendanceStore,
    failing_ops: Mutex<HashSet<Op>>,
    failing_members: Mutex<HashSet<MemberId>>,
    tap_wins_close: Mutex<bool>,
}

impl FlakyStore {
    pub fn new(inner: SqliteAttendanceStore) -> Self {
        Self {
            inner,
            failing_ops: Mutex::new(HashSet::new()),
            failing_members: Mutex::new(HashSet::new()),
            tap_wins_close: Mutex::new(false),
        }
    }

    pub fn fail(&self, op: Op) {
        self.failing_ops.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.failing_ops.lock().unwrap().remove(&op);
    }

    /// Fail every member-scoped operation for `id`.
    pub fn fail_member(&self, id: MemberId) {
        self.failing_members.lock().unwrap().insert(id);
    }

    /// Close the session with an ordinary sign-out just before the next
    /// `close_session` call, as if a tap had got there first.
    pub fn let_tap_win_next_close(&self) {
        *self.tap_wins_close.lock().unwrap() = true;
    }

    pub fn heal_member(&self, id: MemberId) {
        self.failing_members.lock().unwrap().remove(&id);
    }

    fn check(&self, op: Op, member: Option<MemberId>) -> StorageResult<()> {
        if self.failing_ops.lock().unwrap().contains(&op) {
            return Err(StorageError::Configuration(format!("injected failure: {op:?}")));
        }
        if let Some(id) = member
            && self.failing_members.lock().unwrap().contains(&id)
        {
            return Err(StorageError::Configuration(format!(
                "injected failure for member {id}: {op:?}"
            )));
        }
        Ok(())
    }
}

impl AttendanceStore for FlakyStore {
    async fn find_member_by_card(&self, card: &CardId) -> StorageResult<Option<Member>> {
        self.check(Op::FindMemberByCard, None)?;
        self.inner.find_member_by_card(card).await
    }

    async fn find_member_by_id(&self, id: MemberId) -> StorageResult<Option<Member>> {
        self.check(Op::FindMemberById, Some(id))?;
        self.inner.find_member_by_id(id).await
    }

    async fn find_active_session(&self, member_id: MemberId) -> StorageResult<Option<Session>> {
        self.check(Op::FindActiveSession, Some(member_id))?;
        self.inner.find_active_session(member_id).await
    }

    async fn list_members_by_position(&self, position: &str) -> StorageResult<Vec<Member>> {
        self.check(Op::ListMembersByPosition, None)?;
        self.inner.list_members_by_position(position).await
    }

    async fn list_distinct_positions(&self) -> StorageResult<Vec<String>> {
        self.check(Op::ListDistinctPositions, None)?;
        self.inner.list_distinct_positions().await
    }

    async fn update_member_fields(
        &self,
        id: MemberId,
        update: &MemberUpdate,
    ) -> StorageResult<bool> {
        self.check(Op::UpdateMember, Some(id))?;
        self.inner.update_member_fields(id, update).await
    }

    async fn create_session(&self, session: &NewSession) -> StorageResult<Session> {
        self.check(Op::CreateSession, Some(session.member_id))?;
        self.inner.create_session(session).await
    }

    async fn close_session(&self, id: SessionId, close: &SessionClose) -> StorageResult<bool> {
        self.check(Op::CloseSession, None)?;
        let tap_first = std::mem::take(&mut *self.tap_wins_close.lock().unwrap());
        if tap_first {
            let tap = SessionClose {
                sign_out_time: close.sign_out_time,
                duration: 1.0,
                message: Some("Signed Out".to_string()),
            };
            self.inner.close_session(id, &tap).await?;
        }
        self.inner.close_session(id, close).await
    }

    async fn list_present_members(&self) -> StorageResult<Vec<Member>> {
        self.check(Op::ListPresentMembers, None)?;
        self.inner.list_present_members().await
    }

    async fn append_system_log(&self, text: &str) -> StorageResult<bool> {
        self.check(Op::AppendSystemLog, None)?;
        self.inner.append_system_log(text).await
    }

    async fn list_sessions_since(
        &self,
        member_id: MemberId,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<Session>> {
        self.check(Op::ListSessionsSince, Some(member_id))?;
        self.inner.list_sessions_since(member_id, since).await
    }

    async fn create_member(&self, member: &NewMember) -> StorageResult<Member> {
        self.inner.create_member(member).await
    }

    // one transaction: any failing party fails the whole rebind before a write
    async fn rebind_tag(
        &self,
        from: Option<MemberId>,
        to: MemberId,
        card: &CardId,
    ) -> StorageResult<bool> {
        if let Some(from) = from {
            self.check(Op::UpdateMember, Some(from))?;
        }
        self.check(Op::UpdateMember, Some(to))?;
        self.inner.rebind_tag(from, to, card).await
    }
}

pub async fn setup() -> (Database, Arc<FlakyStore>) {
    let db = Database::in_memory().await.unwrap();
    let store = Arc::new(FlakyStore::new(SqliteAttendanceStore::new(&db)));
    (db, store)
}

pub async fn add_member(
    store: &FlakyStore,
    name: &str,
    position: &str,
    tag: Option<&str>,
) -> Member {
    let mut member = NewMember::new(name, position);
    member.rfid_tag = tag.map(str::to_string);
    store.create_member(&member).await.unwrap()
}

/// Open a session directly, bypassing the controller.
pub async fn sign_in_directly(store: &FlakyStore, member: &Member, at: DateTime<FixedOffset>) -> Session {
    let session = store
        .create_session(&NewSession {
            member_id: member.id,
            sign_in_time: at.with_timezone(&Utc),
            message: None,
        })
        .await
        .unwrap();
    store
        .update_member_fields(member.id, &MemberUpdate::presence(true))
        .await
        .unwrap();
    session
}

pub async fn reload(store: &FlakyStore, member: &Member) -> Member {
    store.find_member_by_id(member.id).await.unwrap().unwrap()
}

pub fn card(id: &str) -> CardId {
    CardId::new(id).unwrap()
}

/// Local time at UTC-5. 2026-03-02 is a Monday.
pub fn at(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}

pub fn monday(time: &str) -> DateTime<FixedOffset> {
    at(&format!("2026-03-02T{time}-05:00"))
}
