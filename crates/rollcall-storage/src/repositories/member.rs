#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{Member, MemberUpdate, NewMember};
use rollcall_core::MemberId;
use sqlx::SqlitePool;

/// Repository trait for the member directory.
pub trait MemberRepository: Send + Sync {
    /// Find the member a card is bound to
    async fn find_by_tag(&self, tag: &str) -> StorageResult<Option<Member>>;

    /// Find a member by ID
    async fn find_by_id(&self, id: MemberId) -> StorageResult<Option<Member>>;

    /// Members holding a position, vacant seats included, oldest record first
    async fn find_by_position(&self, position: &str) -> StorageResult<Vec<Member>>;

    /// Distinct non-empty positions of named members, in first-seen order
    async fn distinct_positions(&self) -> StorageResult<Vec<String>>;

    /// Members currently flagged present
    async fn find_present(&self) -> StorageResult<Vec<Member>>;

    /// Apply a partial update. Returns `false` if no record has this ID.
    async fn update(&self, id: MemberId, update: &MemberUpdate) -> StorageResult<bool>;

    /// Create a member record
    async fn create(&self, member: &NewMember) -> StorageResult<Member>;
}

/// SQLite implementation of MemberRepository
#[derive(Debug, Clone)]
pub struct SqliteMemberRepository {
    pool: SqlitePool,
}

impl SqliteMemberRepository {
    /// Create a new SQLite member repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MemberRepository for SqliteMemberRepository {
    async fn find_by_tag(&self, tag: &str) -> StorageResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, name, position, rfid_tag, in_office, created_at, updated_at
            FROM members
            WHERE rfid_tag = ?
            "#,
        )
        .bind(tag)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    async fn find_by_id(&self, id: MemberId) -> StorageResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, name, position, rfid_tag, in_office, created_at, updated_at
            FROM members
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    async fn find_by_position(&self, position: &str) -> StorageResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, name, position, rfid_tag, in_office, created_at, updated_at
            FROM members
            WHERE position = ?
            ORDER BY id
            "#,
        )
        .bind(position)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn distinct_positions(&self) -> StorageResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT position
            FROM members
            WHERE TRIM(name) != '' AND TRIM(position) != ''
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut positions: Vec<String> = Vec::new();
        for (position,) in rows {
            if !positions.contains(&position) {
                positions.push(position);
            }
        }

        Ok(positions)
    }

    async fn find_present(&self) -> StorageResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, name, position, rfid_tag, in_office, created_at, updated_at
            FROM members
            WHERE in_office = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn update(&self, id: MemberId, update: &MemberUpdate) -> StorageResult<bool> {
        if update.is_empty() {
            return Err(StorageError::Validation(format!(
                "empty update for member {id}"
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE members
            SET name = COALESCE(?, name),
                position = COALESCE(?, position),
                rfid_tag = CASE WHEN ? THEN ? ELSE rfid_tag END,
                in_office = COALESCE(?, in_office),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.position)
        .bind(update.rfid_tag.is_some())
        .bind(update.rfid_tag.clone().flatten())
        .bind(update.in_office)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create(&self, member: &NewMember) -> StorageResult<Member> {
        let created = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (name, position, rfid_tag)
            VALUES (?, ?, ?)
            RETURNING id, name, position, rfid_tag, in_office, created_at, updated_at
            "#,
        )
        .bind(member.name.trim())
        .bind(member.position.trim())
        .bind(&member.rfid_tag)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }
}
