//! Member writes that must land together.
//!
//! Each function takes an open SQLite transaction, so several of them can be
//! grouped and committed (or dropped, which rolls back) as one unit.
//!
//! ```no_run
//! use rollcall_storage::{Database, DatabaseConfig, transaction};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("rollcall.db")).await?;
//!
//! // move card "999" from member 2 to member 7
//! let mut tx = db.pool().begin().await?;
//! transaction::set_tag(&mut tx, 2, None).await?;
//! if transaction::set_tag(&mut tx, 7, Some("999")).await? {
//!     tx.commit().await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::StorageResult;
use rollcall_core::MemberId;
use sqlx::{Sqlite, Transaction};

/// Set or clear a member's card. Returns `false` if the member does not exist.
///
/// # Errors
///
/// A unique violation if another member still holds `tag`.
pub async fn set_tag(
    tx: &mut Transaction<'_, Sqlite>,
    id: MemberId,
    tag: Option<&str>,
) -> StorageResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE members
        SET rfid_tag = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(tag)
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Move `tag` to member `to`, first clearing it from `from` when given.
///
/// Nothing is written unless the target exists and accepts the tag.
/// Returns `false` (after rolling back) if the target does not exist.
pub async fn rebind_tag(
    mut tx: Transaction<'_, Sqlite>,
    from: Option<MemberId>,
    to: MemberId,
    tag: &str,
) -> StorageResult<bool> {
    if let Some(from) = from.filter(|from| *from != to) {
        set_tag(&mut tx, from, None).await?;
    }

    if !set_tag(&mut tx, to, Some(tag)).await? {
        tx.rollback().await?;
        return Ok(false);
    }

    tx.commit().await?;
    Ok(true)
}
