//! Storage layer for the rollcall attendance kiosk.
//!
//! This crate provides SQLite-backed persistence for the member directory,
//! attendance sessions and flushed operator logs, and exposes them to the
//! kiosk core through the [`AttendanceStore`] capability.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool manager with automatic migrations
//! - [`MemberRepository`], [`SessionRepository`], [`SystemLogRepository`] - Data access traits
//! - [`SqliteAttendanceStore`] - The store capability, composed from the repositories
//!
//! One pool is opened per process and shared by every component.
//!
//! # Examples
//!
//! ```no_run
//! use rollcall_core::CardId;
//! use rollcall_storage::{AttendanceStore, Database, DatabaseConfig, SqliteAttendanceStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("rollcall.db")).await?;
//! let store = SqliteAttendanceStore::new(&db);
//!
//! let card = CardId::new("123456")?;
//! if let Some(member) = store.find_member_by_card(&card).await? {
//!     let active = store.find_active_session(member.id).await?;
//!     println!("{} signed in: {}", member.name, active.is_some());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency
//!
//! At most one open session per member is kept by the session controller
//! with check-then-act; there is no uniqueness constraint for it. Closing a
//! session is a conditional update (`WHERE sign_out_time IS NULL`) so a tap
//! racing the nightly sweep closes the session exactly once. Moving a card
//! between members runs in one transaction ([`transaction::rebind_tag`]).
//!
//! All queries use parameterized statements via SQLx.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;
pub mod transaction;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{Member, MemberUpdate, NewMember, NewSession, Session, SessionClose, SystemLog};
pub use repositories::{
    MemberRepository, SessionRepository, SqliteMemberRepository, SqliteSessionRepository,
    SqliteSystemLogRepository, SystemLogRepository,
};
pub use store::{AttendanceStore, SqliteAttendanceStore};
