use chrono::{DateTime, Utc};
use rollcall_core::MemberId;
use serde::{Deserialize, Serialize};

/// Member record in the directory.
///
/// A member holds one position (role label). Several records may share a
/// position, and a record with an empty `name` is a vacant seat: it is left
/// out of the position list but can still receive a card.
///
/// # Database Schema
///
/// Maps to the `members` table:
/// - `rfid_tag` is unique when present
/// - `in_office` is the "currently present" flag
///
/// # Examples
///
/// ```
/// use rollcall_storage::models::Member;
/// use chrono::Utc;
///
/// let member = Member {
///     id: 1,
///     name: "Ada Lovelace".to_string(),
///     position: "Treasurer".to_string(),
///     rfid_tag: Some("123456".to_string()),
///     in_office: false,
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
/// };
///
/// assert_eq!(member.first_name(), "Ada");
/// assert_eq!(member.label(), "Ada Lovelace (Treasurer)");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    /// Auto-increment primary key
    pub id: MemberId,

    /// Display name; empty for a vacant seat
    pub name: String,

    /// Position or role label
    pub position: String,

    /// Bound card identifier
    pub rfid_tag: Option<String>,

    /// Whether the member is currently signed in
    pub in_office: bool,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,

    /// Record last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// First whitespace-separated token of the name, used in greetings.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or_default()
    }

    /// Whether the record is a vacant seat.
    pub fn is_vacant(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// `name (position)`, the form used in summaries and notifications.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.position)
    }
}

/// Fields for a new member record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewMember {
    pub name: String,
    pub position: String,
    pub rfid_tag: Option<String>,
}

impl NewMember {
    pub fn new(name: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
            rfid_tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.rfid_tag = Some(tag.into());
        self
    }
}

/// Partial update of a member record. `None` leaves a field untouched.
///
/// `rfid_tag` is doubly optional: `Some(None)` clears the binding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub position: Option<String>,
    pub rfid_tag: Option<Option<String>>,
    pub in_office: Option<bool>,
}

impl MemberUpdate {
    /// Set only the presence flag.
    pub fn presence(in_office: bool) -> Self {
        Self {
            in_office: Some(in_office),
            ..Default::default()
        }
    }

    /// Bind a card, or clear the binding with `None`.
    pub fn tag(tag: Option<String>) -> Self {
        Self {
            rfid_tag: Some(tag),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.position.is_none()
            && self.rfid_tag.is_none()
            && self.in_office.is_none()
    }
}
