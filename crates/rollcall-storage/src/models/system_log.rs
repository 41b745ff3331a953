use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator log text flushed from the kiosk after the nightly sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SystemLog {
    pub id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
