use chrono::{DateTime, Utc};
use rollcall_core::{MemberId, SessionId};
use serde::{Deserialize, Serialize};

/// One sign-in/sign-out interval.
///
/// A session with `sign_out_time == None` is active. At most one active
/// session per member is maintained by the session controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: SessionId,
    pub member_id: MemberId,
    pub sign_in_time: DateTime<Utc>,
    pub sign_out_time: Option<DateTime<Utc>>,
    /// Length in hours, set when the session is closed
    pub duration: Option<f64>,
    pub message: Option<String>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.sign_out_time.is_none()
    }

    /// Hours elapsed between sign-in and `now`.
    pub fn elapsed_hours(&self, now: DateTime<Utc>) -> f64 {
        hours_between(self.sign_in_time, now)
    }
}

/// Fractional hours from `start` to `end`; negative spans count as zero.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds().max(0);
    millis as f64 / 3_600_000.0
}

/// Fields for opening a session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub member_id: MemberId,
    pub sign_in_time: DateTime<Utc>,
    pub message: Option<String>,
}

/// Fields written when a session is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClose {
    pub sign_out_time: DateTime<Utc>,
    pub duration: f64,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_hours_between() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        assert_eq!(hours_between(start, start + Duration::minutes(150)), 2.5);
        assert_eq!(hours_between(start, start), 0.0);
        assert_eq!(hours_between(start, start - Duration::hours(1)), 0.0);
    }

    #[test]
    fn test_session_active() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let mut session = Session {
            id: 1,
            member_id: 1,
            sign_in_time: start,
            sign_out_time: None,
            duration: None,
            message: None,
        };
        assert!(session.is_active());
        assert_eq!(session.elapsed_hours(start + Duration::minutes(45)), 0.75);

        session.sign_out_time = Some(start + Duration::hours(1));
        assert!(!session.is_active());
    }
}
