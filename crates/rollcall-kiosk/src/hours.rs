//! Weekly hours check.
//!
//! Totals a member's attendance since Monday 00:00 local time. Closed
//! sessions contribute their stored duration, so auto-signed-out sessions
//! count as zero. The active session contributes the time elapsed since it
//! started (or since the start of the week, whichever is later) and is
//! counted exactly once.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveTime, Utc};
use tracing::debug;

use rollcall_core::{CardId, Error, Result};
use rollcall_storage::models::session::hours_between;
use rollcall_storage::{AttendanceStore, Member};

use crate::messages;

/// Monday 00:00 of the week containing `now`, in the same offset.
pub fn week_start(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let days_back = u64::from(now.weekday().num_days_from_monday());
    let monday = now
        .date_naive()
        .checked_sub_days(Days::new(days_back))
        .unwrap_or_else(|| now.date_naive())
        .and_time(NaiveTime::MIN);
    monday
        .and_local_timezone(*now.offset())
        .earliest()
        .unwrap_or(now)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoursReport {
    pub member: Member,
    pub week_start: DateTime<FixedOffset>,
    /// Closed sessions plus the running one.
    pub total_hours: f64,
    /// Start of the running session, local time.
    pub active_since: Option<DateTime<FixedOffset>>,
    /// Hours elapsed in the running session.
    pub current_hours: Option<f64>,
}

impl HoursReport {
    /// Lines for the hours screen.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Member: {}", self.member.label())];

        if self.total_hours <= 0.0 && self.active_since.is_none() {
            lines.push(messages::no_hours(&self.member.name));
            return lines;
        }

        lines.push(format!("Current Week Hours: {:.2}", self.total_hours));
        if let (Some(since), Some(current)) = (self.active_since, self.current_hours) {
            lines.push(format!("Signed in at: {}", messages::clock_time(&since)));
            lines.push(format!("Current duration: {current:.2} hours"));
        }
        lines
    }
}

/// Hours of the member carrying `card` for the week containing `now`.
///
/// # Errors
///
/// `Error::UnknownCard` if no member carries the card,
/// `Error::StoreUnavailable` on store failures.
pub async fn weekly_hours<S: AttendanceStore>(
    store: &S,
    card: &CardId,
    now: DateTime<FixedOffset>,
) -> Result<HoursReport> {
    let member = store
        .find_member_by_card(card)
        .await
        .map_err(Error::store)?
        .ok_or_else(|| Error::UnknownCard(card.to_string()))?;

    let start = week_start(now);
    let start_utc = start.with_timezone(&Utc);
    let now_utc = now.with_timezone(&Utc);

    let sessions = store
        .list_sessions_since(member.id, start_utc)
        .await
        .map_err(Error::store)?;
    let closed_hours: f64 = sessions
        .iter()
        .filter_map(|session| match (session.sign_out_time, session.duration) {
            (Some(_), Some(duration)) => Some(duration),
            (Some(end), None) => Some(hours_between(session.sign_in_time, end)),
            (None, _) => None,
        })
        .sum();

    let active = store
        .find_active_session(member.id)
        .await
        .map_err(Error::store)?;
    let (active_since, current_hours) = match &active {
        Some(session) => {
            let counted_from = session.sign_in_time.max(start_utc);
            (
                Some(session.sign_in_time.with_timezone(now.offset())),
                Some(hours_between(counted_from, now_utc)),
            )
        }
        None => (None, None),
    };

    let total_hours = closed_hours + current_hours.unwrap_or(0.0);
    debug!(
        member_id = member.id,
        sessions = sessions.len(),
        total_hours,
        "weekly hours computed"
    );

    Ok(HoursReport {
        member,
        week_start: start,
        total_hours,
        active_since,
        current_hours,
    })
}
