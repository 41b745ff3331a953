//! Schedule controller: sleep/wake transitions and the daily auto-sign-out.
//!
//! [`ScheduleController::evaluate`] is called on a fixed interval (every
//! minute by default) with the current local time. Each call may:
//!
//! 1. run the auto-sign-out sweep, at most once per calendar day, when the
//!    kiosk was awake going into the tick and the clock reads `cutoff:00`;
//! 2. put the kiosk to sleep or wake it up.
//!
//! The sweep is checked before the sleep transition so that with the
//! default schedule (cutoff and sleep both at 20:00) the 20:00 tick still
//! signs everybody out before the kiosk sleeps.
//!
//! All schedule state lives in [`ScheduleState`], owned by the controller;
//! nothing is process-global, so tests drive the controller with arbitrary
//! timestamps.

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc, Weekday};
use tracing::{debug, error, info, warn};

use rollcall_core::config::ScheduleSettings;
use rollcall_core::{Error, MemberId, Result, TimeOfDay};
use rollcall_storage::{AttendanceStore, Member, MemberUpdate, SessionClose};

use crate::display::{ActivityLog, Tone};
use crate::messages;

/// When the kiosk sleeps and when the sweep runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub wake: TimeOfDay,
    pub sleep: TimeOfDay,
    /// Hour whose minute zero triggers the sweep.
    pub cutoff_hour: u8,
    pub weekend_days: Vec<Weekday>,
    pub bypass: bool,
    /// Persist and clear the activity log after each sweep.
    pub flush_logs: bool,
}

impl SchedulePolicy {
    /// # Errors
    ///
    /// `Error::Config` if a configured time is out of range.
    pub fn from_settings(settings: &ScheduleSettings) -> Result<Self> {
        Ok(Self {
            wake: settings.wake()?,
            sleep: settings.sleep()?,
            cutoff_hour: settings.cutoff()?.hour(),
            weekend_days: settings.weekend_days.clone(),
            bypass: settings.bypass,
            flush_logs: settings.flush_logs_after_sweep,
        })
    }

    /// Whether the kiosk should be asleep at `now`.
    pub fn is_sleep_time(&self, now: &DateTime<FixedOffset>) -> bool {
        if self.bypass {
            return false;
        }
        if self.weekend_days.contains(&now.weekday()) {
            return true;
        }

        let t = TimeOfDay::of(now);
        if self.wake <= self.sleep {
            t < self.wake || t >= self.sleep
        } else {
            // sleep interval inside one day, e.g. 01:00 to 05:00
            t >= self.sleep && t < self.wake
        }
    }

    fn is_sweep_minute(&self, now: &DateTime<FixedOffset>) -> bool {
        now.hour() == u32::from(self.cutoff_hour) && now.minute() == 0
    }
}

/// Process-local schedule state. Not persisted; a restart forgets the last
/// sweep date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleState {
    pub asleep: bool,
    pub last_auto_signout_date: Option<NaiveDate>,
    /// Set when the sweep fires; cleared by the first tick off minute zero.
    pub auto_signout_attempted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    FellAsleep,
    WokeUp,
}

/// A member the sweep could not process.
#[derive(Debug)]
pub struct SweepFailure {
    /// `None` when listing present members failed.
    pub member_id: Option<MemberId>,
    pub error: Error,
}

/// What one sweep did.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// `name (position)` of every member signed out.
    pub signed_out: Vec<String>,
    /// Members flagged present without an active session, now marked absent.
    pub repaired: Vec<MemberId>,
    /// Members whose session a tap closed between lookup and close.
    pub closed_by_tap: Vec<MemberId>,
    pub failures: Vec<SweepFailure>,
    /// Whether the activity log was written to the store and cleared.
    pub flushed: bool,
}

/// Result of one [`ScheduleController::evaluate`] call.
#[derive(Debug, Default)]
pub struct Evaluation {
    pub mode_change: Option<ModeChange>,
    pub sweep: Option<SweepReport>,
}

enum Swept {
    SignedOut,
    Repaired,
    ClosedByTap,
}

pub struct ScheduleController<S> {
    store: Arc<S>,
    policy: SchedulePolicy,
    state: ScheduleState,
}

impl<S: AttendanceStore> ScheduleController<S> {
    pub fn new(store: Arc<S>, policy: SchedulePolicy) -> Self {
        Self::with_state(store, policy, ScheduleState::default())
    }

    pub fn with_state(store: Arc<S>, policy: SchedulePolicy, state: ScheduleState) -> Self {
        Self {
            store,
            policy,
            state,
        }
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    pub fn is_asleep(&self) -> bool {
        self.state.asleep
    }

    /// Evaluate the schedule at `now`.
    pub async fn evaluate(
        &mut self,
        now: DateTime<FixedOffset>,
        log: &mut ActivityLog,
    ) -> Evaluation {
        let mut evaluation = Evaluation::default();

        if now.minute() != 0 {
            self.state.auto_signout_attempted = false;
        }

        let today = now.date_naive();
        if !self.state.asleep
            && self.policy.is_sweep_minute(&now)
            && !self.state.auto_signout_attempted
            && self.state.last_auto_signout_date != Some(today)
        {
            self.state.auto_signout_attempted = true;
            self.state.last_auto_signout_date = Some(today);
            evaluation.sweep = Some(self.sweep(now, log).await);
        }

        let should_sleep = self.policy.is_sleep_time(&now);
        if should_sleep && !self.state.asleep {
            self.state.asleep = true;
            info!(wake = %self.policy.wake, "entering sleep mode");
            log.push(now, messages::sleeping(self.policy.wake), Tone::Info);
            evaluation.mode_change = Some(ModeChange::FellAsleep);
        } else if !should_sleep && self.state.asleep {
            self.state.asleep = false;
            info!("leaving sleep mode");
            log.push(now, messages::WAKING, Tone::Info);
            evaluation.mode_change = Some(ModeChange::WokeUp);
        }

        evaluation
    }

    /// Sign out every present member with zero duration.
    ///
    /// Failures are isolated per member. Runs regardless of the schedule
    /// gates; [`evaluate`](Self::evaluate) decides when it is due.
    pub async fn sweep(&self, now: DateTime<FixedOffset>, log: &mut ActivityLog) -> SweepReport {
        let mut report = SweepReport::default();
        info!("running auto sign-out");

        let present = match self.store.list_present_members().await {
            Ok(present) => present,
            Err(err) => {
                error!(error = %err, "auto sign-out could not list present members");
                report.failures.push(SweepFailure {
                    member_id: None,
                    error: Error::store(err),
                });
                return report;
            }
        };

        for member in &present {
            match self.sign_out_member(member, now).await {
                Ok(Swept::SignedOut) => report.signed_out.push(member.label()),
                Ok(Swept::Repaired) => report.repaired.push(member.id),
                Ok(Swept::ClosedByTap) => report.closed_by_tap.push(member.id),
                Err(error) => {
                    error!(member_id = member.id, error = %error, "auto sign-out failed");
                    report.failures.push(SweepFailure {
                        member_id: Some(member.id),
                        error,
                    });
                }
            }
        }

        if !report.signed_out.is_empty() {
            let summary = messages::auto_signout_summary(&report.signed_out);
            info!(count = report.signed_out.len(), "{summary}");
            log.push(now, summary, Tone::Info);
        }

        if self.policy.flush_logs {
            report.flushed = self.flush_logs(log).await;
        }

        report
    }

    async fn sign_out_member(&self, member: &Member, now: DateTime<FixedOffset>) -> Result<Swept> {
        let active = self
            .store
            .find_active_session(member.id)
            .await
            .map_err(Error::store)?;

        let swept = match active {
            Some(session) => {
                let close = SessionClose {
                    sign_out_time: now.with_timezone(&Utc),
                    duration: 0.0,
                    message: Some(messages::auto_signed_out_note(member.first_name())),
                };
                let closed = self
                    .store
                    .close_session(session.id, &close)
                    .await
                    .map_err(Error::store)?;
                if closed {
                    Swept::SignedOut
                } else {
                    debug!(session_id = session.id, "session closed by a tap during sweep");
                    Swept::ClosedByTap
                }
            }
            None => {
                warn!(
                    member_id = member.id,
                    "member marked present without an active session"
                );
                Swept::Repaired
            }
        };

        self.store
            .update_member_fields(member.id, &MemberUpdate::presence(false))
            .await
            .map_err(Error::store)?;

        Ok(swept)
    }

    async fn flush_logs(&self, log: &mut ActivityLog) -> bool {
        if log.is_empty() {
            return false;
        }
        match self.store.append_system_log(&log.render()).await {
            Ok(true) => {
                debug!(lines = log.len(), "activity log flushed");
                log.clear();
                true
            }
            Ok(false) => {
                warn!("activity log flush was not accepted");
                false
            }
            Err(err) => {
                error!(error = %err, "failed to flush activity log");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy() -> SchedulePolicy {
        SchedulePolicy {
            wake: TimeOfDay::new(7, 0).unwrap(),
            sleep: TimeOfDay::new(20, 0).unwrap(),
            cutoff_hour: 20,
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
            bypass: false,
            flush_logs: true,
        }
    }

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    // 2026-03-02 is a Monday, 2026-03-07 a Saturday
    #[rstest]
    #[case("2026-03-02T06:59:00-05:00", true)]
    #[case("2026-03-02T07:00:00-05:00", false)]
    #[case("2026-03-02T12:00:00-05:00", false)]
    #[case("2026-03-02T19:59:00-05:00", false)]
    #[case("2026-03-02T20:00:00-05:00", true)]
    #[case("2026-03-07T10:00:00-05:00", true)]
    fn test_sleep_time(#[case] now: &str, #[case] asleep: bool) {
        assert_eq!(policy().is_sleep_time(&at(now)), asleep);
    }

    #[test]
    fn test_bypass_never_sleeps() {
        let policy = SchedulePolicy {
            bypass: true,
            ..policy()
        };
        assert!(!policy.is_sleep_time(&at("2026-03-07T10:00:00-05:00")));
        assert!(!policy.is_sleep_time(&at("2026-03-02T23:00:00-05:00")));
    }

    #[test]
    fn test_daytime_sleep_interval() {
        let policy = SchedulePolicy {
            wake: TimeOfDay::new(5, 0).unwrap(),
            sleep: TimeOfDay::new(1, 0).unwrap(),
            ..policy()
        };
        assert!(!policy.is_sleep_time(&at("2026-03-02T00:30:00-05:00")));
        assert!(policy.is_sleep_time(&at("2026-03-02T03:00:00-05:00")));
        assert!(!policy.is_sleep_time(&at("2026-03-02T05:00:00-05:00")));
    }

    #[test]
    fn test_from_settings() {
        let settings = rollcall_core::Settings::default();
        let policy = SchedulePolicy::from_settings(&settings.schedule).unwrap();
        assert_eq!(policy.cutoff_hour, 20);
        assert_eq!(policy.wake, TimeOfDay::new(7, 0).unwrap());
        assert!(!policy.bypass);
    }
}
