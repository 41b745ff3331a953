//! Session controller: turns a card tap into a sign-in or a sign-out.
//!
//! For a tapped card the controller looks up the member, then the member's
//! active session. Without one the member is signed in, subject to the
//! sign-in window; with one the session is closed with its duration in
//! fractional hours. Successful taps are announced through the
//! [`Notifier`].
//!
//! Taps are single-flight: a tap arriving while another is processed, or
//! within the guard's hold period after it, is ignored.
//!
//! Every store failure is caught here, logged, and reported as
//! [`TapOutcome::Failed`] with `Error::StoreUnavailable`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, error, info, warn};

use rollcall_core::{CardId, Error, Result, SessionId, TimeOfDay};
use rollcall_storage::models::session::hours_between;
use rollcall_storage::{AttendanceStore, Member, MemberUpdate, NewSession, Session, SessionClose};

use crate::display::{StatusMessage, Tone};
use crate::guard::TapGuard;
use crate::messages;
use crate::notify::{AttendanceEvent, Notifier};

/// When members may sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInPolicy {
    /// Earliest sign-in time.
    pub start: TimeOfDay,

    /// Sign-in is refused at and after this time.
    pub cutoff: TimeOfDay,

    /// Disables the window entirely.
    pub bypass: bool,
}

impl SignInPolicy {
    pub fn new(start: TimeOfDay, cutoff: TimeOfDay) -> Self {
        Self {
            start,
            cutoff,
            bypass: false,
        }
    }

    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    /// # Errors
    ///
    /// `Error::BeforeHours` or `Error::AfterHours` when `now` is outside the
    /// window.
    pub fn check(&self, now: &DateTime<FixedOffset>) -> Result<()> {
        if self.bypass {
            return Ok(());
        }
        if self.start.is_after(now) {
            return Err(Error::BeforeHours(self.start.to_12h()));
        }
        if !self.cutoff.is_after(now) {
            return Err(Error::AfterHours(self.cutoff.to_12h()));
        }
        Ok(())
    }
}

/// Result of a sign-in attempt.
#[derive(Debug)]
pub enum SignInOutcome {
    Created(Session),
    RejectedBeforeHours,
    RejectedAfterHours,
    Failed(Error),
}

/// Which step of a tap failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapStage {
    /// Member or active-session lookup.
    Lookup,
    SignIn,
    SignOut,
}

/// Result of one tap.
#[derive(Debug)]
pub enum TapOutcome {
    SignedIn {
        member: Member,
        session: Session,
    },
    SignedOut {
        member: Member,
        session_id: SessionId,
        duration_hours: f64,
    },
    /// Sign-in refused by the window; nothing was written.
    Rejected { member: Member, error: Error },
    UnknownCard(CardId),
    /// Ignored by the single-flight guard.
    Busy,
    Failed {
        member: Option<Member>,
        stage: TapStage,
        error: Error,
    },
}

impl TapOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TapOutcome::SignedIn { .. } | TapOutcome::SignedOut { .. })
    }

    /// Taxonomy name of the failure, if the tap did not succeed.
    pub fn error_kind(&self) -> Option<&'static str> {
        match self {
            TapOutcome::SignedIn { .. } | TapOutcome::SignedOut { .. } | TapOutcome::Busy => None,
            TapOutcome::Rejected { error, .. } | TapOutcome::Failed { error, .. } => {
                Some(error.kind())
            }
            TapOutcome::UnknownCard(_) => Some("unknown_card"),
        }
    }

    /// Status line text for this outcome. `None` for ignored taps.
    pub fn status(&self, at: &DateTime<FixedOffset>) -> Option<StatusMessage> {
        let message = match self {
            TapOutcome::SignedIn { member, .. } => {
                StatusMessage::new(messages::welcome(member.first_name(), at), Tone::Success)
            }
            TapOutcome::SignedOut { member, .. } => {
                StatusMessage::new(messages::goodbye(member.first_name(), at), Tone::Success)
            }
            TapOutcome::Rejected { error, .. } => StatusMessage::new(error.to_string(), Tone::Error),
            TapOutcome::UnknownCard(_) => StatusMessage::new(messages::UNKNOWN_CARD, Tone::Error),
            TapOutcome::Failed { stage, error, .. } => {
                let text = match stage {
                    TapStage::SignIn => messages::SIGN_IN_FAILED.to_string(),
                    TapStage::SignOut => messages::SIGN_OUT_FAILED.to_string(),
                    TapStage::Lookup => messages::processing_error(error),
                };
                StatusMessage::new(text, Tone::Error)
            }
            TapOutcome::Busy => return None,
        };
        Some(message)
    }

    /// Activity log line for this outcome. `None` for ignored taps.
    pub fn log_line(&self) -> Option<(String, Tone)> {
        let line = match self {
            TapOutcome::SignedIn { member, .. } => {
                (messages::sign_in_logged(&member.label()), Tone::Success)
            }
            TapOutcome::SignedOut {
                member,
                duration_hours,
                ..
            } => (
                messages::sign_out_logged(&member.label(), *duration_hours),
                Tone::Success,
            ),
            TapOutcome::Rejected { member, error } => {
                (format!("{}: {error}", member.label()), Tone::Error)
            }
            TapOutcome::UnknownCard(card) => (format!("Unknown card: {card}"), Tone::Error),
            TapOutcome::Failed {
                member,
                stage,
                error,
            } => {
                let who = member
                    .as_ref()
                    .map(Member::label)
                    .unwrap_or_else(|| "card".to_string());
                (format!("{stage:?} failed for {who}: {error}"), Tone::Error)
            }
            TapOutcome::Busy => return None,
        };
        Some(line)
    }
}

/// Decides sign-in versus sign-out for each tap.
pub struct SessionController<S> {
    store: Arc<S>,
    policy: SignInPolicy,
    notifier: Notifier,
    guard: TapGuard,
}

impl<S: AttendanceStore> SessionController<S> {
    pub fn new(store: Arc<S>, policy: SignInPolicy, notifier: Notifier, hold: Duration) -> Self {
        Self {
            store,
            policy,
            notifier,
            guard: TapGuard::new(hold),
        }
    }

    pub fn policy(&self) -> &SignInPolicy {
        &self.policy
    }

    /// Clear the single-flight hold, e.g. after a screen change.
    pub fn reset_guard(&mut self) {
        self.guard.reset();
    }

    /// Handle a tap of `card` at local time `now`.
    pub async fn handle_tap(&mut self, card: &CardId, now: DateTime<FixedOffset>) -> TapOutcome {
        if !self.guard.try_acquire(Instant::now()) {
            debug!(card = %card, "tap ignored while busy");
            return TapOutcome::Busy;
        }

        let outcome = self.process(card, now).await;
        self.guard.release(Instant::now());
        outcome
    }

    async fn process(&self, card: &CardId, now: DateTime<FixedOffset>) -> TapOutcome {
        let member = match self.store.find_member_by_card(card).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                info!(card = %card, "unknown card");
                return TapOutcome::UnknownCard(card.clone());
            }
            Err(err) => return lookup_failed(None, err),
        };

        let active = match self.store.find_active_session(member.id).await {
            Ok(active) => active,
            Err(err) => return lookup_failed(Some(member), err),
        };

        match active {
            None => match self.sign_in(&member, now).await {
                SignInOutcome::Created(session) => TapOutcome::SignedIn { member, session },
                SignInOutcome::RejectedBeforeHours => TapOutcome::Rejected {
                    member,
                    error: Error::BeforeHours(self.policy.start.to_12h()),
                },
                SignInOutcome::RejectedAfterHours => TapOutcome::Rejected {
                    member,
                    error: Error::AfterHours(self.policy.cutoff.to_12h()),
                },
                SignInOutcome::Failed(error) => TapOutcome::Failed {
                    member: Some(member),
                    stage: TapStage::SignIn,
                    error,
                },
            },
            Some(session) => match self.sign_out(&member, &session, now).await {
                Ok(duration_hours) => TapOutcome::SignedOut {
                    member,
                    session_id: session.id,
                    duration_hours,
                },
                Err(error) => TapOutcome::Failed {
                    member: Some(member),
                    stage: TapStage::SignOut,
                    error,
                },
            },
        }
    }

    /// Open a session for `member`, subject to the sign-in window.
    ///
    /// The presence flag is set first; if the session cannot be created the
    /// flag is reverted so no member is left present without a session.
    pub async fn sign_in(&self, member: &Member, now: DateTime<FixedOffset>) -> SignInOutcome {
        match self.policy.check(&now) {
            Ok(()) => {}
            Err(Error::BeforeHours(_)) => {
                info!(member_id = member.id, "sign-in rejected before hours");
                return SignInOutcome::RejectedBeforeHours;
            }
            Err(_) => {
                info!(member_id = member.id, "sign-in rejected after hours");
                return SignInOutcome::RejectedAfterHours;
            }
        }

        if let Err(error) = self.set_presence(member, true).await {
            error!(member_id = member.id, error = %error, "failed to mark member present");
            return SignInOutcome::Failed(error);
        }

        let new_session = NewSession {
            member_id: member.id,
            sign_in_time: now.with_timezone(&Utc),
            message: Some(messages::signed_in_note(member.first_name())),
        };
        let session = match self.store.create_session(&new_session).await {
            Ok(session) => session,
            Err(err) => {
                error!(member_id = member.id, error = %err, "failed to create session");
                if let Err(revert) = self.set_presence(member, false).await {
                    warn!(
                        member_id = member.id,
                        error = %revert,
                        "failed to revert presence after sign-in failure"
                    );
                }
                return SignInOutcome::Failed(Error::store(err));
            }
        };

        info!(
            member_id = member.id,
            session_id = session.id,
            position = %member.position,
            "member signed in"
        );
        self.notifier.notify(AttendanceEvent::SignedIn {
            name: member.name.clone(),
            position: member.position.clone(),
            at: now,
        });

        SignInOutcome::Created(session)
    }

    /// Close `session` and mark `member` absent. Returns the duration in
    /// hours.
    ///
    /// # Errors
    ///
    /// `Error::NoActiveSession` if the session was closed concurrently (for
    /// example by the auto-sign-out sweep), `Error::StoreUnavailable` on
    /// store failures.
    pub async fn sign_out(
        &self,
        member: &Member,
        session: &Session,
        now: DateTime<FixedOffset>,
    ) -> Result<f64> {
        let sign_out_time = now.with_timezone(&Utc);
        let duration_hours = hours_between(session.sign_in_time, sign_out_time);
        let close = SessionClose {
            sign_out_time,
            duration: duration_hours,
            message: Some(messages::signed_out_note(member.first_name())),
        };

        let closed = self
            .store
            .close_session(session.id, &close)
            .await
            .map_err(|err| {
                error!(session_id = session.id, error = %err, "failed to close session");
                Error::store(err)
            })?;
        if !closed {
            warn!(
                member_id = member.id,
                session_id = session.id,
                "session was already closed"
            );
            return Err(Error::NoActiveSession(member.id));
        }

        self.set_presence(member, false).await.inspect_err(|error| {
            error!(member_id = member.id, error = %error, "failed to mark member absent");
        })?;

        info!(
            member_id = member.id,
            session_id = session.id,
            duration_hours,
            "member signed out"
        );
        self.notifier.notify(AttendanceEvent::SignedOut {
            name: member.name.clone(),
            position: member.position.clone(),
            at: now,
            duration_hours,
        });

        Ok(duration_hours)
    }

    async fn set_presence(&self, member: &Member, present: bool) -> Result<()> {
        let updated = self
            .store
            .update_member_fields(member.id, &MemberUpdate::presence(present))
            .await
            .map_err(Error::store)?;
        if !updated {
            return Err(Error::store(format!("member {} not found", member.id)));
        }
        Ok(())
    }
}

fn lookup_failed(member: Option<Member>, err: impl std::fmt::Display) -> TapOutcome {
    error!(error = %err, "lookup failed while processing tap");
    TapOutcome::Failed {
        member,
        stage: TapStage::Lookup,
        error: Error::store(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn policy() -> SignInPolicy {
        SignInPolicy::new(TimeOfDay::new(7, 0).unwrap(), TimeOfDay::new(20, 0).unwrap())
    }

    #[rstest]
    #[case("2026-03-02T06:59:00-05:00", Some("before_hours"))]
    #[case("2026-03-02T07:00:00-05:00", None)]
    #[case("2026-03-02T19:59:00-05:00", None)]
    #[case("2026-03-02T20:00:00-05:00", Some("after_hours"))]
    #[case("2026-03-02T23:30:00-05:00", Some("after_hours"))]
    fn test_sign_in_window(#[case] now: &str, #[case] rejected: Option<&str>) {
        let result = policy().check(&at(now));
        assert_eq!(result.err().map(|e| e.kind()), rejected);
    }

    #[rstest]
    #[case("2026-03-02T03:00:00-05:00")]
    #[case("2026-03-02T22:00:00-05:00")]
    fn test_bypass_ignores_window(#[case] now: &str) {
        assert!(policy().with_bypass(true).check(&at(now)).is_ok());
    }

    #[test]
    fn test_rejection_text() {
        let err = policy().check(&at("2026-03-02T06:00:00-05:00")).unwrap_err();
        assert_eq!(err.to_string(), "Sign-in not allowed before 7:00 AM");
    }

    #[test]
    fn test_busy_outcome_is_silent() {
        let now = at("2026-03-02T09:00:00-05:00");
        assert!(TapOutcome::Busy.status(&now).is_none());
        assert!(TapOutcome::Busy.log_line().is_none());
        assert_eq!(TapOutcome::Busy.error_kind(), None);
    }

    #[test]
    fn test_unknown_card_status() {
        let now = at("2026-03-02T09:00:00-05:00");
        let outcome = TapOutcome::UnknownCard(CardId::new("123456").unwrap());
        let status = outcome.status(&now).unwrap();
        assert_eq!(status.text, "Error: Unknown RFID card.");
        assert_eq!(status.tone, Tone::Error);
        assert_eq!(outcome.error_kind(), Some("unknown_card"));
    }
}
