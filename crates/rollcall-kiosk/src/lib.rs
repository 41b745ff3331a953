//! Attendance kiosk core.
//!
//! This crate holds the decision logic of the rollcall kiosk:
//!
//! - [`SessionController`]: sign-in/sign-out per card tap, with the sign-in
//!   window and a single-flight guard
//! - [`ScheduleController`]: sleep/wake transitions and the daily
//!   auto-sign-out sweep
//! - [`RegistrationWorkflow`]: binding cards to positions, with explicit
//!   override for conflicts
//! - [`weekly_hours`]: the hours check screen
//! - [`Notifier`]: best-effort webhook notifications on a background task
//! - [`Kiosk`]: the event loop routing reader events, operator commands and
//!   schedule ticks to the above
//!
//! Controllers are generic over [`AttendanceStore`](rollcall_storage::AttendanceStore)
//! and take the current time as a parameter, so they can be exercised
//! against an in-memory database with pinned timestamps.

pub mod display;
pub mod error;
pub mod guard;
pub mod hours;
pub mod kiosk;
pub mod messages;
pub mod notify;
pub mod registration;
pub mod schedule;
pub mod session;
pub mod state_machine;

pub use display::{ActivityLog, StatusDisplay, StatusMessage, Tone};
pub use error::NotifyError;
pub use guard::TapGuard;
pub use hours::{HoursReport, week_start, weekly_hours};
pub use kiosk::{Kiosk, KioskCommand, KioskHandle, KioskSnapshot};
pub use notify::{
    AnySink, AttendanceEvent, NotificationSink, Notifier, RecordingSink, WebhookSink,
    spawn_notifier,
};
pub use registration::{Registration, RegistrationForm, RegistrationWorkflow, registration_status};
pub use schedule::{
    Evaluation, ModeChange, ScheduleController, SchedulePolicy, ScheduleState, SweepFailure,
    SweepReport,
};
pub use session::{SessionController, SignInOutcome, SignInPolicy, TapOutcome, TapStage};
pub use state_machine::{KioskMode, ModeMachine, ModeTransition};
