//! The kiosk event loop.
//!
//! One task owns every controller and all screen state. It reacts to three
//! sources:
//!
//! ```text
//!   operator commands ──┐
//!   reader drain tick ──┼──► Kiosk::run ──► watch<KioskSnapshot>
//!   schedule tick ──────┘
//! ```
//!
//! The card reader polls on its own task and queues events; the loop drains
//! that queue on a short tick, so decision logic never runs concurrently
//! with itself. Front ends send [`KioskCommand`]s and render the published
//! [`KioskSnapshot`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use rollcall_core::{CardId, Clock, Error, Result, Settings};
use rollcall_hardware::{CardReader, LedColor, ReaderEvent};
use rollcall_storage::AttendanceStore;

use crate::display::{ActivityLog, StatusDisplay, Tone};
use crate::hours::weekly_hours;
use crate::messages;
use crate::notify::Notifier;
use crate::registration::{RegistrationForm, RegistrationWorkflow, registration_status};
use crate::schedule::{ModeChange, SchedulePolicy, ScheduleController, ScheduleState};
use crate::session::{SessionController, SignInPolicy, TapOutcome};
use crate::state_machine::{KioskMode, ModeMachine};

/// How often queued reader events are drained and the display refreshed.
const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

const COMMAND_QUEUE: usize = 16;

/// Operator input from the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskCommand {
    EnterRegistration,
    SelectPosition(String),
    SetOverride(bool),
    /// Register the tapped card to the selected position.
    Submit,
    EnterHoursCheck,
    /// Back to attendance from a secondary screen.
    Done,
    Shutdown,
}

/// What the front end renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KioskSnapshot {
    pub mode: KioskMode,
    pub visible: bool,
    pub status: String,
    /// `None` while the default prompt is shown.
    pub tone: Option<Tone>,
    /// Most recent activity log line, formatted.
    pub last_log: Option<String>,
    /// Extra lines of the current screen (hours report).
    pub screen: Vec<String>,
    /// Position picker entries while registering.
    pub positions: Vec<String>,
}

/// Front end side of a running kiosk.
#[derive(Debug, Clone)]
pub struct KioskHandle {
    pub commands: mpsc::Sender<KioskCommand>,
    pub snapshot: watch::Receiver<KioskSnapshot>,
}

pub struct Kiosk<S, C> {
    store: Arc<S>,
    clock: C,
    reader: CardReader,
    events: mpsc::Receiver<ReaderEvent>,
    commands: mpsc::Receiver<KioskCommand>,
    snapshot: watch::Sender<KioskSnapshot>,
    schedule_interval: Duration,

    mode: ModeMachine,
    sessions: SessionController<S>,
    schedule: ScheduleController<S>,
    registration: RegistrationWorkflow<S>,

    form: RegistrationForm,
    positions: Vec<String>,
    screen: Vec<String>,
    display: StatusDisplay,
    log: ActivityLog,
}

impl<S: AttendanceStore, C: Clock> Kiosk<S, C> {
    /// Assemble a kiosk from its parts.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the schedule settings are invalid.
    pub fn new(
        settings: &Settings,
        store: Arc<S>,
        clock: C,
        reader: CardReader,
        events: mpsc::Receiver<ReaderEvent>,
        notifier: Notifier,
    ) -> Result<(Self, KioskHandle)> {
        Self::with_schedule_state(
            settings,
            store,
            clock,
            reader,
            events,
            notifier,
            ScheduleState::default(),
        )
    }

    /// Like [`new`](Self::new), resuming from a known schedule state.
    pub fn with_schedule_state(
        settings: &Settings,
        store: Arc<S>,
        clock: C,
        reader: CardReader,
        events: mpsc::Receiver<ReaderEvent>,
        notifier: Notifier,
        state: ScheduleState,
    ) -> Result<(Self, KioskHandle)> {
        let schedule_settings = &settings.schedule;
        let sign_in = SignInPolicy::new(schedule_settings.start()?, schedule_settings.cutoff()?)
            .with_bypass(schedule_settings.bypass);
        let schedule_policy = SchedulePolicy::from_settings(schedule_settings)?;

        let mode = if state.asleep {
            ModeMachine::starting_in(KioskMode::Asleep)
        } else {
            ModeMachine::new()
        };

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let display = StatusDisplay::new(
            default_prompt(mode.current()),
            settings.kiosk.message_display(),
        );

        let mut kiosk = Self {
            sessions: SessionController::new(
                Arc::clone(&store),
                sign_in,
                notifier,
                settings.kiosk.tap_guard(),
            ),
            schedule: ScheduleController::with_state(Arc::clone(&store), schedule_policy, state),
            registration: RegistrationWorkflow::new(Arc::clone(&store)),
            store,
            clock,
            reader,
            events,
            commands: command_rx,
            snapshot: watch::channel(empty_snapshot()).0,
            schedule_interval: schedule_settings.poll_interval(),
            mode,
            form: RegistrationForm::default(),
            positions: Vec::new(),
            screen: Vec::new(),
            display,
            log: ActivityLog::default(),
        };
        if kiosk.mode.is(KioskMode::Asleep) {
            kiosk.display.hide();
        }

        let snapshot = kiosk.snapshot.subscribe();
        kiosk.publish();

        Ok((
            kiosk,
            KioskHandle {
                commands: command_tx,
                snapshot,
            },
        ))
    }

    pub fn mode(&self) -> KioskMode {
        self.mode.current()
    }

    pub fn display(&self) -> &StatusDisplay {
        &self.display
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn schedule_state(&self) -> &ScheduleState {
        self.schedule.state()
    }

    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    pub fn is_reading(&self) -> bool {
        self.reader.is_running()
    }

    /// Run until [`KioskCommand::Shutdown`] or until every handle is dropped.
    pub async fn run(mut self) -> Result<()> {
        self.start().await;

        let mut drain = tokio::time::interval(DRAIN_INTERVAL);
        drain.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut schedule = tokio::time::interval(self.schedule_interval);
        schedule.set_missed_tick_behavior(MissedTickBehavior::Skip);
        schedule.tick().await; // start() already evaluated

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(KioskCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                _ = drain.tick() => {
                    self.drain_reader().await;
                    self.display.update();
                }
                _ = schedule.tick() => self.tick_schedule().await,
            }
            self.publish();
        }

        info!("kiosk shutting down");
        self.reader.stop().await;
        Ok(())
    }

    /// Log startup, evaluate the schedule once and start reading if awake.
    pub async fn start(&mut self) {
        let now = self.clock.now();
        info!(mode = %self.mode.current(), "kiosk started");
        self.log.push(now, messages::STARTED, Tone::Info);

        self.tick_schedule().await;
        if self.mode.current().reads_cards() && !self.reader.is_running() {
            self.reader.start();
        }
        self.publish();
    }

    /// Route every queued reader event.
    pub async fn drain_reader(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                ReaderEvent::CardRead(card) => {
                    self.handle_card(&card.id).await;
                }
                ReaderEvent::DeviceError { error } => {
                    let now = self.clock.now();
                    warn!(error = %error, "card reader error");
                    self.log
                        .push(now, format!("Card reader error: {error}"), Tone::Error);
                }
                _ => {}
            }
        }
    }

    /// Handle one card read according to the current mode.
    ///
    /// Returns the tap outcome in attendance mode.
    pub async fn handle_card(&mut self, raw: &str) -> Option<TapOutcome> {
        let now = self.clock.now();
        let card = match CardId::new(raw) {
            Ok(card) => card,
            Err(err) => {
                warn!(error = %err, "invalid card read");
                self.display.show(messages::INVALID_CARD, Tone::Error);
                return None;
            }
        };

        match self.mode.current() {
            KioskMode::Attendance => {
                let outcome = self.sessions.handle_tap(&card, now).await;
                if let Some(status) = outcome.status(&now) {
                    self.display.show(status.text, status.tone);
                }
                if let Some((line, tone)) = outcome.log_line() {
                    self.log.push(now, line, tone);
                }
                if !matches!(outcome, TapOutcome::Busy) {
                    let color = if outcome.is_success() {
                        LedColor::Green
                    } else {
                        LedColor::Red
                    };
                    self.signal(color).await;
                }
                Some(outcome)
            }
            KioskMode::Registration => {
                self.registration_tap(card, now).await;
                None
            }
            KioskMode::HoursCheck => {
                self.hours_tap(&card, now).await;
                None
            }
            KioskMode::Asleep => {
                debug!(card = %card, "card ignored while asleep");
                None
            }
        }
    }

    async fn registration_tap(&mut self, card: CardId, now: DateTime<FixedOffset>) {
        match self.registration.check_card(&card).await {
            Ok(Some(owner)) if !self.form.override_enabled => {
                self.display.show(
                    messages::card_already_registered(&owner.position),
                    Tone::Error,
                );
            }
            Ok(_) => {
                self.display.show(messages::card_detected(card.as_str()), Tone::Info);
            }
            Err(err) => {
                self.display.show(messages::processing_error(&err), Tone::Error);
                self.log.push(now, err.to_string(), Tone::Error);
            }
        }
        self.form.card = Some(card);
    }

    async fn hours_tap(&mut self, card: &CardId, now: DateTime<FixedOffset>) {
        match weekly_hours(self.store.as_ref(), card, now).await {
            Ok(report) => {
                self.screen = report.lines();
                self.display.show(self.screen.join("\n"), Tone::Info);
            }
            Err(Error::UnknownCard(_)) => {
                self.screen.clear();
                self.display.show(messages::UNKNOWN_CARD, Tone::Error);
            }
            Err(err) => {
                warn!(error = %err, "hours check failed");
                self.screen.clear();
                self.display.show(messages::processing_error(&err), Tone::Error);
            }
        }
    }

    pub async fn handle_command(&mut self, command: KioskCommand) {
        debug!(?command, mode = %self.mode.current(), "operator command");
        match command {
            KioskCommand::EnterRegistration => {
                if self.switch_mode(KioskMode::Registration).await {
                    self.load_positions().await;
                }
            }
            KioskCommand::EnterHoursCheck => {
                self.switch_mode(KioskMode::HoursCheck).await;
            }
            KioskCommand::Done => {
                if matches!(
                    self.mode.current(),
                    KioskMode::Registration | KioskMode::HoursCheck
                ) {
                    self.switch_mode(KioskMode::Attendance).await;
                }
            }
            KioskCommand::SelectPosition(position) if self.mode.is(KioskMode::Registration) => {
                self.form.position = Some(position);
            }
            KioskCommand::SetOverride(enabled) if self.mode.is(KioskMode::Registration) => {
                self.form.override_enabled = enabled;
            }
            KioskCommand::Submit if self.mode.is(KioskMode::Registration) => {
                self.submit_registration().await;
            }
            KioskCommand::Shutdown => {}
            other => {
                debug!(command = ?other, "command ignored outside registration");
            }
        }
    }

    async fn submit_registration(&mut self) {
        let now = self.clock.now();
        let (card, position) = match self.form.submission() {
            Ok(submission) => submission,
            Err(prompt) => {
                self.display.show(prompt, Tone::Error);
                return;
            }
        };

        let result = self
            .registration
            .register(&position, &card, self.form.override_enabled)
            .await;
        let status = registration_status(&result);
        self.log.push(now, status.text.clone(), status.tone);
        self.display.show(status.text, status.tone);

        if result.is_ok() {
            self.form.card = None;
        }
    }

    async fn load_positions(&mut self) {
        match self.registration.positions().await {
            Ok(positions) => self.positions = positions,
            Err(err) => {
                warn!(error = %err, "failed to load positions");
                self.positions.clear();
                self.display.show(messages::processing_error(&err), Tone::Error);
            }
        }
    }

    /// Evaluate the schedule at the clock's current time.
    pub async fn tick_schedule(&mut self) {
        let now = self.clock.now();
        let evaluation = self.schedule.evaluate(now, &mut self.log).await;

        if let Some(report) = &evaluation.sweep {
            info!(
                signed_out = report.signed_out.len(),
                repaired = report.repaired.len(),
                closed_by_tap = report.closed_by_tap.len(),
                failures = report.failures.len(),
                flushed = report.flushed,
                "auto sign-out finished"
            );
        }

        match evaluation.mode_change {
            Some(ModeChange::FellAsleep) => {
                self.switch_mode(KioskMode::Asleep).await;
            }
            Some(ModeChange::WokeUp) => {
                self.switch_mode(KioskMode::Attendance).await;
            }
            None => {}
        }
    }

    /// Returns `false` if the switch is not allowed from the current mode.
    async fn switch_mode(&mut self, to: KioskMode) -> bool {
        let transition = match self.mode.transition_to(to) {
            Ok(transition) => transition,
            Err(err) => {
                warn!(error = %err, "mode switch refused");
                return false;
            }
        };
        info!(from = %transition.from, to = %transition.to, "mode changed");

        self.form.clear();
        self.screen.clear();
        self.positions.clear();
        self.sessions.reset_guard();

        if to.reads_cards() {
            self.restart_reader().await;
            let color = if to == KioskMode::Attendance {
                LedColor::Off
            } else {
                LedColor::Yellow
            };
            self.signal(color).await;
            self.display.reveal();
            self.display.set_default(default_prompt(to));
        } else {
            self.reader.stop().await;
            self.discard_pending_reads();
            self.display.hide();
        }
        true
    }

    /// Stop, reinitialize and start the reader, dropping reads queued for
    /// the previous screen.
    async fn restart_reader(&mut self) {
        self.reader.stop().await;
        self.discard_pending_reads();
        if let Err(err) = self.reader.reinitialize().await {
            warn!(error = %err, "card reader reinitialization failed");
        }
        self.reader.start();
    }

    /// Readers without an LED ignore this.
    async fn signal(&self, color: LedColor) {
        if let Err(err) = self.reader.signal(color).await {
            debug!(error = %err, "reader LED not set");
        }
    }

    fn discard_pending_reads(&mut self) {
        let mut discarded = 0usize;
        while self.events.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "discarded queued reads");
        }
    }

    pub fn snapshot(&self) -> KioskSnapshot {
        KioskSnapshot {
            mode: self.mode.current(),
            visible: self.display.is_visible(),
            status: self.display.text().to_string(),
            tone: self.display.message().map(|message| message.tone),
            last_log: self.log.last().map(ToString::to_string),
            screen: self.screen.clone(),
            positions: self.positions.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.snapshot());
    }
}

fn default_prompt(mode: KioskMode) -> &'static str {
    match mode {
        KioskMode::Attendance => "Tap your card to sign in or out",
        KioskMode::Registration => messages::REGISTRATION_PROMPT,
        KioskMode::HoursCheck => messages::HOURS_PROMPT,
        KioskMode::Asleep => "",
    }
}

fn empty_snapshot() -> KioskSnapshot {
    KioskSnapshot {
        mode: KioskMode::Attendance,
        visible: true,
        status: String::new(),
        tone: None,
        last_log: None,
        screen: Vec::new(),
        positions: Vec::new(),
    }
}
