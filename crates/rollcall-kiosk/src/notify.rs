//! Sign-in/out notifications.
//!
//! Taps enqueue an [`AttendanceEvent`] on a bounded queue and return at
//! once. A detached worker task drains the queue and hands each event to a
//! [`NotificationSink`]. Delivery failures are logged and dropped; they never
//! reach the tap that caused them.
//!
//! The production sink posts a chat webhook embed:
//!
//! ```json
//! {"embeds":[{"title":"Member Tap In","description":"**Ada Lovelace** (Treasurer)",
//!   "color":65280,"timestamp":"2026-03-02T14:00:00+00:00",
//!   "fields":[{"name":"Time","value":"09:00 AM","inline":true}]}]}
//! ```

#![allow(async_fn_in_trait)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::NotifyError;
use crate::messages;

const COLOR_SIGN_IN: u32 = 0x00FF00;
const COLOR_SIGN_OUT: u32 = 0xFF0000;

/// Longest error body kept from a rejected webhook call.
const MAX_ERROR_BODY: usize = 512;

/// A completed sign-in or sign-out.
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceEvent {
    SignedIn {
        name: String,
        position: String,
        at: DateTime<FixedOffset>,
    },
    SignedOut {
        name: String,
        position: String,
        at: DateTime<FixedOffset>,
        duration_hours: f64,
    },
}

impl AttendanceEvent {
    pub fn name(&self) -> &str {
        match self {
            AttendanceEvent::SignedIn { name, .. } | AttendanceEvent::SignedOut { name, .. } => {
                name
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AttendanceEvent::SignedIn { .. } => "sign_in",
            AttendanceEvent::SignedOut { .. } => "sign_out",
        }
    }
}

/// Webhook request body.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn inline(name: &str, value: String) -> Self {
        Self {
            name: name.to_string(),
            value,
            inline: true,
        }
    }
}

impl WebhookPayload {
    /// Build the embed announcing `event`.
    pub fn for_event(event: &AttendanceEvent) -> Self {
        let embed = match event {
            AttendanceEvent::SignedIn { name, position, at } => Embed {
                title: "Member Tap In".to_string(),
                description: format!("**{name}** ({position})"),
                color: COLOR_SIGN_IN,
                timestamp: at.with_timezone(&Utc).to_rfc3339(),
                fields: vec![EmbedField::inline("Time", messages::clock_time(at))],
            },
            AttendanceEvent::SignedOut {
                name,
                position,
                at,
                duration_hours,
            } => Embed {
                title: "Member Tap Out".to_string(),
                description: format!("**{name}** ({position})"),
                color: COLOR_SIGN_OUT,
                timestamp: at.with_timezone(&Utc).to_rfc3339(),
                fields: vec![
                    EmbedField::inline("Time", messages::clock_time(at)),
                    EmbedField::inline("Duration", messages::hours_minutes(*duration_hours)),
                ],
            },
        };
        Self {
            embeds: vec![embed],
        }
    }
}

/// Destination of attendance events.
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &AttendanceEvent) -> Result<(), NotifyError>;
}

/// Posts events to a chat webhook.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    http: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// # Errors
    ///
    /// Returns `NotifyError::Client` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self::with_client(url, http))
    }

    pub fn with_client(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl NotificationSink for WebhookSink {
    async fn deliver(&self, event: &AttendanceEvent) -> Result<(), NotifyError> {
        let payload = WebhookPayload::for_event(event);
        let response = self.http.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!(event = event.kind(), "webhook notification delivered");
            Ok(())
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: truncate_body(body),
            })
        }
    }
}

/// Cut a rejected response body down to at most [`MAX_ERROR_BODY`] bytes.
fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}

/// Keeps delivered events in memory. Used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AttendanceEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered so far.
    pub fn events(&self) -> Vec<AttendanceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for RecordingSink {
    async fn deliver(&self, event: &AttendanceEvent) -> Result<(), NotifyError> {
        let mut events = self.events.lock().map_err(|_| NotifyError::Closed)?;
        events.push(event.clone());
        Ok(())
    }
}

/// Static dispatch over the available sinks.
#[derive(Debug, Clone)]
pub enum AnySink {
    Webhook(WebhookSink),
    Recording(RecordingSink),
}

impl NotificationSink for AnySink {
    async fn deliver(&self, event: &AttendanceEvent) -> Result<(), NotifyError> {
        match self {
            AnySink::Webhook(sink) => sink.deliver(event).await,
            AnySink::Recording(sink) => sink.deliver(event).await,
        }
    }
}

/// Enqueues events for the notification worker. Cheap to clone.
///
/// A disabled notifier accepts and discards every event.
#[derive(Debug, Clone)]
pub struct Notifier {
    queue: Option<mpsc::Sender<AttendanceEvent>>,
}

impl Notifier {
    pub fn disabled() -> Self {
        Self { queue: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.queue.is_some()
    }

    /// Queue `event` without waiting. A full or closed queue drops it.
    pub fn notify(&self, event: AttendanceEvent) {
        if let Err(err) = self.try_notify(event) {
            warn!(error = %err, "notification dropped");
        }
    }

    /// # Errors
    ///
    /// `NotifyError::QueueFull` or `NotifyError::Closed` when the event
    /// could not be queued.
    pub fn try_notify(&self, event: AttendanceEvent) -> Result<(), NotifyError> {
        let Some(queue) = &self.queue else {
            return Ok(());
        };
        queue.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
        })
    }
}

/// Start the delivery worker for `sink`.
///
/// The worker exits once every [`Notifier`] clone has been dropped and the
/// queue is drained.
pub fn spawn_notifier(sink: AnySink, capacity: usize) -> (Notifier, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<AttendanceEvent>(capacity.max(1));

    let handle = tokio::spawn(async move {
        info!("notification worker started");
        while let Some(event) = rx.recv().await {
            if let Err(err) = sink.deliver(&event).await {
                warn!(
                    event = event.kind(),
                    member = %event.name(),
                    error = %err,
                    "notification delivery failed"
                );
            }
        }
        info!("notification worker stopped");
    });

    (Notifier { queue: Some(tx) }, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn signed_in() -> AttendanceEvent {
        AttendanceEvent::SignedIn {
            name: "Ada Lovelace".to_string(),
            position: "Treasurer".to_string(),
            at: at("2026-03-02T09:00:00-05:00"),
        }
    }

    #[test]
    fn test_sign_in_embed() {
        let payload = serde_json::to_value(WebhookPayload::for_event(&signed_in())).unwrap();
        assert_eq!(
            payload,
            json!({
                "embeds": [{
                    "title": "Member Tap In",
                    "description": "**Ada Lovelace** (Treasurer)",
                    "color": 0x00FF00,
                    "timestamp": "2026-03-02T14:00:00+00:00",
                    "fields": [{"name": "Time", "value": "09:00 AM", "inline": true}]
                }]
            })
        );
    }

    #[test]
    fn test_sign_out_embed_has_duration() {
        let event = AttendanceEvent::SignedOut {
            name: "Ada Lovelace".to_string(),
            position: "Treasurer".to_string(),
            at: at("2026-03-02T11:30:00-05:00"),
            duration_hours: 2.5,
        };
        let payload = WebhookPayload::for_event(&event);
        let embed = &payload.embeds[0];

        assert_eq!(embed.title, "Member Tap Out");
        assert_eq!(embed.color, 0xFF0000);
        assert_eq!(embed.fields[0].value, "11:30 AM");
        assert_eq!(embed.fields[1].name, "Duration");
        assert_eq!(embed.fields[1].value, "2h 30m");
    }

    #[test]
    fn test_rejected_body_truncated_on_char_boundary() {
        assert_eq!(truncate_body("bad request".to_string()), "bad request");

        let long = "é".repeat(400);
        let cut = truncate_body(long);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= MAX_ERROR_BODY + 3);
        assert_eq!(cut.trim_end_matches("...").chars().count(), 256);
    }

    #[test]
    fn test_disabled_notifier_accepts_events() {
        let notifier = Notifier::disabled();
        assert!(!notifier.is_enabled());
        assert!(notifier.try_notify(signed_in()).is_ok());
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let sink = RecordingSink::new();
        let (notifier, worker) = spawn_notifier(AnySink::Recording(sink.clone()), 8);

        notifier.notify(signed_in());
        notifier.notify(AttendanceEvent::SignedOut {
            name: "Ada Lovelace".to_string(),
            position: "Treasurer".to_string(),
            at: at("2026-03-02T11:30:00-05:00"),
            duration_hours: 2.5,
        });
        drop(notifier);
        worker.await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AttendanceEvent::SignedIn { .. }));
        assert!(matches!(events[1], AttendanceEvent::SignedOut { .. }));
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let notifier = Notifier { queue: Some(tx) };

        assert!(notifier.try_notify(signed_in()).is_ok());
        assert!(matches!(
            notifier.try_notify(signed_in()),
            Err(NotifyError::QueueFull)
        ));
        // logged and dropped
        notifier.notify(signed_in());
    }

    #[tokio::test]
    async fn test_closed_queue_reports_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let notifier = Notifier { queue: Some(tx) };
        assert!(matches!(
            notifier.try_notify(signed_in()),
            Err(NotifyError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_webhook_transport_failure_is_an_error() {
        // nothing listens on port 9 of localhost
        let sink = WebhookSink::new("http://127.0.0.1:9/webhook", Duration::from_secs(1)).unwrap();
        let err = sink.deliver(&signed_in()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Request(_)));
    }
}
