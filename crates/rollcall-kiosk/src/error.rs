use thiserror::Error;

/// Failures delivering a notification. Logged by the dispatcher, never
/// returned to the tap that caused the notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The HTTP client could not be built.
    #[error("Notification client error: {0}")]
    Client(String),

    /// The request did not complete (DNS, TLS, timeout).
    #[error("Notification request error: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("Notification endpoint returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The dispatcher queue is full; the event was dropped.
    #[error("Notification queue full")]
    QueueFull,

    /// The dispatcher task is gone.
    #[error("Notification dispatcher closed")]
    Closed,
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
