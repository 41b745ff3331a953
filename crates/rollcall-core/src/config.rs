//! Kiosk configuration.
//!
//! Settings are layered, later sources winning:
//!
//! 1. Defaults embedded from `config/default.toml`
//! 2. An explicit file (`--config`) or an optional `rollcall.toml` in the
//!    working directory
//! 3. Environment variables with the `ROLLCALL__` prefix, sections separated
//!    by `__` (e.g. `ROLLCALL__SCHEDULE__BYPASS=true`)

use crate::constants::*;
use crate::error::{Error, Result};
use crate::types::TimeOfDay;
use chrono::Weekday;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULTS: &str = include_str!("../../../config/default.toml");
const LOCAL_CONFIG: &str = "rollcall";
const ENV_PREFIX: &str = "ROLLCALL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub schedule: ScheduleSettings,
    pub kiosk: KioskSettings,
    pub reader: ReaderSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    pub logging: LoggingSettings,
}

/// Sign-in window, sleep schedule and auto-sign-out timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleSettings {
    pub start_hour: u8,
    pub start_minute: u8,
    /// Sign-in is refused from this hour on; the daily sweep runs at minute zero of it.
    pub cutoff_hour: u8,
    pub sleep_hour: u8,
    pub sleep_minute: u8,
    pub wake_hour: u8,
    pub wake_minute: u8,
    /// Days on which the kiosk sleeps all day.
    pub weekend_days: Vec<Weekday>,
    /// Development mode: disables every time-window and schedule check.
    pub bypass: bool,
    pub poll_interval_secs: u64,
    pub flush_logs_after_sweep: bool,
}

impl ScheduleSettings {
    /// Earliest sign-in time.
    pub fn start(&self) -> Result<TimeOfDay> {
        TimeOfDay::new(self.start_hour, self.start_minute)
    }

    /// Sign-in cutoff, also the auto-sign-out time.
    pub fn cutoff(&self) -> Result<TimeOfDay> {
        TimeOfDay::new(self.cutoff_hour, 0)
    }

    pub fn sleep(&self) -> Result<TimeOfDay> {
        TimeOfDay::new(self.sleep_hour, self.sleep_minute)
    }

    pub fn wake(&self) -> Result<TimeOfDay> {
        TimeOfDay::new(self.wake_hour, self.wake_minute)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KioskSettings {
    pub message_display_ms: u64,
    pub tap_guard_ms: u64,
}

impl KioskSettings {
    pub fn message_display(&self) -> Duration {
        Duration::from_millis(self.message_display_ms)
    }

    pub fn tap_guard(&self) -> Duration {
        Duration::from_millis(self.tap_guard_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReaderSettings {
    pub poll_interval_ms: u64,
    pub stop_timeout_ms: u64,
}

impl ReaderSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseSettings {
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotificationSettings {
    /// Chat webhook receiving sign-in/out embeds. Notifications are disabled when unset.
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
    pub queue_capacity: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
            queue_capacity: DEFAULT_NOTIFICATION_QUEUE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schedule: ScheduleSettings {
                start_hour: DEFAULT_START_HOUR,
                start_minute: DEFAULT_START_MINUTE,
                cutoff_hour: DEFAULT_CUTOFF_HOUR,
                sleep_hour: DEFAULT_SLEEP_HOUR,
                sleep_minute: DEFAULT_SLEEP_MINUTE,
                wake_hour: DEFAULT_WAKE_HOUR,
                wake_minute: DEFAULT_WAKE_MINUTE,
                weekend_days: vec![Weekday::Sat, Weekday::Sun],
                bypass: false,
                poll_interval_secs: DEFAULT_SCHEDULE_POLL_SECS,
                flush_logs_after_sweep: true,
            },
            kiosk: KioskSettings {
                message_display_ms: DEFAULT_MESSAGE_DISPLAY_MS,
                tap_guard_ms: DEFAULT_TAP_GUARD_MS,
            },
            reader: ReaderSettings {
                poll_interval_ms: DEFAULT_READER_POLL_MS,
                stop_timeout_ms: DEFAULT_READER_STOP_TIMEOUT_MS,
            },
            database: DatabaseSettings {
                path: "rollcall.db".to_string(),
                max_connections: 5,
            },
            notifications: NotificationSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl Settings {
    /// Load settings from the embedded defaults, an optional file and the environment.
    ///
    /// When `path` is given the file must exist; otherwise `rollcall.toml`
    /// in the working directory is read if present.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a source cannot be parsed or the merged
    /// settings fail validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULTS, config::FileFormat::Toml));

        let builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(LOCAL_CONFIG).required(false)),
        };

        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("schedule.weekend_days"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        tracing::debug!(
            file = ?path,
            bypass = settings.schedule.bypass,
            "configuration loaded"
        );

        Ok(settings)
    }

    /// Load the embedded defaults with key overrides applied, skipping
    /// files and the environment.
    ///
    /// ```
    /// use rollcall_core::Settings;
    ///
    /// let settings = Settings::with_overrides(&[("schedule.bypass", "true")]).unwrap();
    /// assert!(settings.schedule.bypass);
    /// ```
    pub fn with_overrides(overrides: &[(&str, &str)]) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULTS, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let schedule = &self.schedule;
        let start = schedule.start()?;
        let cutoff = schedule.cutoff()?;
        schedule.sleep()?;
        schedule.wake()?;

        if start >= cutoff {
            return Err(Error::Config(format!(
                "sign-in start {start} must be before cutoff {cutoff}"
            )));
        }

        if schedule.poll_interval_secs == 0 {
            return Err(Error::Config(
                "schedule.poll_interval_secs must be positive".to_string(),
            ));
        }

        if self.reader.poll_interval_ms == 0 {
            return Err(Error::Config(
                "reader.poll_interval_ms must be positive".to_string(),
            ));
        }

        if self.notifications.queue_capacity == 0 {
            return Err(Error::Config(
                "notifications.queue_capacity must be positive".to_string(),
            ));
        }

        if let Some(url) = &self.notifications.webhook_url
            && !(url.starts_with("https://") || url.starts_with("http://"))
        {
            return Err(Error::Config(format!(
                "notifications.webhook_url must be an http(s) URL, got {url}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults_match_constants() {
        let loaded = Settings::with_overrides(&[]).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn test_overrides_applied() {
        let settings = Settings::with_overrides(&[
            ("schedule.start_hour", "8"),
            ("schedule.bypass", "true"),
            ("notifications.webhook_url", "https://chat.example/hook"),
        ])
        .unwrap();

        assert_eq!(settings.schedule.start_hour, 8);
        assert!(settings.schedule.bypass);
        assert_eq!(
            settings.notifications.webhook_url.as_deref(),
            Some("https://chat.example/hook")
        );
    }

    #[test]
    fn test_weekend_days_parsed() {
        let settings = Settings::default();
        assert_eq!(
            settings.schedule.weekend_days,
            vec![Weekday::Sat, Weekday::Sun]
        );
    }

    #[test]
    fn test_rejects_start_after_cutoff() {
        let result = Settings::with_overrides(&[("schedule.start_hour", "21")]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_invalid_minute() {
        let result = Settings::with_overrides(&[("schedule.sleep_minute", "75")]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_non_http_webhook() {
        let result = Settings::with_overrides(&[("notifications.webhook_url", "ftp://x")]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[schedule]\ncutoff_hour = 19\n[database]\npath = \"/tmp/kiosk.db\"").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.schedule.cutoff_hour, 19);
        assert_eq!(settings.database.path, "/tmp/kiosk.db");
        // untouched keys keep their defaults
        assert_eq!(settings.kiosk.message_display_ms, DEFAULT_MESSAGE_DISPLAY_MS);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = Settings::load(Some(Path::new("/nonexistent/rollcall.toml")));
        assert!(result.is_err());
    }
}
