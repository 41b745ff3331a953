//! Rollcall kiosk
//!
//! Runs the attendance kiosk on a terminal, with standard input acting as
//! the card reader, and exposes the directory operations as one-shot
//! commands.

mod console;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall_core::{CardId, Clock, Settings, SystemClock};
use rollcall_hardware::wedge::WedgeRfid;
use rollcall_hardware::{AnyRfidDevice, CardReader, ReaderConfig};
use rollcall_kiosk::{
    ActivityLog, AnySink, Kiosk, KioskCommand, KioskHandle, Notifier, RegistrationWorkflow,
    ScheduleController, SchedulePolicy, WebhookSink, registration_status, spawn_notifier,
    weekly_hours,
};
use rollcall_storage::{
    AttendanceStore, Database, DatabaseConfig, NewMember, SqliteAttendanceStore,
};

const WEDGE_QUEUE: usize = 32;

/// How long pending notifications may take to go out on shutdown.
const NOTIFIER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(version, about = "RFID attendance kiosk")]
struct Cli {
    /// Configuration file (defaults to ./rollcall.toml if present)
    #[arg(long, global = true, env = "ROLLCALL_CONFIG")]
    config: Option<PathBuf>,

    /// Output logs as JSON, overriding `logging.json`
    #[arg(long, global = true, env = "ROLLCALL_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the kiosk, reading card ids and /commands from standard input
    Run,

    /// List the positions available for registration
    Positions,

    /// Bind a card to the member holding a position
    Register {
        #[arg(long)]
        position: String,

        #[arg(long)]
        card: String,

        /// Take the card from its current owner, or replace the position's card
        #[arg(long = "override")]
        override_existing: bool,
    },

    /// Show this week's hours for a card
    Hours {
        #[arg(long)]
        card: String,
    },

    /// Sign out every present member now
    Sweep,

    /// Add a member record
    AddMember {
        #[arg(long)]
        name: String,

        #[arg(long)]
        position: String,

        #[arg(long)]
        card: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&settings.logging.level, settings.logging.json || cli.log_json);

    let db = Database::new(DatabaseConfig::from(&settings.database))
        .await
        .with_context(|| format!("failed to open database {}", settings.database.path))?;
    let store = Arc::new(SqliteAttendanceStore::new(&db));

    let result = match cli.command {
        Command::Run => run_kiosk(&settings, store).await,
        Command::Positions => list_positions(store).await,
        Command::Register {
            position,
            card,
            override_existing,
        } => register(store, &position, &card, override_existing).await,
        Command::Hours { card } => hours(&store, &card).await,
        Command::Sweep => sweep(&settings, store).await,
        Command::AddMember {
            name,
            position,
            card,
        } => add_member(&store, name, position, card).await,
    };

    db.close().await;
    result
}

/// Initialise the global tracing subscriber on stderr, leaving stdout to
/// the console. `RUST_LOG` wins over `default_filter`.
fn init_tracing(default_filter: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_kiosk(settings: &Settings, store: Arc<SqliteAttendanceStore>) -> anyhow::Result<()> {
    let (notifier, notifier_task) = match &settings.notifications.webhook_url {
        Some(url) => {
            let sink = WebhookSink::new(
                url.clone(),
                Duration::from_secs(settings.notifications.timeout_secs),
            )?;
            let (notifier, task) = spawn_notifier(
                AnySink::Webhook(sink),
                settings.notifications.queue_capacity,
            );
            (notifier, Some(task))
        }
        None => {
            info!("no webhook configured, notifications disabled");
            (Notifier::disabled(), None)
        }
    };

    let (device, cards) = WedgeRfid::channel(WEDGE_QUEUE);
    let (reader, events) = CardReader::new(
        AnyRfidDevice::Wedge(device),
        ReaderConfig::default()
            .with_poll_interval(settings.reader.poll_interval())
            .with_stop_timeout(settings.reader.stop_timeout()),
    );
    if let Ok(info) = reader.reader_info().await {
        info!(reader = %info.name, has_led = info.has_led, "card reader attached");
    }
    let (kiosk, handle) = Kiosk::new(settings, store, SystemClock, reader, events, notifier)?;
    let KioskHandle { commands, snapshot } = handle;

    let input_commands = commands.clone();
    std::thread::spawn(move || {
        console::forward_lines(std::io::stdin().lock(), &cards, &input_commands);
    });
    let printer = tokio::spawn(console::print_snapshots(snapshot));
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
            let _ = commands.send(KioskCommand::Shutdown).await;
        }
    });

    eprintln!("{}", console::HELP);
    info!(
        version = rollcall_core::VERSION,
        bypass = settings.schedule.bypass,
        "kiosk running"
    );
    let result = kiosk.run().await;

    signal.abort();
    let _ = printer.await;

    // the kiosk dropped its notifier, so the worker ends once the queue is empty
    if let Some(task) = notifier_task
        && tokio::time::timeout(NOTIFIER_DRAIN_TIMEOUT, task).await.is_err()
    {
        warn!("pending notifications dropped on shutdown");
    }

    result.context("kiosk stopped with an error")
}

async fn list_positions(store: Arc<SqliteAttendanceStore>) -> anyhow::Result<()> {
    let positions = RegistrationWorkflow::new(store).positions().await?;
    if positions.is_empty() {
        println!("no positions with members");
    }
    for position in positions {
        println!("{position}");
    }
    Ok(())
}

async fn register(
    store: Arc<SqliteAttendanceStore>,
    position: &str,
    card: &str,
    override_existing: bool,
) -> anyhow::Result<()> {
    let card = CardId::new(card)?;
    let result = RegistrationWorkflow::new(store)
        .register(position, &card, override_existing)
        .await;

    println!("{}", registration_status(&result).text);
    let registration = result?;
    if let Some(replaced) = &registration.replaced_card {
        println!("replaced card {replaced}");
    }
    Ok(())
}

async fn hours(store: &SqliteAttendanceStore, card: &str) -> anyhow::Result<()> {
    let card = CardId::new(card)?;
    let report = weekly_hours(store, &card, SystemClock.now()).await?;
    for line in report.lines() {
        println!("{line}");
    }
    Ok(())
}

async fn sweep(settings: &Settings, store: Arc<SqliteAttendanceStore>) -> anyhow::Result<()> {
    let policy = SchedulePolicy::from_settings(&settings.schedule)?;
    let mut log = ActivityLog::default();

    let report = ScheduleController::new(store, policy)
        .sweep(SystemClock.now(), &mut log)
        .await;

    if report.signed_out.is_empty() {
        println!("nobody was signed in");
    } else {
        println!("signed out: {}", report.signed_out.join(", "));
    }
    if !report.repaired.is_empty() {
        println!("presence repaired for {} member(s)", report.repaired.len());
    }
    if !report.closed_by_tap.is_empty() {
        println!("{} member(s) signed out by card meanwhile", report.closed_by_tap.len());
    }
    for failure in &report.failures {
        match failure.member_id {
            Some(id) => eprintln!("member {id}: {}", failure.error),
            None => eprintln!("{}", failure.error),
        }
    }

    if report.failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} failure(s) during sweep", report.failures.len())
    }
}

async fn add_member(
    store: &SqliteAttendanceStore,
    name: String,
    position: String,
    card: Option<String>,
) -> anyhow::Result<()> {
    let mut member = NewMember::new(name, position);
    member.rfid_tag = card
        .as_deref()
        .map(CardId::new)
        .transpose()?
        .map(|card| card.as_str().to_string());

    let member = store.create_member(&member).await?;
    println!("added {} with id {}", member.label(), member.id);
    Ok(())
}
