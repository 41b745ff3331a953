//! Terminal front end for `rollcall run`.
//!
//! Standard input doubles as a keyboard-wedge reader: every line is a card
//! id unless it starts with `/`, which makes it an operator command.

use std::io::BufRead;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use rollcall_kiosk::{KioskCommand, KioskSnapshot};

pub const HELP: &str =
    "commands: /register, /position NAME, /override on|off, /submit, /hours, /done, /quit";

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Card(String),
    Command(KioskCommand),
    Invalid(String),
    Blank,
}

pub fn parse_line(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Blank;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ConsoleInput::Card(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let command = match (name, arg) {
        ("register", "") => KioskCommand::EnterRegistration,
        ("position", position) if !position.is_empty() => {
            KioskCommand::SelectPosition(position.to_string())
        }
        ("override", "on") => KioskCommand::SetOverride(true),
        ("override", "off") => KioskCommand::SetOverride(false),
        ("submit", "") => KioskCommand::Submit,
        ("hours", "") => KioskCommand::EnterHoursCheck,
        ("done", "") => KioskCommand::Done,
        ("quit", "") => KioskCommand::Shutdown,
        _ => return ConsoleInput::Invalid(line.to_string()),
    };
    ConsoleInput::Command(command)
}

/// Feed lines to the wedge reader and the kiosk until input ends.
///
/// Blocking; runs on its own thread so a pending read of standard input
/// never holds up runtime shutdown. End of input shuts the kiosk down.
pub fn forward_lines(
    input: impl BufRead,
    cards: &mpsc::Sender<String>,
    commands: &mpsc::Sender<KioskCommand>,
) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to read standard input");
                break;
            }
        };

        let delivered = match parse_line(&line) {
            ConsoleInput::Card(id) => cards.blocking_send(id).is_ok(),
            ConsoleInput::Command(command) => commands.blocking_send(command).is_ok(),
            ConsoleInput::Invalid(input) => {
                eprintln!("unknown command: {input}");
                eprintln!("{HELP}");
                true
            }
            ConsoleInput::Blank => true,
        };
        if !delivered {
            debug!("kiosk stopped, no longer reading input");
            return;
        }
    }

    debug!("input closed");
    let _ = commands.blocking_send(KioskCommand::Shutdown);
}

/// Print the screen whenever it changes, until the kiosk goes away.
pub async fn print_snapshots(mut snapshot: watch::Receiver<KioskSnapshot>) {
    let mut shown_screen = String::new();
    let mut shown_log: Option<String> = None;

    loop {
        let (screen, log) = {
            let current = snapshot.borrow_and_update();
            (render(&current), current.last_log.clone())
        };

        if log != shown_log {
            if let Some(line) = &log {
                println!("  {line}");
            }
            shown_log = log;
        }
        if screen != shown_screen {
            println!("{screen}");
            shown_screen = screen;
        }

        if snapshot.changed().await.is_err() {
            break;
        }
    }
}

pub fn render(snapshot: &KioskSnapshot) -> String {
    if !snapshot.visible {
        return format!("[{}] display off", snapshot.mode);
    }

    let mut out = format!("[{}] {}", snapshot.mode, snapshot.status);
    if !snapshot.positions.is_empty() {
        out.push_str("\n  positions: ");
        out.push_str(&snapshot.positions.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_kiosk::{KioskMode, Tone};
    use rstest::rstest;

    #[rstest]
    #[case("0004567890", ConsoleInput::Card("0004567890".into()))]
    #[case("  abc123 \n", ConsoleInput::Card("abc123".into()))]
    #[case("", ConsoleInput::Blank)]
    #[case("/register", ConsoleInput::Command(KioskCommand::EnterRegistration))]
    #[case(
        "/position Vice President",
        ConsoleInput::Command(KioskCommand::SelectPosition("Vice President".into()))
    )]
    #[case("/override on", ConsoleInput::Command(KioskCommand::SetOverride(true)))]
    #[case("/override off", ConsoleInput::Command(KioskCommand::SetOverride(false)))]
    #[case("/submit", ConsoleInput::Command(KioskCommand::Submit))]
    #[case("/hours", ConsoleInput::Command(KioskCommand::EnterHoursCheck))]
    #[case("/done", ConsoleInput::Command(KioskCommand::Done))]
    #[case("/quit", ConsoleInput::Command(KioskCommand::Shutdown))]
    #[case("/position", ConsoleInput::Invalid("/position".into()))]
    #[case("/override maybe", ConsoleInput::Invalid("/override maybe".into()))]
    #[case("/dance", ConsoleInput::Invalid("/dance".into()))]
    fn test_parse_line(#[case] line: &str, #[case] expected: ConsoleInput) {
        assert_eq!(parse_line(line), expected);
    }

    fn snapshot(mode: KioskMode, visible: bool) -> KioskSnapshot {
        KioskSnapshot {
            mode,
            visible,
            status: "Tap a card to register".into(),
            tone: Some(Tone::Info),
            last_log: None,
            screen: Vec::new(),
            positions: vec!["Treasurer".into(), "Secretary".into()],
        }
    }

    #[test]
    fn test_render_lists_positions() {
        let rendered = render(&snapshot(KioskMode::Registration, true));
        assert!(rendered.ends_with("Tap a card to register\n  positions: Treasurer, Secretary"));
    }

    #[test]
    fn test_forward_lines_routes_cards_and_commands() {
        let (cards_tx, mut cards) = mpsc::channel(8);
        let (commands_tx, mut commands) = mpsc::channel(8);
        let input = std::io::Cursor::new("123456\n\n/bogus\n/register\nabc\n");

        forward_lines(input, &cards_tx, &commands_tx);

        assert_eq!(cards.try_recv().unwrap(), "123456");
        assert_eq!(cards.try_recv().unwrap(), "abc");
        assert!(cards.try_recv().is_err());
        assert_eq!(commands.try_recv().unwrap(), KioskCommand::EnterRegistration);
        // end of input
        assert_eq!(commands.try_recv().unwrap(), KioskCommand::Shutdown);
    }

    #[test]
    fn test_forward_lines_stops_when_kiosk_is_gone() {
        let (cards_tx, cards) = mpsc::channel(8);
        let (commands_tx, mut commands) = mpsc::channel(8);
        drop(cards);

        forward_lines(std::io::Cursor::new("123456\n/hours\n"), &cards_tx, &commands_tx);

        assert!(commands.try_recv().is_err());
    }

    #[test]
    fn test_render_hidden_display() {
        let rendered = render(&snapshot(KioskMode::Asleep, false));
        assert!(rendered.ends_with("display off"));
    }
}
