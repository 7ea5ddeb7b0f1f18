//! Interactive command handling for the run loop.

use crate::models::{Phase, SettingsUpdate};
use crate::timer::Timer;
use crate::validation;
use thiserror::Error;

/// Everything the run loop reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// One second elapsed on the tick source with this generation.
    Tick(u64),
    /// A line typed by the user.
    Input(String),
    /// Standard input was closed.
    InputClosed,
}

/// A parsed interactive command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Reset,
    Status,
    Stats,
    Set(SettingsUpdate),
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (type 'help')")]
    Unknown(String),
    #[error("Usage: set <work|short|long> <minutes> | set <notifications|wake-lock> <on|off>")]
    SetUsage,
    #[error("Expected on or off, got '{0}'")]
    Toggle(String),
}

/// Result of handling a command.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// Timer state changed, status line needs update.
    StateChanged,
    /// Settings changed; status line needs update.
    SettingsChanged,
    /// Settings update was refused.
    SettingsRejected(String),
    ShowStats,
    ShowHelp,
    /// User requested quit.
    Quit,
}

pub const HELP: &str = "\
Commands:
  start                     start or resume the current phase
  stop                      pause the current phase
  reset                     back to a fresh work phase
  status                    show the current phase
  stats                     show statistics
  set work|short|long <min> change a phase duration
  set notifications on|off  toggle desktop notifications
  set wake-lock on|off      toggle keeping the screen awake
  quit                      exit";

fn parse_set(args: &[&str]) -> Result<SettingsUpdate, CommandError> {
    let [field, value] = args else {
        return Err(CommandError::SetUsage);
    };

    let mut update = SettingsUpdate::default();
    let phase = match *field {
        "work" => Some(Phase::Work),
        "short" | "short-break" => Some(Phase::ShortBreak),
        "long" | "long-break" => Some(Phase::LongBreak),
        _ => None,
    };
    if let Some(phase) = phase {
        update.set_minutes(phase, validation::sanitize_duration(phase, value));
        return Ok(update);
    }

    let toggle =
        validation::parse_toggle(value).ok_or_else(|| CommandError::Toggle(value.to_string()))?;
    match *field {
        "notifications" | "notify" => update.notifications_enabled = Some(toggle),
        "wake-lock" | "wakelock" => update.wake_lock_enabled = Some(toggle),
        _ => return Err(CommandError::SetUsage),
    }
    Ok(update)
}

/// Parses one line of user input.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, args)) = words.split_first() else {
        return Ok(Command::Status);
    };

    match name.to_ascii_lowercase().as_str() {
        "start" | "s" => Ok(Command::Start),
        "stop" | "pause" | "p" => Ok(Command::Stop),
        "reset" | "r" => Ok(Command::Reset),
        "status" => Ok(Command::Status),
        "stats" => Ok(Command::Stats),
        "set" => parse_set(args).map(Command::Set),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// Applies a command to the timer.
pub fn handle_command(timer: &mut Timer, command: Command) -> EventResult {
    match command {
        Command::Start => {
            timer.start();
            EventResult::StateChanged
        }
        Command::Stop => {
            timer.stop();
            EventResult::StateChanged
        }
        Command::Reset => {
            timer.reset();
            EventResult::StateChanged
        }
        Command::Status => EventResult::StateChanged,
        Command::Stats => EventResult::ShowStats,
        Command::Set(update) => match timer.update_settings(&update) {
            Ok(()) => EventResult::SettingsChanged,
            Err(e) => EventResult::SettingsRejected(e.to_string()),
        },
        Command::Help => EventResult::ShowHelp,
        Command::Quit => EventResult::Quit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::Notifier;
    use crate::persistence::Database;
    use crate::store::Store;
    use crate::ticker::TickScheduler;
    use crate::timer::PhaseEnded;

    struct NoTicks;

    impl TickScheduler for NoTicks {
        fn start(&mut self, _generation: u64) {}
        fn cancel(&mut self) {}
    }

    struct Silent;

    impl Notifier for Silent {
        fn phase_ended(&mut self, _event: &PhaseEnded) {}
    }

    fn create_test_timer() -> Timer {
        let store = Store::load(Database::new_in_memory().unwrap());
        Timer::new(store, Box::new(NoTicks), Box::new(Silent))
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("start"), Ok(Command::Start));
        assert_eq!(parse_command("  STOP "), Ok(Command::Stop));
        assert_eq!(parse_command("pause"), Ok(Command::Stop));
        assert_eq!(parse_command("reset"), Ok(Command::Reset));
        assert_eq!(parse_command(""), Ok(Command::Status));
        assert_eq!(parse_command("stats"), Ok(Command::Stats));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert_eq!(
            parse_command("dance"),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn test_parse_set_duration() {
        let Ok(Command::Set(update)) = parse_command("set work 50") else {
            panic!("expected set command");
        };
        assert_eq!(update.work_duration, Some(50));
        assert_eq!(update.short_break_duration, None);
    }

    #[test]
    fn test_parse_set_duration_sanitizes() {
        let Ok(Command::Set(update)) = parse_command("set short abc") else {
            panic!("expected set command");
        };
        assert_eq!(update.short_break_duration, Some(5));

        let Ok(Command::Set(update)) = parse_command("set long 999") else {
            panic!("expected set command");
        };
        assert_eq!(update.long_break_duration, Some(60));
    }

    #[test]
    fn test_parse_set_toggles() {
        let Ok(Command::Set(update)) = parse_command("set notifications off") else {
            panic!("expected set command");
        };
        assert_eq!(update.notifications_enabled, Some(false));

        let Ok(Command::Set(update)) = parse_command("set wake-lock on") else {
            panic!("expected set command");
        };
        assert_eq!(update.wake_lock_enabled, Some(true));

        assert_eq!(
            parse_command("set notifications sometimes"),
            Err(CommandError::Toggle("sometimes".to_string()))
        );
    }

    #[test]
    fn test_parse_set_usage_errors() {
        assert_eq!(parse_command("set"), Err(CommandError::SetUsage));
        assert_eq!(parse_command("set work"), Err(CommandError::SetUsage));
        assert_eq!(parse_command("set colour on"), Err(CommandError::SetUsage));
    }

    #[test]
    fn test_handle_start_stop_reset() {
        let mut timer = create_test_timer();

        assert_eq!(
            handle_command(&mut timer, Command::Start),
            EventResult::StateChanged
        );
        assert!(timer.is_running());

        handle_command(&mut timer, Command::Stop);
        assert!(!timer.is_running());

        timer.start();
        timer.tick();
        handle_command(&mut timer, Command::Reset);
        assert_eq!(timer.time_left(), 1500);
    }

    #[test]
    fn test_handle_set() {
        let mut timer = create_test_timer();
        let Ok(command) = parse_command("set work 50") else {
            panic!("expected set command");
        };

        assert_eq!(
            handle_command(&mut timer, command),
            EventResult::SettingsChanged
        );
        assert_eq!(timer.time_left(), 3000);
    }

    #[test]
    fn test_handle_set_rejected() {
        let mut timer = create_test_timer();
        let update = SettingsUpdate {
            work_duration: Some(0),
            ..SettingsUpdate::default()
        };

        let result = handle_command(&mut timer, Command::Set(update));
        assert!(matches!(result, EventResult::SettingsRejected(_)));
        assert_eq!(timer.settings().work_duration, 25);
    }

    #[test]
    fn test_handle_display_commands() {
        let mut timer = create_test_timer();
        assert_eq!(handle_command(&mut timer, Command::Stats), EventResult::ShowStats);
        assert_eq!(handle_command(&mut timer, Command::Help), EventResult::ShowHelp);
        assert_eq!(handle_command(&mut timer, Command::Quit), EventResult::Quit);
    }
}
