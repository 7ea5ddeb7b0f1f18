//! Command-line interface definitions.

use crate::models::{Phase, SettingsUpdate};
use crate::validation;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// A terminal Pomodoro timer.
#[derive(Parser, Debug)]
#[command(name = "pomotick", version, about)]
pub struct Cli {
    /// Path to the state database.
    #[arg(long, global = true, env = "POMOTICK_DB")]
    pub db: Option<PathBuf>,

    /// Enable debug logging (otherwise RUST_LOG is respected).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interactive timer (default).
    Run,
    /// Show or change settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show or reset statistics.
    Stats {
        #[command(subcommand)]
        action: Option<StatsAction>,
    },
    /// Plan pomodoros until a time of day.
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
    /// Display a notification from an externally delivered JSON payload.
    Notify {
        /// Raw JSON payload; invalid fields fall back to defaults.
        #[arg(long)]
        payload: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the current settings.
    Show,
    /// Change one or more settings.
    Set(SettingsArgs),
}

/// Durations are taken as text so that unparseable input can fall back to
/// the field default instead of aborting.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Work duration in minutes (1-120).
    #[arg(long)]
    pub work: Option<String>,
    /// Short break duration in minutes (1-30).
    #[arg(long)]
    pub short: Option<String>,
    /// Long break duration in minutes (1-60).
    #[arg(long)]
    pub long: Option<String>,
    /// Show desktop notifications when a phase ends.
    #[arg(long)]
    pub notifications: Option<bool>,
    /// Keep the screen awake while the timer runs.
    #[arg(long)]
    pub wake_lock: Option<bool>,
}

impl SettingsArgs {
    /// Converts the flags into a sanitized partial update.
    pub fn to_update(&self) -> SettingsUpdate {
        let mut update = SettingsUpdate {
            notifications_enabled: self.notifications,
            wake_lock_enabled: self.wake_lock,
            ..SettingsUpdate::default()
        };
        for (phase, input) in [
            (Phase::Work, &self.work),
            (Phase::ShortBreak, &self.short),
            (Phase::LongBreak, &self.long),
        ] {
            if let Some(input) = input {
                update.set_minutes(phase, validation::sanitize_duration(phase, input));
            }
        }
        update
    }
}

#[derive(Subcommand, Debug)]
pub enum StatsAction {
    /// Print statistics.
    Show,
    /// Zero all statistics.
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum PlanAction {
    /// Work until HH:MM today.
    Until {
        /// Target time of day, e.g. 17:30.
        time: String,
        /// Wait for `start` after each phase instead of continuing.
        #[arg(long)]
        no_auto_advance: bool,
    },
    /// Print the active plan.
    Show,
    /// Remove the active plan.
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["pomotick"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_settings_set() {
        let cli = Cli::try_parse_from([
            "pomotick",
            "settings",
            "set",
            "--work",
            "50",
            "--notifications",
            "false",
        ])
        .unwrap();
        let Some(Commands::Settings {
            action: SettingsAction::Set(args),
        }) = cli.command
        else {
            panic!("expected settings set");
        };
        let update = args.to_update();
        assert_eq!(update.work_duration, Some(50));
        assert_eq!(update.notifications_enabled, Some(false));
        assert_eq!(update.short_break_duration, None);
    }

    #[test]
    fn test_settings_args_sanitize() {
        let args = SettingsArgs {
            work: Some("lots".to_string()),
            short: Some("45".to_string()),
            long: Some("0".to_string()),
            ..SettingsArgs::default()
        };
        let update = args.to_update();
        assert_eq!(update.work_duration, Some(25));
        assert_eq!(update.short_break_duration, Some(30));
        assert_eq!(update.long_break_duration, Some(15));
    }

    #[test]
    fn test_parse_plan_until() {
        let cli =
            Cli::try_parse_from(["pomotick", "--db", "/tmp/x.db", "plan", "until", "17:30"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(
            cli.command,
            Some(Commands::Plan {
                action: PlanAction::Until {
                    no_auto_advance: false,
                    ..
                }
            })
        ));
    }
}
