//! Desktop notifications for phase endings.

use crate::models::{Phase, PushNotification, Settings};
use crate::timer::PhaseEnded;
use crate::validation::{self, DEFAULT_TAG};
use notify_rust::{Notification, Timeout};
use std::thread;
use url::Url;

const APP_NAME: &str = "pomotick";

/// Receives phase-end events from the timer.
pub trait Notifier {
    fn phase_ended(&mut self, event: &PhaseEnded);
}

/// Shows phase-end events as system notifications when the user allows it.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn phase_ended(&mut self, event: &PhaseEnded) {
        if !event.notifications_enabled {
            tracing::debug!(finished = %event.finished, "notifications disabled, skipping");
            return;
        }
        if let Err(e) = validation::validate_notification(&event.notification) {
            tracing::error!(
                error = %e,
                notification = ?event.notification,
                "refusing to show invalid notification"
            );
            return;
        }
        show(event.notification.clone());
    }
}

/// Builds the notification announcing that `finished` is over.
pub fn phase_end_notification(
    finished: Phase,
    next: Phase,
    settings: &Settings,
) -> PushNotification {
    let next_mins = settings.minutes_for(next);
    let (title, body) = match (finished, next) {
        (Phase::Work, Phase::LongBreak) => (
            "Long break time! 🎉".to_string(),
            format!("You've earned a {next_mins} minute break. Great job staying focused!"),
        ),
        (Phase::Work, _) => (
            "Pomodoro complete! 🍅".to_string(),
            format!("Great work! Time for a {next_mins} minute break."),
        ),
        _ => (
            "Break over! ☕".to_string(),
            format!("Ready for the next {next_mins} minute pomodoro?"),
        ),
    };

    PushNotification {
        title,
        body,
        icon: None,
        tag: DEFAULT_TAG.to_string(),
        require_interaction: true,
    }
}

/// Local file path for icons given as `file://` URLs. Other icon references
/// cannot be shown by the desktop notification daemon.
fn icon_path(icon: &str) -> Option<String> {
    let url = Url::parse(icon).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    let path = url.to_file_path().ok()?;
    Some(path.to_string_lossy().into_owned())
}

/// Displays `notification`.
/// Runs in a background thread to avoid blocking.
pub fn show(notification: PushNotification) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut builder = Notification::new();
        builder
            .appname(APP_NAME)
            .summary(&notification.title)
            .body(&notification.body);

        if let Some(path) = notification.icon.as_deref().and_then(icon_path) {
            builder.icon(&path);
        }
        if notification.require_interaction {
            builder.timeout(Timeout::Never);
        }

        tracing::debug!(
            tag = %notification.tag,
            title = %notification.title,
            "showing notification"
        );
        if let Err(e) = builder.show() {
            tracing::warn!(error = %e, "failed to show notification");
        }
    })
}
