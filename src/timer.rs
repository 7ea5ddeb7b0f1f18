//! Pomodoro timer engine: countdown, phase transitions and tick bookkeeping.

use crate::models::{
    Phase, PomodoroSession, PushNotification, Settings, SettingsUpdate, Statistics,
    TimeBoundPomodoro, POMODOROS_PER_CYCLE,
};
use crate::notifications::{self, Notifier};
use crate::store::{Store, StoreError};
use crate::ticker::TickScheduler;
use chrono::{DateTime, Utc};

/// Emitted whenever a phase runs out.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseEnded {
    pub finished: Phase,
    pub next: Phase,
    /// Work phases completed since the last reset, including this one.
    pub completed_pomodoros: u32,
    /// Whether the user wants to see notifications; the event fires either way.
    pub notifications_enabled: bool,
    pub notification: PushNotification,
}

/// The timer engine. Owns the runtime state and the only tick source.
pub struct Timer {
    phase: Phase,
    time_left: u32,
    is_running: bool,
    completed_pomodoros: u32,
    store: Store,
    scheduler: Box<dyn TickScheduler>,
    notifier: Box<dyn Notifier>,
    generation: u64,
    active_tick: Option<u64>,
}

fn log_store_failure(result: Result<(), StoreError>, action: &str) {
    if let Err(e) = result {
        tracing::error!(error = %e, action, "failed to persist timer state");
    }
}

impl Timer {
    /// Creates a stopped timer at the start of a work phase.
    pub fn new(
        store: Store,
        scheduler: Box<dyn TickScheduler>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let time_left = store.settings().seconds_for(Phase::Work);
        Self {
            phase: Phase::Work,
            time_left,
            is_running: false,
            completed_pomodoros: 0,
            store,
            scheduler,
            notifier,
            generation: 0,
            active_tick: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Remaining seconds in the current phase.
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn completed_pomodoros(&self) -> u32 {
        self.completed_pomodoros
    }

    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn statistics(&self) -> &Statistics {
        self.store.statistics()
    }

    #[cfg(test)]
    pub fn current_session(&self) -> Option<&PomodoroSession> {
        self.store.current_session()
    }

    pub fn time_bound_session(&self) -> Option<&TimeBoundPomodoro> {
        self.store.time_bound_session()
    }

    fn phase_secs(&self) -> u32 {
        self.store.settings().seconds_for(self.phase)
    }

    /// Starts counting down. Does nothing if already running.
    pub fn start(&mut self) {
        if self.is_running {
            return;
        }

        self.is_running = true;
        self.generation += 1;
        self.active_tick = Some(self.generation);
        self.scheduler.start(self.generation);
        self.open_session();
        tracing::info!(phase = %self.phase, time_left = self.time_left, "timer started");
    }

    /// Stops counting down. Safe to call when already stopped.
    pub fn stop(&mut self) {
        self.cancel_ticks();
        if self.is_running {
            self.is_running = false;
            self.count_interruption();
            tracing::info!(phase = %self.phase, time_left = self.time_left, "timer stopped");
        }
    }

    /// Stops and returns to the start of a fresh work phase.
    /// Persisted statistics are left alone.
    pub fn reset(&mut self) {
        self.cancel_ticks();
        self.is_running = false;
        self.phase = Phase::Work;
        self.time_left = self.phase_secs();
        self.completed_pomodoros = 0;
        if self.store.current_session().is_some() {
            log_store_failure(self.store.set_current_session(None), "clear session");
        }
        tracing::info!("timer reset");
    }

    /// Handles a tick delivered by the scheduler. Ticks from a source that
    /// has since been cancelled are ignored.
    pub fn on_tick(&mut self, generation: u64) -> Option<PhaseEnded> {
        if self.active_tick != Some(generation) {
            tracing::debug!(generation, "ignoring stale tick");
            return None;
        }
        self.tick()
    }

    /// Advances the clock by one second. The tick that runs the clock out
    /// performs the phase transition before returning.
    pub fn tick(&mut self) -> Option<PhaseEnded> {
        if !self.is_running {
            return None;
        }

        if self.time_left > 1 {
            self.time_left -= 1;
            return None;
        }

        self.time_left = 0;
        self.cancel_ticks();
        self.is_running = false;
        Some(self.advance_phase())
    }

    /// Applies a partial settings change. While stopped, the remaining time
    /// is recomputed for the current phase; a running countdown keeps going
    /// and picks up the change at the next transition.
    pub fn update_settings(&mut self, update: &SettingsUpdate) -> Result<(), StoreError> {
        self.store.update_settings(update)?;
        if !self.is_running {
            self.time_left = self.phase_secs();
        }
        Ok(())
    }

    /// Starts the next phase on its own while an auto-advancing plan still
    /// has sets left before its target time. Returns whether it started.
    pub fn auto_advance(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_running {
            return false;
        }
        let advance = self
            .store
            .time_bound_session()
            .is_some_and(|plan| plan.should_auto_advance(now));
        if advance {
            tracing::info!(phase = %self.phase, "plan auto-advancing");
            self.start();
        }
        advance
    }

    /// Elapsed share of the current phase, 0 to 100.
    pub fn progress(&self) -> f64 {
        let total = self.phase_secs();
        if total == 0 {
            return 100.0;
        }
        let elapsed = f64::from(total) - f64::from(self.time_left);
        (elapsed / f64::from(total) * 100.0).clamp(0.0, 100.0)
    }

    /// Position within the current four-pomodoro cycle.
    pub fn set_progress(&self) -> (u32, u32) {
        (
            self.completed_pomodoros % POMODOROS_PER_CYCLE,
            POMODOROS_PER_CYCLE,
        )
    }

    /// Remaining time as `MM:SS`.
    pub fn format_time(&self) -> String {
        format_time(self.time_left)
    }

    /// Cancels the tick source ahead of teardown.
    pub fn shutdown(&mut self) {
        self.stop();
    }

    fn cancel_ticks(&mut self) {
        if self.active_tick.take().is_some() {
            self.scheduler.cancel();
        }
    }

    fn advance_phase(&mut self) -> PhaseEnded {
        let finished = self.phase;
        let next = match finished {
            Phase::Work => {
                self.completed_pomodoros += 1;
                let minutes = self.store.settings().work_duration;
                log_store_failure(
                    self.store.record_completed_work(minutes),
                    "record completed work",
                );
                if self.completed_pomodoros % POMODOROS_PER_CYCLE == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        };

        log_store_failure(self.store.finish_phase(next), "finish phase");

        self.phase = next;
        self.time_left = self.phase_secs();
        tracing::info!(
            %finished,
            %next,
            completed_pomodoros = self.completed_pomodoros,
            "phase ended"
        );

        let settings = self.store.settings();
        let event = PhaseEnded {
            finished,
            next,
            completed_pomodoros: self.completed_pomodoros,
            notifications_enabled: settings.notifications_enabled,
            notification: notifications::phase_end_notification(finished, next, settings),
        };
        self.notifier.phase_ended(&event);
        event
    }

    fn open_session(&mut self) {
        let resumable = self
            .store
            .current_session()
            .is_some_and(|session| !session.is_completed && session.session_type == self.phase);
        if resumable {
            return;
        }

        let duration = self.store.settings().minutes_for(self.phase);
        let session = PomodoroSession::begin(self.phase, duration, Utc::now());
        tracing::debug!(id = %session.id, phase = %self.phase, "opening session record");
        log_store_failure(self.store.set_current_session(Some(session)), "open session");
    }

    fn count_interruption(&mut self) {
        let Some(mut session) = self.store.current_session().cloned() else {
            return;
        };
        if session.is_completed {
            return;
        }
        session.interruptions = session.interruptions.saturating_add(1);
        log_store_failure(
            self.store.set_current_session(Some(session)),
            "count interruption",
        );
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel_ticks();
    }
}

/// Formats seconds as `MM:SS`.
pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Formats a minute total as hours and minutes, e.g. `2h 05m`.
pub fn format_work_time(minutes: u64) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}
