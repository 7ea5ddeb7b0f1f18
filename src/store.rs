//! Durable settings and statistics.

use crate::models::{
    BoundPhase, Phase, PomodoroSession, PomodoroState, Settings, SettingsUpdate, Statistics,
    TimeBoundPomodoro,
};
use crate::persistence::{Database, DatabaseError, STATE_KEY};
use crate::validation::{self, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Refusing to save invalid state: {0}")]
    InvalidState(ValidationError),
    #[error("Invalid settings: {0}")]
    RejectedUpdate(ValidationError),
}

/// Owns the persisted snapshot and keeps the database in sync with it.
pub struct Store {
    db: Database,
    state: PomodoroState,
}

impl Store {
    /// Loads the snapshot from `db`, substituting defaults for anything
    /// missing or corrupt. Corrupt records are purged.
    pub fn load(db: Database) -> Self {
        let state = Self::load_state(&db);
        Self { db, state }
    }

    fn load_state(db: &Database) -> PomodoroState {
        let raw = match db.get(STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return PomodoroState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored state, using defaults");
                return PomodoroState::default();
            }
        };

        match validation::parse_stored_state(&raw) {
            Ok(state) => {
                tracing::debug!(settings = ?state.settings, "loaded stored state");
                state
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupt stored state");
                if let Err(e) = db.remove(STATE_KEY) {
                    tracing::warn!(error = %e, "failed to delete corrupt stored state");
                }
                PomodoroState::default()
            }
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &PomodoroState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn statistics(&self) -> &Statistics {
        &self.state.statistics
    }

    pub fn current_session(&self) -> Option<&PomodoroSession> {
        self.state.current_session.as_ref()
    }

    pub fn time_bound_session(&self) -> Option<&TimeBoundPomodoro> {
        self.state.time_bound_session.as_ref()
    }

    /// Validates `state` and writes it as a complete snapshot.
    ///
    /// A validation failure here means the caller produced an impossible
    /// state; it is logged at error level and nothing is written. The
    /// in-memory snapshot only changes once the write has succeeded.
    pub fn save(&mut self, state: PomodoroState) -> Result<(), StoreError> {
        if let Err(e) = validation::validate_state(&state) {
            tracing::error!(error = %e, ?state, "attempted to save invalid state");
            return Err(StoreError::InvalidState(e));
        }

        let json = serde_json::to_string(&state)?;
        self.db.set(STATE_KEY, &json)?;
        self.state = state;
        Ok(())
    }

    fn modify<F>(&mut self, updater: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut PomodoroState),
    {
        let mut next = self.state.clone();
        updater(&mut next);
        self.save(next)
    }

    /// Merges `update` into the current settings and persists the result.
    /// An update that would produce invalid settings changes nothing.
    pub fn update_settings(&mut self, update: &SettingsUpdate) -> Result<(), StoreError> {
        let merged = update.merged_into(&self.state.settings);
        validation::validate_settings(&merged).map_err(StoreError::RejectedUpdate)?;
        tracing::info!(?update, "updating settings");
        self.modify(|state| state.settings = merged)
    }

    /// Applies all statistics increments for one completed work phase, and
    /// advances the active time-bound plan, in a single write.
    pub fn record_completed_work(&mut self, work_duration_mins: u32) -> Result<(), StoreError> {
        self.modify(|state| {
            state.statistics.complete_pomodoro(work_duration_mins);
            if let Some(plan) = state.time_bound_session.as_mut() {
                plan.completed_sets = plan.completed_sets.saturating_add(1);
            }
        })
    }

    /// Marks the current session record finished and moves the plan on to `next`.
    pub fn finish_phase(&mut self, next: Phase) -> Result<(), StoreError> {
        self.modify(|state| {
            if let Some(session) = state.current_session.as_mut() {
                session.is_completed = true;
            }
            if let Some(plan) = state.time_bound_session.as_mut() {
                plan.current_phase = BoundPhase::from(next);
            }
        })
    }

    pub fn set_current_session(
        &mut self,
        session: Option<PomodoroSession>,
    ) -> Result<(), StoreError> {
        self.modify(|state| state.current_session = session)
    }

    pub fn set_time_bound_session(
        &mut self,
        plan: Option<TimeBoundPomodoro>,
    ) -> Result<(), StoreError> {
        self.modify(|state| state.time_bound_session = plan)
    }

    /// Explicit statistics reset; the only way counters go down.
    pub fn reset_statistics(&mut self) -> Result<(), StoreError> {
        tracing::info!("resetting statistics");
        self.modify(|state| state.statistics = Statistics::default())
    }

    #[cfg(test)]
    pub fn database(&self) -> &Database {
        &self.db
    }
}
