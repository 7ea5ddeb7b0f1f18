//! Data models for the pomotick application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use uuid::Uuid;

/// Number of pomodoros in a full cycle; the last one earns a long break.
pub const POMODOROS_PER_CYCLE: u32 = 4;

/// The three interval kinds the timer alternates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Focused work interval.
    #[default]
    Work,
    /// Break after a regular pomodoro.
    ShortBreak,
    /// Break after every fourth pomodoro.
    LongBreak,
}

impl Phase {
    /// Allowed duration in minutes for this phase.
    pub fn duration_bounds(self) -> RangeInclusive<u32> {
        match self {
            Self::Work => 1..=120,
            Self::ShortBreak => 1..=30,
            Self::LongBreak => 1..=60,
        }
    }

    /// Duration used when nothing valid was configured.
    pub fn default_minutes(self) -> u32 {
        match self {
            Self::Work => 25,
            Self::ShortBreak => 5,
            Self::LongBreak => 15,
        }
    }

    /// Name of the settings field holding this phase's duration.
    pub fn settings_field(self) -> &'static str {
        match self {
            Self::Work => "workDuration",
            Self::ShortBreak => "shortBreakDuration",
            Self::LongBreak => "longBreakDuration",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Work => "Work",
            Self::ShortBreak => "Short break",
            Self::LongBreak => "Long break",
        };
        f.write_str(label)
    }
}

fn default_work_duration() -> u32 {
    Phase::Work.default_minutes()
}

fn default_short_break_duration() -> u32 {
    Phase::ShortBreak.default_minutes()
}

fn default_long_break_duration() -> u32 {
    Phase::LongBreak.default_minutes()
}

fn default_true() -> bool {
    true
}

/// User-configurable settings for the pomodoro timer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Duration of a work session in minutes.
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    /// Duration of a short break in minutes.
    #[serde(default = "default_short_break_duration")]
    pub short_break_duration: u32,
    /// Duration of a long break in minutes.
    #[serde(default = "default_long_break_duration")]
    pub long_break_duration: u32,
    /// Whether to show system notifications.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    /// Whether the host should keep the screen awake while running.
    #[serde(default)]
    pub wake_lock_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            short_break_duration: default_short_break_duration(),
            long_break_duration: default_long_break_duration(),
            notifications_enabled: true,
            wake_lock_enabled: false,
        }
    }
}

impl Settings {
    /// Configured duration of `phase` in minutes.
    pub fn minutes_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_duration,
            Phase::ShortBreak => self.short_break_duration,
            Phase::LongBreak => self.long_break_duration,
        }
    }

    /// Configured duration of `phase` in seconds.
    pub fn seconds_for(&self, phase: Phase) -> u32 {
        self.minutes_for(phase) * 60
    }
}

/// A partial settings change. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub work_duration: Option<u32>,
    pub short_break_duration: Option<u32>,
    pub long_break_duration: Option<u32>,
    pub notifications_enabled: Option<bool>,
    pub wake_lock_enabled: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns `current` with every set field overwritten.
    pub fn merged_into(&self, current: &Settings) -> Settings {
        Settings {
            work_duration: self.work_duration.unwrap_or(current.work_duration),
            short_break_duration: self
                .short_break_duration
                .unwrap_or(current.short_break_duration),
            long_break_duration: self
                .long_break_duration
                .unwrap_or(current.long_break_duration),
            notifications_enabled: self
                .notifications_enabled
                .unwrap_or(current.notifications_enabled),
            wake_lock_enabled: self.wake_lock_enabled.unwrap_or(current.wake_lock_enabled),
        }
    }

    /// Sets the duration field belonging to `phase`.
    pub fn set_minutes(&mut self, phase: Phase, minutes: u32) {
        match phase {
            Phase::Work => self.work_duration = Some(minutes),
            Phase::ShortBreak => self.short_break_duration = Some(minutes),
            Phase::LongBreak => self.long_break_duration = Some(minutes),
        }
    }
}

/// Cumulative statistics. Only the explicit statistics reset lowers them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Number of completed work phases.
    #[serde(default)]
    pub completed_sessions: u32,
    /// Minutes of completed work, counted at the configured duration.
    #[serde(default)]
    pub total_work_time: u64,
    /// Consecutive completed work phases.
    #[serde(default)]
    pub streak: u32,
}

impl Statistics {
    /// Records completion of a work phase of `duration_mins`.
    pub fn complete_pomodoro(&mut self, duration_mins: u32) {
        self.completed_sessions = self.completed_sessions.saturating_add(1);
        self.total_work_time = self.total_work_time.saturating_add(u64::from(duration_mins));
        self.streak = self.streak.saturating_add(1);
    }
}

/// Record of the phase currently (or most recently) being timed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSession {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    /// Planned length in minutes.
    pub duration: u32,
    #[serde(rename = "type")]
    pub session_type: Phase,
    #[serde(default)]
    pub is_completed: bool,
    /// Number of times the running phase was stopped.
    #[serde(default)]
    pub interruptions: u32,
}

impl PomodoroSession {
    pub fn begin(phase: Phase, duration: u32, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            duration,
            session_type: phase,
            is_completed: false,
            interruptions: 0,
        }
    }
}

/// Phase naming used by time-bound plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundPhase {
    #[default]
    Work,
    Break,
    LongBreak,
}

impl From<Phase> for BoundPhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Work => Self::Work,
            Phase::ShortBreak => Self::Break,
            Phase::LongBreak => Self::LongBreak,
        }
    }
}

/// A "work until HH:MM" plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeBoundPomodoro {
    pub target_time: DateTime<Utc>,
    pub estimated_sets: u32,
    pub completed_sets: u32,
    pub current_phase: BoundPhase,
    #[serde(default = "default_true")]
    pub auto_advance: bool,
}

impl TimeBoundPomodoro {
    /// Whether the host should start the next phase without waiting for input.
    pub fn should_auto_advance(&self, now: DateTime<Utc>) -> bool {
        self.auto_advance && self.completed_sets < self.estimated_sets && now < self.target_time
    }
}

/// The complete persisted snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroState {
    /// Key must be present, `null` allowed.
    #[serde(deserialize_with = "Option::deserialize")]
    pub current_session: Option<PomodoroSession>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub time_bound_session: Option<TimeBoundPomodoro>,
    pub settings: Settings,
    pub statistics: Statistics,
}

/// Payload of a user-visible notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub tag: String,
    pub require_interaction: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.work_duration, 25);
        assert_eq!(settings.short_break_duration, 5);
        assert_eq!(settings.long_break_duration, 15);
        assert!(settings.notifications_enabled);
        assert!(!settings.wake_lock_enabled);
    }

    #[test]
    fn test_settings_seconds_for_phase() {
        let settings = Settings {
            work_duration: 50,
            short_break_duration: 10,
            long_break_duration: 30,
            ..Settings::default()
        };
        assert_eq!(settings.seconds_for(Phase::Work), 3000);
        assert_eq!(settings.seconds_for(Phase::ShortBreak), 600);
        assert_eq!(settings.seconds_for(Phase::LongBreak), 1800);
    }

    #[test]
    fn test_settings_missing_fields_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"workDuration": 40}"#).unwrap();
        assert_eq!(settings.work_duration, 40);
        assert_eq!(settings.short_break_duration, 5);
        assert_eq!(settings.long_break_duration, 15);
        assert!(settings.notifications_enabled);
        assert!(!settings.wake_lock_enabled);
    }

    #[test]
    fn test_settings_update_merge_is_per_field() {
        let current = Settings::default();
        let update = SettingsUpdate {
            work_duration: Some(50),
            wake_lock_enabled: Some(true),
            ..SettingsUpdate::default()
        };
        let merged = update.merged_into(&current);
        assert_eq!(merged.work_duration, 50);
        assert_eq!(merged.short_break_duration, 5);
        assert_eq!(merged.long_break_duration, 15);
        assert!(merged.notifications_enabled);
        assert!(merged.wake_lock_enabled);
    }

    #[test]
    fn test_settings_update_set_minutes() {
        let mut update = SettingsUpdate::default();
        assert!(update.is_empty());
        update.set_minutes(Phase::LongBreak, 20);
        assert_eq!(update.long_break_duration, Some(20));
        assert!(!update.is_empty());
    }

    #[test]
    fn test_statistics_complete_pomodoro() {
        let mut stats = Statistics::default();
        stats.complete_pomodoro(25);
        stats.complete_pomodoro(50);
        assert_eq!(stats.completed_sessions, 2);
        assert_eq!(stats.total_work_time, 75);
        assert_eq!(stats.streak, 2);
    }

    #[test]
    fn test_statistics_large_total_does_not_truncate() {
        let mut stats = Statistics {
            completed_sessions: 10,
            total_work_time: u64::from(u32::MAX),
            streak: 3,
        };
        stats.complete_pomodoro(120);
        assert_eq!(stats.total_work_time, u64::from(u32::MAX) + 120);
    }

    #[test]
    fn test_phase_serializes_camel_case() {
        assert_eq!(serde_json::to_string(&Phase::ShortBreak).unwrap(), "\"shortBreak\"");
        assert_eq!(serde_json::to_string(&Phase::LongBreak).unwrap(), "\"longBreak\"");
        assert_eq!(
            serde_json::to_string(&BoundPhase::LongBreak).unwrap(),
            "\"longbreak\""
        );
    }

    #[test]
    fn test_snapshot_field_names() {
        let json = serde_json::to_value(PomodoroState::default()).unwrap();
        assert!(json["currentSession"].is_null());
        assert!(json["timeBoundSession"].is_null());
        assert_eq!(json["settings"]["workDuration"], 25);
        assert_eq!(json["statistics"]["totalWorkTime"], 0);
    }

    #[test]
    fn test_session_type_field_name() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let session = PomodoroSession::begin(Phase::Work, 25, start);
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["type"], "work");
        assert_eq!(json["isCompleted"], false);
        assert_eq!(json["interruptions"], 0);
    }

    #[test]
    fn test_auto_advance_rules() {
        let target = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap();
        let mut plan = TimeBoundPomodoro {
            target_time: target,
            estimated_sets: 2,
            completed_sets: 1,
            current_phase: BoundPhase::Break,
            auto_advance: true,
        };
        assert!(plan.should_auto_advance(before));
        assert!(!plan.should_auto_advance(target));

        plan.completed_sets = 2;
        assert!(!plan.should_auto_advance(before));

        plan.completed_sets = 0;
        plan.auto_advance = false;
        assert!(!plan.should_auto_advance(before));
    }
}
