//! Schema checks for everything that crosses the core's boundary.
//!
//! Two policies live here. Stored snapshots and outgoing notifications are
//! validated strictly and rejected as a whole. Human input and externally
//! delivered notification payloads are sanitized field by field, falling
//! back to defaults instead of failing.

use crate::models::{Phase, PomodoroState, PushNotification, Settings};
use serde_json::Value;
use thiserror::Error;
use url::Url;

pub const TITLE_MAX_CHARS: usize = 100;
pub const BODY_MAX_CHARS: usize = 200;

pub const DEFAULT_TAG: &str = "pomodoro";
pub const DEFAULT_PUSH_TITLE: &str = "Pomodoro";
pub const DEFAULT_PUSH_BODY: &str = "Time's up!";
pub const DEFAULT_PUSH_ICON: &str = "/icons/icon-192.png";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("{field} must be {min} to {max} characters long, got {len}")]
    Length {
        field: &'static str,
        len: usize,
        min: usize,
        max: usize,
    },
    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum StateParseError {
    #[error("stored state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored state violates the schema: {0}")]
    Invalid(#[from] ValidationError),
}

/// Checks every duration against its phase bounds.
pub fn validate_settings(settings: &Settings) -> Result<(), ValidationError> {
    for phase in [Phase::Work, Phase::ShortBreak, Phase::LongBreak] {
        let value = settings.minutes_for(phase);
        let bounds = phase.duration_bounds();
        if !bounds.contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: phase.settings_field(),
                value,
                min: *bounds.start(),
                max: *bounds.end(),
            });
        }
    }
    Ok(())
}

/// Checks a full snapshot. Counters are unsigned, so only the bounded and
/// positive fields need runtime checks.
pub fn validate_state(state: &PomodoroState) -> Result<(), ValidationError> {
    validate_settings(&state.settings)?;

    if let Some(session) = &state.current_session {
        if session.duration == 0 {
            return Err(ValidationError::NotPositive { field: "duration" });
        }
    }

    if let Some(plan) = &state.time_bound_session {
        if plan.estimated_sets == 0 {
            return Err(ValidationError::NotPositive {
                field: "estimatedSets",
            });
        }
    }

    Ok(())
}

/// Parses and validates a stored snapshot. Nothing is partially trusted.
pub fn parse_stored_state(raw: &str) -> Result<PomodoroState, StateParseError> {
    let state: PomodoroState = serde_json::from_str(raw)?;
    validate_state(&state)?;
    Ok(state)
}

/// Reads the optionally signed integer at the start of `input`, ignoring
/// anything after the digits ("50.7" reads as 50).
fn leading_integer(input: &str) -> Option<i64> {
    let text = input.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

/// Turns free-form duration input into a storable value.
///
/// Input without a leading integer, or reading as zero, falls back to the
/// phase default (not the previous value); other numbers outside the bounds
/// are clamped.
pub fn sanitize_duration(phase: Phase, input: &str) -> u32 {
    let bounds = phase.duration_bounds();
    match leading_integer(input) {
        Some(value) if value != 0 => {
            let clamped = value.clamp(i64::from(*bounds.start()), i64::from(*bounds.end()));
            // Clamped into a u32 range above.
            clamped as u32
        }
        _ => phase.default_minutes(),
    }
}

/// Parses on/off style toggles.
pub fn parse_toggle(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(ValidationError::Length {
            field,
            len,
            min: 1,
            max,
        });
    }
    Ok(())
}

/// Strict check for notifications the core produces itself.
pub fn validate_notification(notification: &PushNotification) -> Result<(), ValidationError> {
    check_length("title", &notification.title, TITLE_MAX_CHARS)?;
    check_length("body", &notification.body, BODY_MAX_CHARS)?;
    if let Some(icon) = &notification.icon {
        if Url::parse(icon).is_err() {
            return Err(ValidationError::InvalidUrl {
                field: "icon",
                value: icon.clone(),
            });
        }
    }
    Ok(())
}

fn text_field(payload: &Value, key: &str, max: usize) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| check_length("", text, max).is_ok())
        .map(str::to_owned)
}

fn icon_field(payload: &Value) -> Option<String> {
    payload
        .get("icon")
        .and_then(Value::as_str)
        .filter(|icon| icon.starts_with('/') || Url::parse(icon).is_ok())
        .map(str::to_owned)
}

/// Builds a displayable notification from an untrusted payload.
///
/// Every field is defaulted independently; a payload that is not even an
/// object yields the all-default notification.
pub fn sanitize_push_payload(payload: &Value) -> PushNotification {
    PushNotification {
        title: text_field(payload, "title", TITLE_MAX_CHARS)
            .unwrap_or_else(|| DEFAULT_PUSH_TITLE.to_string()),
        body: text_field(payload, "body", BODY_MAX_CHARS)
            .unwrap_or_else(|| DEFAULT_PUSH_BODY.to_string()),
        icon: Some(icon_field(payload).unwrap_or_else(|| DEFAULT_PUSH_ICON.to_string())),
        tag: payload
            .get("tag")
            .and_then(Value::as_str)
            .filter(|tag| !tag.is_empty())
            .unwrap_or(DEFAULT_TAG)
            .to_string(),
        require_interaction: payload
            .get("requireInteraction")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    }
}
