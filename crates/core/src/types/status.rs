//! Status and role enums shared across the platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an event, derived from its time window.
///
/// Status is never stored as authoritative data. Persisting it would let a
/// stale cache or crashed process serve a status that no longer matches the
/// clock, so every read derives it fresh via [`EventStatus::at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// The event has not started yet (`now < start`).
    Scheduled,
    /// The event is currently running (`start <= now < end`).
    InProgress,
    /// The event is over (`now >= end`).
    Finished,
}

impl EventStatus {
    /// Derive the status of an event with the given time window, as of `now`.
    ///
    /// A zero-duration event (`start == end`) is never `InProgress`: at
    /// exactly `start` the `now >= end` check already holds, so it reads as
    /// `Finished`. Single-date legacy events normalize to this shape.
    #[must_use]
    pub fn at(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < start {
            Self::Scheduled
        } else if now < end {
            Self::InProgress
        } else {
            Self::Finished
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Platform role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular member: may register and unregister themself.
    #[default]
    User,
    /// Administrator: may manage events and plans and act for any member.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
