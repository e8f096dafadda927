//! Event reconciliation.
//!
//! The platform inherited two incompatible historical shapes of the "Event"
//! concept: an early one keyed by a single display date with a category
//! label, and a later one keyed by a start/end range with an image field and
//! no category. Both still exist in exported data. This module ingests
//! either shape (or an already-canonical document), validates it, and
//! normalizes it into the one canonical [`Event`] — the legacy shapes are
//! never stored and never passed downstream.
//!
//! Normalization is pure: no I/O, no clock access beyond the `now` the
//! caller supplies.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use tsudoi_core::{EventId, ParticipantId};

use crate::models::Event;

/// Which historical shape a raw record claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape {
    /// Single display date plus category (`type`) label.
    V1,
    /// Start/end date range plus optional image; no category.
    V2,
    /// Already canonical.
    Canonical,
}

impl std::fmt::Display for SourceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
            Self::Canonical => write!(f, "canonical"),
        }
    }
}

/// Validation failures, surfaced in check order; the first failure wins.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Required fields missing or of the wrong primitive type for the
    /// declared shape.
    #[error("malformed {shape} record: {detail}")]
    Malformed {
        /// The shape the record claimed to be.
        shape: SourceShape,
        /// What did not parse.
        detail: String,
    },

    /// The end timestamp precedes the start timestamp.
    #[error("end timestamp precedes start timestamp")]
    InvalidDateRange,

    /// Capacity is negative.
    #[error("capacity must be non-negative, got {0}")]
    InvalidCapacity(i64),

    /// The de-duplicated roster is larger than the capacity. Reconciliation
    /// never silently truncates a roster.
    #[error("{participants} participants exceed capacity {capacity}")]
    CapacityExceeded {
        /// De-duplicated roster size.
        participants: usize,
        /// Declared capacity.
        capacity: u32,
    },
}

/// The single-display-date legacy shape.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyEventV1 {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Display date: RFC 3339, or a plain `YYYY-MM-DD` calendar date.
    pub date: String,
    pub location: String,
    pub capacity: i64,
    #[serde(default)]
    pub participants: Vec<String>,
    /// Category label (`type` in the source data).
    #[serde(default, rename = "type")]
    pub category: Option<String>,
    /// Stored status. Ignored: canonical status is always recomputed from
    /// timestamps, never trusted from input.
    #[serde(default)]
    pub status: Option<String>,
}

/// The date-range legacy shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyEventV2 {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: String,
    pub capacity: i64,
    #[serde(default)]
    pub participants: Vec<String>,
    /// Stored status. Ignored, same as in [`LegacyEventV1`].
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A raw event record tagged with the shape it came from.
#[derive(Debug, Clone)]
pub enum RawEvent {
    /// Single-date legacy record.
    V1(LegacyEventV1),
    /// Date-range legacy record.
    V2(LegacyEventV2),
    /// Already-canonical record; still re-validated on ingest.
    Canonical(Event),
}

impl RawEvent {
    /// Parse a JSON document into the declared shape.
    ///
    /// This is validation rule 1: required fields present and of the correct
    /// primitive type.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Malformed`] when the document does not
    /// match the declared shape.
    pub fn from_value(shape: SourceShape, value: Value) -> Result<Self, ValidationError> {
        let malformed = |e: serde_json::Error| ValidationError::Malformed {
            shape,
            detail: e.to_string(),
        };
        match shape {
            SourceShape::V1 => serde_json::from_value(value).map(Self::V1).map_err(malformed),
            SourceShape::V2 => serde_json::from_value(value).map(Self::V2).map_err(malformed),
            SourceShape::Canonical => serde_json::from_value(value)
                .map(Self::Canonical)
                .map_err(malformed),
        }
    }

    /// The shape this record was tagged with.
    #[must_use]
    pub const fn shape(&self) -> SourceShape {
        match self {
            Self::V1(_) => SourceShape::V1,
            Self::V2(_) => SourceShape::V2,
            Self::Canonical(_) => SourceShape::Canonical,
        }
    }
}

/// Normalize a raw record into a canonical [`Event`], using the current time
/// for defaulted `created_at`/`updated_at` fields.
///
/// # Errors
///
/// See [`normalize_at`].
pub fn normalize(raw: RawEvent) -> Result<Event, ValidationError> {
    normalize_at(raw, Utc::now())
}

/// Normalize a raw record into a canonical [`Event`].
///
/// Checks run in order, first failure wins:
///
/// 1. shape conformance (done earlier by [`RawEvent::from_value`]; V1 date
///    strings are parsed here),
/// 2. `end >= start` for range-shaped input,
/// 3. single-date input maps to `start = end = date` — a zero-duration
///    instant event, by policy,
/// 4. `capacity >= 0`,
/// 5. the roster is de-duplicated (first occurrence wins) and must fit the
///    capacity,
/// 6. any stored status on the input is discarded; status is derived from
///    timestamps at read time.
///
/// # Errors
///
/// Returns the first failing [`ValidationError`] in the order above.
pub fn normalize_at(raw: RawEvent, now: DateTime<Utc>) -> Result<Event, ValidationError> {
    match raw {
        RawEvent::V1(v1) => {
            let date = parse_v1_date(&v1.date)?;
            let capacity = check_capacity(v1.capacity)?;
            let participants = dedup_roster(v1.participants, capacity)?;
            Ok(Event {
                id: EventId::new(v1.id),
                title: v1.title,
                description: v1.description,
                image: None,
                category: v1.category,
                start: date,
                end: date,
                location: v1.location,
                capacity,
                participants,
                created_at: now,
                updated_at: now,
            })
        }
        RawEvent::V2(v2) => {
            check_window(v2.start_date, v2.end_date)?;
            let capacity = check_capacity(v2.capacity)?;
            let participants = dedup_roster(v2.participants, capacity)?;
            Ok(Event {
                id: EventId::new(v2.id),
                title: v2.title,
                description: v2.description,
                image: v2.image,
                category: None,
                start: v2.start_date,
                end: v2.end_date,
                location: v2.location,
                capacity,
                participants,
                created_at: v2.created_at.unwrap_or(now),
                updated_at: v2.updated_at.unwrap_or(now),
            })
        }
        RawEvent::Canonical(event) => {
            check_window(event.start, event.end)?;
            let roster: Vec<String> = event
                .participants
                .into_iter()
                .map(ParticipantId::into_inner)
                .collect();
            let participants = dedup_roster(roster, event.capacity)?;
            Ok(Event {
                participants,
                ..event
            })
        }
    }
}

/// Check that `end >= start`. Shared with the registry's create path.
pub(crate) fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ValidationError> {
    if end < start {
        Err(ValidationError::InvalidDateRange)
    } else {
        Ok(())
    }
}

fn parse_v1_date(date: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(date) {
        return Ok(ts.with_timezone(&Utc));
    }
    // Early exports carried bare calendar dates; read them as midnight UTC.
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|e| ValidationError::Malformed {
            shape: SourceShape::V1,
            detail: format!("unparseable date {date:?}: {e}"),
        })
}

fn check_capacity(capacity: i64) -> Result<u32, ValidationError> {
    u32::try_from(capacity).map_err(|_| ValidationError::InvalidCapacity(capacity))
}

fn dedup_roster(
    roster: Vec<String>,
    capacity: u32,
) -> Result<Vec<ParticipantId>, ValidationError> {
    let mut seen = HashSet::new();
    let deduped: Vec<ParticipantId> = roster
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .map(ParticipantId::new)
        .collect();

    if deduped.len() > capacity as usize {
        return Err(ValidationError::CapacityExceeded {
            participants: deduped.len(),
            capacity,
        });
    }
    Ok(deduped)
}
