//! Canonical domain models.
//!
//! These are validated domain objects, separate from the raw documents the
//! store traffics in. Legacy event shapes never appear here; they exist only
//! as input to [`crate::reconcile`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tsudoi_core::{
    CustomerId, Email, EventId, EventStatus, GoalId, GoalProgressId, ParticipantId, PlanId, Price,
    ProfileId, Role, UserId,
};

/// A canonical event.
///
/// Status is deliberately not a field: it is derived from the time window on
/// every read via [`Event::status`], so a stored document can never carry a
/// stale status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID.
    pub id: EventId,
    /// Display title.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// Optional image reference (URL or storage path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Category label carried over from the single-date legacy shape.
    /// Only one historical source recorded this, so it is metadata, not a
    /// required attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// When the event starts.
    pub start: DateTime<Utc>,
    /// When the event ends. Always `>= start`.
    pub end: DateTime<Utc>,
    /// Free-text venue.
    pub location: String,
    /// Maximum simultaneous participants.
    pub capacity: u32,
    /// Registered participants. No duplicates; never larger than `capacity`.
    pub participants: Vec<ParticipantId>,
    /// When the canonical record was created.
    pub created_at: DateTime<Utc>,
    /// When the canonical record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Derive the lifecycle status as of `now`.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> EventStatus {
        EventStatus::at(self.start, self.end, now)
    }

    /// Whether the roster has reached capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.capacity as usize
    }

    /// Whether the given participant is on the roster.
    #[must_use]
    pub fn has_participant(&self, participant: &ParticipantId) -> bool {
        self.participants.contains(participant)
    }
}

/// One immutable progress measurement against a goal.
///
/// Entries are append-only: corrections are new entries, never edits, so the
/// full measurement history is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalProgress {
    /// Store-assigned entry ID.
    pub id: GoalProgressId,
    /// The goal this entry measures.
    pub goal_id: GoalId,
    /// Progress value (unit defined by the goal).
    pub progress: f64,
    /// Optional free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the measurement applies.
    pub recorded_at: DateTime<Utc>,
    /// When the entry was logged.
    pub created_at: DateTime<Utc>,
}

/// A pricing plan. Read-mostly reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPlan {
    /// Store-assigned plan ID.
    pub id: PlanId,
    /// Plan name.
    pub name: String,
    /// Marketing description.
    pub description: String,
    /// Plan price.
    pub price: Price,
    /// Feature bullet points; order is significant for display.
    pub features: Vec<String>,
    /// Whether the plan is highlighted as popular.
    #[serde(default)]
    pub is_popular: bool,
    /// Archived plans are hidden from the catalog but kept in the store.
    #[serde(default)]
    pub archived: bool,
    /// When the plan was created, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the plan was last updated, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A platform profile. One per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique profile ID.
    pub id: ProfileId,
    /// The platform user this profile belongs to.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Contact email.
    pub email: Email,
    /// Platform role.
    pub role: Role,
}

/// A customer record with external messaging identifiers.
///
/// Correlated to a [`Profile`] only by the shared `user_id`; a user may have
/// either, both, or neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique customer ID.
    pub id: CustomerId,
    /// The platform user this customer record belongs to.
    pub user_id: UserId,
    /// Customer name.
    pub name: String,
    /// Contact email, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    /// LINE account identifier, if linked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_user_id: Option<String>,
    /// Instagram account identifier, if linked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_user_id: Option<String>,
    /// When the customer record was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn event(capacity: u32, participants: &[&str]) -> Event {
        Event {
            id: EventId::new("evt-1"),
            title: "Workshop".into(),
            description: String::new(),
            image: None,
            category: None,
            start: ts(100),
            end: ts(200),
            location: "Tokyo".into(),
            capacity,
            participants: participants.iter().map(|p| ParticipantId::new(*p)).collect(),
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    #[test]
    fn test_is_full() {
        assert!(event(0, &[]).is_full());
        assert!(!event(2, &["a"]).is_full());
        assert!(event(2, &["a", "b"]).is_full());
    }

    #[test]
    fn test_has_participant() {
        let e = event(2, &["a"]);
        assert!(e.has_participant(&ParticipantId::new("a")));
        assert!(!e.has_participant(&ParticipantId::new("b")));
    }

    #[test]
    fn test_status_ignores_any_input_status() {
        // A serialized event carrying a status field deserializes fine and
        // the field is discarded; status comes from the clock alone.
        let json = serde_json::json!({
            "id": "evt-9",
            "title": "t",
            "description": "",
            "start": "1970-01-01T00:01:40Z",
            "end": "1970-01-01T00:03:20Z",
            "location": "",
            "capacity": 1,
            "participants": [],
            "status": "scheduled",
            "created_at": "1970-01-01T00:00:00Z",
            "updated_at": "1970-01-01T00:00:00Z"
        });
        let e: Event = serde_json::from_value(json).unwrap();
        assert_eq!(e.status(ts(500)), tsudoi_core::EventStatus::Finished);
    }
}
