//! Event registry.
//!
//! Owns the canonical event lifecycle: creation, legacy import, capacity-
//! enforced registration, and listing. Status is derived from the clock on
//! every read and never written to the store, so a crashed process or stale
//! cache can never serve an outdated status after restart.
//!
//! Registration is a read-modify-write conditioned on the record version the
//! reader saw; on a version conflict it re-reads, re-validates, and retries
//! once before surfacing the conflict. That keeps `|participants| <=
//! capacity` true even when two writers race for the last slot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tsudoi_core::{EventId, EventStatus, ParticipantId, UserId};

use crate::directory::{Action, DirectoryError, IdentityDirectory};
use crate::models::Event;
use crate::reconcile::{self, RawEvent, ValidationError};
use crate::store::{self, Filter, Store, StoreError};

/// Collection holding canonical event documents.
const EVENTS: &str = "events";

/// Business-rule and infrastructure failures for registry operations.
///
/// Every kind except `Store(StoreError::Unavailable)` is terminal for the
/// call; retrying a rejection cannot succeed.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The referenced event does not exist.
    #[error("event not found: {0}")]
    NotFound(EventId),

    /// The roster is at capacity.
    #[error("event is already full")]
    AlreadyFull,

    /// The participant is already on the roster.
    #[error("participant is already registered")]
    AlreadyRegistered,

    /// The participant is not on the roster.
    #[error("participant is not registered")]
    NotRegistered,

    /// The event has already finished (derived at call time).
    #[error("event has already finished")]
    EventFinished,

    /// The acting user may not perform this action.
    #[error("user {0} is not authorized for this action")]
    Unauthorized(UserId),

    /// The input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Store-layer failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DirectoryError> for RegistryError {
    fn from(e: DirectoryError) -> Self {
        match e {
            // An actor without a profile cannot hold any role.
            DirectoryError::ProfileNotFound(user) => Self::Unauthorized(user),
            DirectoryError::Store(e) => Self::Store(e),
        }
    }
}

/// Input for creating a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
    pub capacity: u32,
}

/// Filter for [`EventRegistry::list`].
///
/// Status is matched against the value derived at evaluation time (`as_of`,
/// defaulting to now), so re-running the same filter later can legitimately
/// return a different set as events move through their windows.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Keep only events whose derived status matches.
    pub status: Option<EventStatus>,
    /// Keep only events starting at or after this instant.
    pub starts_after: Option<DateTime<Utc>>,
    /// Keep only events ending at or before this instant.
    pub ends_before: Option<DateTime<Utc>>,
    /// Evaluate derived status as of this instant instead of now.
    pub as_of: Option<DateTime<Utc>>,
}

/// Registry of canonical events.
#[derive(Clone)]
pub struct EventRegistry {
    store: Arc<dyn Store>,
    directory: IdentityDirectory,
}

impl EventRegistry {
    /// Create a registry over the given store and directory.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, directory: IdentityDirectory) -> Self {
        Self { store, directory }
    }

    /// Derive an event's status at `as_of`. Pure; never persisted.
    #[must_use]
    pub fn status_of(event: &Event, as_of: DateTime<Utc>) -> EventStatus {
        event.status(as_of)
    }

    /// Fetch a single event.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when absent, or a store error.
    pub async fn get(&self, event_id: &EventId) -> Result<Event, RegistryError> {
        Ok(self.fetch(event_id).await?.0)
    }

    /// Create a new event. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for non-admin actors,
    /// `Validation(InvalidDateRange)` for an inverted window, or a store
    /// error.
    #[instrument(skip(self, new), fields(title = %new.title))]
    pub async fn create(&self, actor: &UserId, new: NewEvent) -> Result<Event, RegistryError> {
        self.require(actor, &Action::ManageEvents).await?;
        reconcile::check_window(new.start, new.end)?;

        let now = Utc::now();
        let event = Event {
            id: EventId::new(Uuid::new_v4().to_string()),
            title: new.title,
            description: new.description,
            image: new.image,
            category: new.category,
            start: new.start,
            end: new.end,
            location: new.location,
            capacity: new.capacity,
            participants: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert(EVENTS, Some(event.id.as_str()), store::encode(&event)?)
            .await?;
        info!(event_id = %event.id, "created event");
        Ok(event)
    }

    /// Ingest a legacy-shaped (or canonical) record. Admin only.
    ///
    /// The record is normalized through the reconciler and persisted under
    /// its own id; the legacy shape is discarded.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for non-admin actors, a [`ValidationError`]
    /// from normalization, or a store error (`Conflict` if the id already
    /// exists).
    #[instrument(skip(self, raw), fields(shape = %raw.shape()))]
    pub async fn import(&self, actor: &UserId, raw: RawEvent) -> Result<Event, RegistryError> {
        self.require(actor, &Action::ManageEvents).await?;

        let event = reconcile::normalize(raw)?;
        self.store
            .insert(EVENTS, Some(event.id.as_str()), store::encode(&event)?)
            .await?;
        info!(event_id = %event.id, "imported event");
        Ok(event)
    }

    /// Delete an event. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for non-admin actors, `NotFound` when absent,
    /// or a store error.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: &UserId, event_id: &EventId) -> Result<(), RegistryError> {
        self.require(actor, &Action::ManageEvents).await?;
        match self.store.delete(EVENTS, event_id.as_str()).await {
            Ok(()) => {
                info!(%event_id, "deleted event");
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => Err(RegistryError::NotFound(event_id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Register a participant for an event.
    ///
    /// The actor must be the participant themself or an admin. The write is
    /// conditioned on the event version read at validation time, so a
    /// concurrent registration at the last slot cannot be overwritten: the
    /// loser re-reads, finds the roster full, and gets `AlreadyFull`.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, `EventFinished`, `AlreadyRegistered`,
    /// `AlreadyFull`, or a store error.
    #[instrument(skip(self))]
    pub async fn register(
        &self,
        actor: &UserId,
        event_id: &EventId,
        participant: &ParticipantId,
    ) -> Result<Event, RegistryError> {
        self.require(actor, &Action::ActFor(participant.clone()))
            .await?;

        self.commit_roster_change(event_id, |event| {
            if event.status(Utc::now()) == EventStatus::Finished {
                return Err(RegistryError::EventFinished);
            }
            if event.has_participant(participant) {
                return Err(RegistryError::AlreadyRegistered);
            }
            if event.is_full() {
                return Err(RegistryError::AlreadyFull);
            }
            event.participants.push(participant.clone());
            Ok(())
        })
        .await
        .inspect(|event| {
            info!(%event_id, %participant, roster = event.participants.len(), "registered");
        })
    }

    /// Remove a participant from an event roster.
    ///
    /// The actor must be the participant themself, or an admin performing a
    /// forced unregistration.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, `NotRegistered`, or a store error.
    #[instrument(skip(self))]
    pub async fn unregister(
        &self,
        actor: &UserId,
        event_id: &EventId,
        participant: &ParticipantId,
    ) -> Result<Event, RegistryError> {
        let action = if actor.as_str() == participant.as_str() {
            Action::ActFor(participant.clone())
        } else {
            Action::ForceUnregister
        };
        self.require(actor, &action).await?;

        self.commit_roster_change(event_id, |event| {
            let before = event.participants.len();
            event.participants.retain(|p| p != participant);
            if event.participants.len() == before {
                return Err(RegistryError::NotRegistered);
            }
            Ok(())
        })
        .await
        .inspect(|event| {
            info!(%event_id, %participant, roster = event.participants.len(), "unregistered");
        })
    }

    /// List events matching the filter, ordered by start time then id.
    ///
    /// Each call re-fetches and re-derives status, so repeated passes over
    /// the same filter observe time-driven transitions.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    #[instrument(skip(self, filter))]
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, RegistryError> {
        let as_of = filter.as_of.unwrap_or_else(Utc::now);
        let records = self.store.list(EVENTS, &Filter::all()).await?;

        let mut events = Vec::with_capacity(records.len());
        for record in &records {
            let event: Event = store::decode(record)?;
            if let Some(status) = filter.status {
                if event.status(as_of) != status {
                    continue;
                }
            }
            if let Some(after) = filter.starts_after {
                if event.start < after {
                    continue;
                }
            }
            if let Some(before) = filter.ends_before {
                if event.end > before {
                    continue;
                }
            }
            events.push(event);
        }

        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    /// Check the role gate, turning a refusal into `Unauthorized`.
    async fn require(&self, actor: &UserId, action: &Action) -> Result<(), RegistryError> {
        if self.directory.authorize(actor, action).await? {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized(actor.clone()))
        }
    }

    /// Read-modify-write an event roster under the store's version check.
    ///
    /// `mutate` validates and applies the change against the freshly read
    /// event. On a version conflict the whole cycle runs once more against
    /// the new state; a second conflict surfaces to the caller.
    async fn commit_roster_change(
        &self,
        event_id: &EventId,
        mutate: impl Fn(&mut Event) -> Result<(), RegistryError>,
    ) -> Result<Event, RegistryError> {
        let mut attempts = 0;
        loop {
            let (mut event, version) = self.fetch(event_id).await?;
            mutate(&mut event)?;
            event.updated_at = Utc::now();

            match self
                .store
                .update(EVENTS, event_id.as_str(), store::encode(&event)?, version)
                .await
            {
                Ok(_) => return Ok(event),
                Err(StoreError::Conflict { .. }) if attempts == 0 => {
                    attempts += 1;
                    warn!(%event_id, "roster write conflict, retrying against fresh state");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn fetch(&self, event_id: &EventId) -> Result<(Event, u64), RegistryError> {
        let record = self
            .store
            .get(EVENTS, event_id.as_str())
            .await?
            .ok_or_else(|| RegistryError::NotFound(event_id.clone()))?;
        Ok((store::decode(&record)?, record.version))
    }
}
