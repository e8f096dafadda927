//! Goal progress tracking.
//!
//! An append-only log of progress measurements against externally owned
//! goals. There is no update or delete: corrections are recorded as new
//! entries, so the full measurement history survives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use tsudoi_core::{GoalId, GoalProgressId};

use crate::models::GoalProgress;
use crate::store::{self, Filter, Record, Store, StoreError};

/// Collection holding progress entries.
const PROGRESS: &str = "goal_progress";

/// Errors surfaced by the tracker.
#[derive(Debug, Error)]
pub enum GoalError {
    /// Progress values must be finite numbers.
    #[error("progress value must be finite, got {0}")]
    InvalidProgress(f64),

    /// Store-layer failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The entry body as persisted; the id lives on the record, not in the
/// document, because the store assigns it.
#[derive(Debug, Serialize, Deserialize)]
struct ProgressDoc {
    goal_id: GoalId,
    progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    recorded_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

/// Append-only tracker of goal progress entries.
#[derive(Clone)]
pub struct GoalTracker {
    store: Arc<dyn Store>,
}

impl GoalTracker {
    /// Create a tracker over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append a progress entry.
    ///
    /// `recorded_at` is when the measurement applies and defaults to now;
    /// `created_at` is always the logging instant. The store assigns the
    /// entry id.
    ///
    /// # Errors
    ///
    /// Returns [`GoalError::InvalidProgress`] for non-finite values, or a
    /// store error.
    #[instrument(skip(self, note))]
    pub async fn record(
        &self,
        goal_id: GoalId,
        progress: f64,
        note: Option<String>,
        recorded_at: Option<DateTime<Utc>>,
    ) -> Result<GoalProgress, GoalError> {
        if !progress.is_finite() {
            return Err(GoalError::InvalidProgress(progress));
        }

        let created_at = Utc::now();
        let doc = ProgressDoc {
            goal_id,
            progress,
            note,
            recorded_at: recorded_at.unwrap_or(created_at),
            created_at,
        };

        let record = self
            .store
            .insert(PROGRESS, None, store::encode(&doc)?)
            .await?;
        info!(%goal_id, entry_id = %record.id, "recorded progress");
        entry_from(&record)
    }

    /// The current progress of a goal: the entry with the latest
    /// `recorded_at`, ties broken by latest `created_at`, then by largest
    /// id (the last-logged entry wins a full tie).
    ///
    /// Returns `None` for a goal with no entries — that is a valid state,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    #[instrument(skip(self))]
    pub async fn current_progress(&self, goal_id: GoalId) -> Result<Option<GoalProgress>, GoalError> {
        let mut entries = self.entries_for(goal_id).await?;
        entries.sort_by(entry_order);
        Ok(entries.pop())
    }

    /// Full measurement history of a goal, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    #[instrument(skip(self))]
    pub async fn history(&self, goal_id: GoalId) -> Result<Vec<GoalProgress>, GoalError> {
        let mut entries = self.entries_for(goal_id).await?;
        entries.sort_by(entry_order);
        Ok(entries)
    }

    async fn entries_for(&self, goal_id: GoalId) -> Result<Vec<GoalProgress>, GoalError> {
        let records = self
            .store
            .list(PROGRESS, &Filter::field("goal_id", goal_id.as_i64()))
            .await?;
        records.iter().map(entry_from).collect()
    }
}

fn entry_order(a: &GoalProgress, b: &GoalProgress) -> std::cmp::Ordering {
    a.recorded_at
        .cmp(&b.recorded_at)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn entry_from(record: &Record) -> Result<GoalProgress, GoalError> {
    let doc: ProgressDoc = store::decode(record)?;
    let id = record.id.parse::<i64>().map_err(|_| {
        StoreError::Serialization(format!("non-numeric progress entry id {:?}", record.id))
    })?;
    Ok(GoalProgress {
        id: GoalProgressId::new(id),
        goal_id: doc.goal_id,
        progress: doc.progress,
        note: doc.note,
        recorded_at: doc.recorded_at,
        created_at: doc.created_at,
    })
}
