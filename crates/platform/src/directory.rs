//! Identity directory.
//!
//! Maps a platform user to their [`Profile`] (which carries the role) and,
//! independently, to an optional [`Customer`] record holding external
//! messaging identifiers. The two are correlated only by the shared user id;
//! neither requires the other to exist.
//!
//! The role gate here is deliberately simple: admins may do everything,
//! regular users may only act for themselves. It is not a policy engine.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use tsudoi_core::{ParticipantId, Role, UserId};

use crate::models::{Customer, Profile};
use crate::store::{self, Filter, Store, StoreError};

/// Collection holding profile documents.
const PROFILES: &str = "profiles";
/// Collection holding customer documents.
const CUSTOMERS: &str = "customers";

/// Errors surfaced by directory lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No profile exists for the user.
    #[error("no profile for user {0}")]
    ProfileNotFound(UserId),

    /// Store-layer failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An action subject to the role gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create or delete events.
    ManageEvents,
    /// Create, update, or archive pricing plans.
    ManagePlans,
    /// Remove another member from an event roster.
    ForceUnregister,
    /// Register or unregister the given participant.
    ActFor(ParticipantId),
}

/// Directory of profiles and customer records.
#[derive(Clone)]
pub struct IdentityDirectory {
    store: Arc<dyn Store>,
}

impl IdentityDirectory {
    /// Create a directory over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Look up the profile for a user.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::ProfileNotFound`] when the user has no
    /// profile, or a store error.
    #[instrument(skip(self))]
    pub async fn profile_for(&self, user_id: &UserId) -> Result<Profile, DirectoryError> {
        let records = self
            .store
            .list(PROFILES, &Filter::field("user_id", user_id.as_str()))
            .await?;
        // One profile per user; the store enforces this upstream.
        match records.first() {
            Some(record) => Ok(store::decode(record)?),
            None => Err(DirectoryError::ProfileNotFound(user_id.clone())),
        }
    }

    /// Look up the customer record for a user.
    ///
    /// Absence is a valid state, not an error: plenty of users have a
    /// profile but no customer record, and vice versa.
    ///
    /// # Errors
    ///
    /// Returns a store error if the lookup fails.
    #[instrument(skip(self))]
    pub async fn customer_for(&self, user_id: &UserId) -> Result<Option<Customer>, DirectoryError> {
        let records = self
            .store
            .list(CUSTOMERS, &Filter::field("user_id", user_id.as_str()))
            .await?;
        match records.first() {
            Some(record) => Ok(Some(store::decode(record)?)),
            None => Ok(None),
        }
    }

    /// Role-based check for the given action.
    ///
    /// Admins pass everything. Users pass only [`Action::ActFor`] on
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::ProfileNotFound`] when the user has no
    /// profile, or a store error.
    #[instrument(skip(self))]
    pub async fn authorize(&self, user_id: &UserId, action: &Action) -> Result<bool, DirectoryError> {
        let profile = self.profile_for(user_id).await?;
        Ok(match profile.role {
            Role::Admin => true,
            Role::User => {
                matches!(action, Action::ActFor(p) if p.as_str() == user_id.as_str())
            }
        })
    }
}
