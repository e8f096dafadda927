//! Tsudoi Platform library.
//!
//! The domain core of the Tsudoi event-hosting and customer-engagement
//! platform: canonical events with capacity-limited rosters, append-only goal
//! progress logs, the pricing-plan catalog, and profile/customer identities.
//!
//! Everything persists through the narrow [`store::Store`] abstraction; no
//! module here performs I/O beyond that single seam, and no HTTP or UI
//! concerns live in this crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod directory;
pub mod goals;
pub mod models;
pub mod reconcile;
pub mod registry;
pub mod store;

pub use catalog::{CatalogError, NewPlan, PlanPatch, PricingCatalog};
pub use config::{ConfigError, PlatformConfig};
pub use directory::{Action, DirectoryError, IdentityDirectory};
pub use goals::{GoalError, GoalTracker};
pub use models::{Customer, Event, GoalProgress, PricingPlan, Profile};
pub use reconcile::{LegacyEventV1, LegacyEventV2, RawEvent, SourceShape, ValidationError};
pub use registry::{EventFilter, EventRegistry, NewEvent, RegistryError};
pub use store::{Filter, MemoryStore, Record, Store, StoreError};
