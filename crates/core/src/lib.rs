//! Tsudoi Core - Shared types library.
//!
//! This crate provides common types used across all Tsudoi components:
//! - `platform` - Domain services (events, goals, pricing, identities)
//! - future application layers (HTTP handlers, admin UI)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, prices, and
//!   statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
