//! Shared fixtures for integration tests.
//!
//! Every test runs against a fresh [`MemoryStore`] seeded with one admin
//! and three regular members.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tsudoi_core::{ParticipantId, UserId};
use tsudoi_platform::{
    EventRegistry, IdentityDirectory, MemoryStore, NewEvent, Store,
};

pub const ADMIN: &str = "user-admin";
pub const MEMBER_A: &str = "user-a";
pub const MEMBER_B: &str = "user-b";
pub const MEMBER_C: &str = "user-c";

pub fn user(id: &str) -> UserId {
    UserId::new(id)
}

pub fn participant(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

/// A store with profiles for the admin and members already present.
pub async fn seeded_store() -> Arc<dyn Store> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let people = [
        ("prof-admin", ADMIN, "管理者", "admin"),
        ("prof-a", MEMBER_A, "Aoi", "user"),
        ("prof-b", MEMBER_B, "Ben", "user"),
        ("prof-c", MEMBER_C, "Chika", "user"),
    ];
    for (id, user_id, name, role) in people {
        store
            .insert(
                "profiles",
                Some(id),
                json!({
                    "id": id,
                    "user_id": user_id,
                    "display_name": name,
                    "email": format!("{user_id}@example.com"),
                    "role": role,
                }),
            )
            .await
            .expect("seed profile");
    }
    store
}

pub fn registry(store: &Arc<dyn Store>) -> EventRegistry {
    EventRegistry::new(store.clone(), IdentityDirectory::new(store.clone()))
}

/// An event starting an hour from now, running for two hours.
pub fn upcoming_event(capacity: u32) -> NewEvent {
    event_between(
        Utc::now() + Duration::hours(1),
        Utc::now() + Duration::hours(3),
        capacity,
    )
}

/// An event that ended an hour ago.
pub fn finished_event(capacity: u32) -> NewEvent {
    event_between(
        Utc::now() - Duration::hours(3),
        Utc::now() - Duration::hours(1),
        capacity,
    )
}

pub fn event_between(start: DateTime<Utc>, end: DateTime<Utc>, capacity: u32) -> NewEvent {
    NewEvent {
        title: "もくもく会".into(),
        description: "monthly meetup".into(),
        image: None,
        category: None,
        start,
        end,
        location: "Shibuya".into(),
        capacity,
    }
}
