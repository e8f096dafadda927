//! Legacy-shape ingestion through the reconciler into the registry.

mod common;

use serde_json::json;
use tsudoi_platform::{RawEvent, RegistryError, SourceShape, StoreError, ValidationError};

use common::{registry, seeded_store, user, ADMIN, MEMBER_A};

fn v1_doc() -> serde_json::Value {
    json!({
        "id": "legacy-1",
        "title": "交流会",
        "description": "networking night",
        "date": "2023-04-01T18:00:00Z",
        "location": "Ebisu",
        "capacity": 30,
        "participants": ["p1", "p2", "p1"],
        "type": "交流会",
        "status": "開催予定"
    })
}

fn v2_doc() -> serde_json::Value {
    json!({
        "id": "legacy-2",
        "title": "workshop",
        "description": "hands-on",
        "image": "https://img.example/w.png",
        "startDate": "2023-05-01T10:00:00Z",
        "endDate": "2023-05-01T12:00:00Z",
        "location": "Online",
        "capacity": 10,
        "participants": []
    })
}

#[tokio::test]
async fn test_import_v1_record() {
    let store = seeded_store().await;
    let registry = registry(&store);

    let raw = RawEvent::from_value(SourceShape::V1, v1_doc()).expect("parse v1");
    let event = registry.import(&user(ADMIN), raw).await.expect("import");

    assert_eq!(event.id.as_str(), "legacy-1");
    assert_eq!(event.start, event.end);
    assert_eq!(event.category.as_deref(), Some("交流会"));
    // Duplicate roster entries collapse on ingest.
    assert_eq!(event.participants.len(), 2);

    // The stored copy round-trips through the registry.
    let fetched = registry.get(&event.id).await.expect("fetch");
    assert_eq!(fetched.participants, event.participants);
}

#[tokio::test]
async fn test_import_v2_record() {
    let store = seeded_store().await;
    let registry = registry(&store);

    let raw = RawEvent::from_value(SourceShape::V2, v2_doc()).expect("parse v2");
    let event = registry.import(&user(ADMIN), raw).await.expect("import");

    assert_eq!(event.image.as_deref(), Some("https://img.example/w.png"));
    assert_eq!(event.category, None);
    assert!(event.end > event.start);
}

#[tokio::test]
async fn test_import_rejects_duplicate_id() {
    let store = seeded_store().await;
    let registry = registry(&store);

    let raw = RawEvent::from_value(SourceShape::V1, v1_doc()).expect("parse v1");
    registry
        .import(&user(ADMIN), raw.clone())
        .await
        .expect("first import");
    let err = registry
        .import(&user(ADMIN), raw)
        .await
        .expect_err("second import of the same id");
    assert!(matches!(err, RegistryError::Store(StoreError::Conflict { .. })));
}

#[tokio::test]
async fn test_import_surfaces_validation_failure() {
    let store = seeded_store().await;
    let registry = registry(&store);

    let mut doc = v2_doc();
    doc["capacity"] = json!(1);
    doc["participants"] = json!(["a", "b"]);
    let raw = RawEvent::from_value(SourceShape::V2, doc).expect("parse v2");

    let err = registry
        .import(&user(ADMIN), raw)
        .await
        .expect_err("oversized roster");
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::CapacityExceeded { .. })
    ));
}

#[tokio::test]
async fn test_import_is_admin_only() {
    let store = seeded_store().await;
    let registry = registry(&store);

    let raw = RawEvent::from_value(SourceShape::V1, v1_doc()).expect("parse v1");
    let err = registry
        .import(&user(MEMBER_A), raw)
        .await
        .expect_err("member import");
    assert!(matches!(err, RegistryError::Unauthorized(_)));
}
