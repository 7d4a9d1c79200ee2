#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use civic_api::{app, catalog, AppState, MemoryStore, PaginationSettings};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const NC: &str = "ocd-jurisdiction/country:us/state:nc/government";
pub const SESSION: &str = "6f1c1a52-3d7e-4b57-9a53-2f1b8c0e6a10";
pub const BILL_COUNT: usize = 134;
pub const PERSON: &str = "ocd-person/0001";
pub const FILED: &str = "0b6f5d0e-8a3c-4c1e-9f0a-1d2e3f405161";

pub fn bill_id(i: usize) -> String {
    format!("ocd-bill/{:04}", i)
}

/// One state, one session, one legislator, 134 bills. Bill 1 carries sponsorships, actions and a vote.
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert(
            "jurisdiction",
            json!({"id": NC, "name": "North Carolina", "classification": "government", "url": null}),
        )
        .unwrap();
    store
        .insert(
            "organization",
            json!({"id": "ocd-organization/nc-house", "name": "House", "classification": "lower", "jurisdiction_id": NC}),
        )
        .unwrap();
    store
        .insert(
            "legislative_session",
            json!({"id": SESSION, "identifier": "2023", "name": "2023-2024 Session", "jurisdiction_id": NC}),
        )
        .unwrap();
    store
        .insert(
            "person",
            json!({"id": PERSON, "name": "Zed Example", "primary_party": "Democratic", "current_jurisdiction_id": NC, "email": null}),
        )
        .unwrap();
    store
        .insert(
            "person_name",
            json!({"id": "7a6b5c4d-3e2f-4a1b-8c9d-0e1f2a3b4c5d", "person_id": PERSON, "name": "Zedediah Example", "note": "legal name"}),
        )
        .unwrap();
    for i in 1..=BILL_COUNT {
        let subject = if i % 2 == 0 { json!(["Taxation"]) } else { json!(["Education"]) };
        store
            .insert(
                "bill",
                json!({
                    "id": bill_id(i),
                    "identifier": format!("HB {}", i),
                    "title": format!("An act concerning item {}", i),
                    "classification": ["bill"],
                    "subject": subject,
                    "from_organization_id": "ocd-organization/nc-house",
                    "legislative_session_id": SESSION,
                    "latest_passage_date": null,
                    "updated_at": format!("2024-01-{:02}T00:00:00Z", i % 28 + 1),
                }),
            )
            .unwrap();
    }
    let b1 = bill_id(1);
    store
        .insert("bill_sponsorship", json!({"id": "9d1c6f3a-2b4e-4f5a-8c7d-0e1f2a3b4c02", "bill_id": b1, "name": "Amy", "primary": false}))
        .unwrap();
    store
        .insert("bill_sponsorship", json!({"id": "9d1c6f3a-2b4e-4f5a-8c7d-0e1f2a3b4c01", "bill_id": b1, "name": "Zed", "primary": true}))
        .unwrap();
    store
        .insert(
            "bill_action",
            json!({"id": "0b6f5d0e-8a3c-4c1e-9f0a-1d2e3f405162", "bill_id": b1, "description": "Passed 2nd reading", "order": 2, "organization_id": "ocd-organization/nc-house"}),
        )
        .unwrap();
    store
        .insert(
            "bill_action",
            json!({"id": FILED, "bill_id": b1, "description": "Filed", "order": 1}),
        )
        .unwrap();
    store
        .insert(
            "bill_action_related_entity",
            json!({"id": "4e2a7b1c-5d3f-4a6e-9b8c-7d6e5f4a3b21", "action_id": FILED, "name": "Committee on Finance", "entity_type": "organization"}),
        )
        .unwrap();
    store
        .insert(
            "vote_event",
            json!({"id": "ocd-vote/1", "bill_id": b1, "result": "pass", "start_date": "2024-02-01", "organization_id": "ocd-organization/nc-house"}),
        )
        .unwrap();
    store
        .insert("vote_count", json!({"id": "c3a1e2d4-6b5f-4c7a-8e9d-0f1a2b3c4d01", "vote_event_id": "ocd-vote/1", "option": "yes", "value": 70}))
        .unwrap();
    store
        .insert("vote_count", json!({"id": "c3a1e2d4-6b5f-4c7a-8e9d-0f1a2b3c4d02", "vote_event_id": "ocd-vote/1", "option": "no", "value": 48}))
        .unwrap();
    store
        .insert(
            "person_vote",
            json!({"id": "5f4e3d2c-1b0a-4987-a6b5-c4d3e2f1a001", "vote_event_id": "ocd-vote/1", "option": "yes", "voter_name": "Zed"}),
        )
        .unwrap();
    store
}

pub fn router(store: MemoryStore, settings: PaginationSettings) -> Router {
    let model = catalog::openstates_model().unwrap();
    app(AppState::new(Arc::new(store), model, settings))
}

pub fn default_router() -> Router {
    router(seeded_store(), PaginationSettings::default())
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let res = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn ids(body: &Value) -> Vec<String> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}
