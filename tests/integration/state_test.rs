//! Integration tests for the `/api/state` endpoints.

mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use esim_auth::Claims;
use esim_entity::project::Project;

fn circuit(data: &str, name: &str) -> serde_json::Value {
    json!({
        "data_dump": data,
        "branch": "main",
        "name": name,
        "description": "test circuit",
    })
}

#[tokio::test]
async fn test_create_then_resubmit_flags_duplicate() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");

    let first = app
        .create_save(&alice, circuit(r#"{"gates":[1]}"#, "First"))
        .await;
    assert_eq!(first["duplicate"], false);
    assert_eq!(first["version"], 1);
    assert_eq!(first["branch"], "main");
    let save_id = first["save_id"].as_str().unwrap().to_string();

    let again = app
        .create_save(&alice, circuit(r#"{"gates":[1]}"#, "Renamed"))
        .await;
    assert_eq!(again["duplicate"], true);
    assert_eq!(again["save_id"], save_id.as_str());
    assert_eq!(again["name"], "Renamed");
    assert_eq!(app.store.save_count().await, 1);

    // Same content on another branch is a distinct save.
    let mut other = circuit(r#"{"gates":[1]}"#, "Branch");
    other["branch"] = json!("experiment");
    let branched = app.create_save(&alice, other).await;
    assert_eq!(branched["duplicate"], false);
    assert_eq!(app.store.save_count().await, 2);
}

#[tokio::test]
async fn test_create_requires_token_and_fields() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");

    let response = app
        .request("POST", "/api/state", Some(circuit("{}", "x")), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "UNAUTHORIZED");

    let response = app
        .request(
            "POST",
            "/api/state",
            Some(json!({ "branch": "main", "name": "No dump" })),
            Some(&alice.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION_ERROR");

    let mut unknown_library = circuit("{}", "Libs");
    unknown_library["esim_libraries"] = json!([Uuid::new_v4()]);
    let response = app
        .request("POST", "/api/state", Some(unknown_library), Some(&alice.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_or_forged_tokens_are_rejected() {
    let app = helpers::TestApp::new();
    let now = Utc::now();
    let expired = app
        .encoder
        .encode_claims(&Claims {
            sub: Uuid::new_v4(),
            username: "late".to_string(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
        })
        .unwrap();

    let response = app
        .request("GET", "/api/state/mine", None, Some(&expired))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request("GET", "/api/state/mine", None, Some("not.a.jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sharing_controls_foreign_reads() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");
    let bob = app.user("bob");

    let save = app.create_save(&alice, circuit("{}", "Shared later")).await;
    let id = save["save_id"].as_str().unwrap();
    let path = format!("/api/state/{id}/1/main");

    let response = app.request("GET", &path, None, Some(&bob.token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body.get("data").is_none());
    let response = app.request("GET", &path, None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request("GET", &path, None, Some(&alice.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["owner"], "alice");
    assert_eq!(response.data()["data_dump"], "{}");

    // Only the owner may toggle.
    let response = app
        .request("POST", &format!("{path}/share/on"), None, Some(&bob.token))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request("POST", &format!("{path}/share/on"), None, Some(&alice.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["shared"], true);

    let response = app.request("GET", &path, None, Some(&bob.token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["owner"], "alice");
    let response = app.request("GET", &path, None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("POST", &format!("{path}/share/off"), None, Some(&alice.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["shared"], false);

    let response = app.request("GET", &path, None, Some(&bob.token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request("POST", &format!("{path}/share/maybe"), None, Some(&alice.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "BAD_REQUEST");
}

#[tokio::test]
async fn test_fetch_missing_and_malformed_addresses() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");

    let response = app
        .request(
            "GET",
            &format!("/api/state/{}/1/main", Uuid::new_v4()),
            None,
            Some(&alice.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), "NOT_FOUND");

    let response = app
        .request("GET", "/api/state/not-a-uuid/1/main", None, None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_IDENTIFIER");

    let response = app
        .request(
            "GET",
            &format!("/api/state/{}/zero/main", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_update_rules() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");
    let bob = app.user("bob");

    let save = app.create_save(&alice, circuit("{}", "Draft")).await;
    let id = save["save_id"].as_str().unwrap();
    let path = format!("/api/state/{id}");

    // Payload is checked before anything else.
    for user in [&alice, &bob] {
        for body in [json!({ "name": "x" }), json!({ "name": "" })] {
            let response = app
                .request("POST", &path, Some(body), Some(&user.token))
                .await;
            assert_eq!(response.status, StatusCode::NOT_ACCEPTABLE);
            assert_eq!(response.error_code(), "NOT_ACCEPTABLE");
        }
    }
    let response = app
        .request(
            "POST",
            &format!("/api/state/{}", Uuid::new_v4()),
            Some(json!({})),
            Some(&bob.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_ACCEPTABLE);

    let response = app
        .request(
            "POST",
            &path,
            Some(json!({ "data_dump": "{\"x\":1}" })),
            Some(&bob.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            "POST",
            &path,
            Some(json!({ "data_dump": "{\"x\":1}", "name": "Final", "shared": true })),
            Some(&alice.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["name"], "Final");
    assert_eq!(response.data()["shared"], true);
    assert!(response.data().get("data_dump").is_none());

    let response = app
        .request("GET", &format!("{path}/1/main"), None, Some(&bob.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["data_dump"], "{\"x\":1}");
}

#[tokio::test]
async fn test_delete_requires_owner_and_project_role() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");
    let bob = app.user("bob");
    let role = Uuid::new_v4();
    let state = Uuid::new_v4();
    let project_id = Uuid::new_v4();

    app.store
        .insert_project(Project {
            project_id,
            title: "Published adder".to_string(),
            state_id: state,
            author_id: alice.id,
            created_at: Utc::now(),
        })
        .await;

    let mut body = circuit("{}", "Published");
    body["project_id"] = json!(project_id);
    let save = app.create_save(&alice, body).await;
    assert_eq!(save["project_id"], project_id.to_string());
    let path = format!("/api/state/{}/1/main", save["save_id"].as_str().unwrap());

    let response = app.request("DELETE", &path, None, Some(&bob.token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.request("DELETE", &path, None, Some(&alice.token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    app.store.assign_role(alice.id, role).await;
    app.store.grant_delete_in_state(role, state).await;

    let response = app.request("DELETE", &path, None, Some(&alice.token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["done"], true);
    assert!(!app.store.has_project(project_id).await);

    let response = app.request("GET", &path, None, Some(&alice.token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_unlinked_save_by_owner() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");

    let save = app.create_save(&alice, circuit("{}", "Scratch")).await;
    let path = format!("/api/state/{}/1/main", save["save_id"].as_str().unwrap());

    let response = app.request("DELETE", &path, None, Some(&alice.token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.store.save_count().await, 0);
}

#[tokio::test]
async fn test_copy_creates_independent_save() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");
    let bob = app.user("bob");

    let save = app.create_save(&alice, circuit("{\"led\":true}", "Blink")).await;
    let id = save["save_id"].as_str().unwrap();

    let response = app
        .request("POST", &format!("/api/state/{id}/copy"), None, Some(&bob.token))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request("POST", &format!("/api/state/{id}/1/main/share/on"), None, Some(&alice.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("POST", &format!("/api/state/{id}/copy"), None, Some(&bob.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let copy_id = response.data()["save_id"].as_str().unwrap().to_string();
    assert_ne!(copy_id, id);

    let response = app
        .request("GET", &format!("/api/state/{copy_id}/1/main"), None, Some(&bob.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["name"], "Copy of Blink");
    assert_eq!(response.data()["owner"], "bob");
    assert_eq!(response.data()["shared"], false);
    assert_eq!(response.data()["data_dump"], "{\"led\":true}");

    let response = app
        .request("GET", &format!("/api/state/{id}/1/main"), None, Some(&alice.token))
        .await;
    assert_eq!(response.data()["name"], "Blink");
    assert_eq!(response.data()["owner"], "alice");
    assert_eq!(app.store.save_count().await, 2);
}

#[tokio::test]
async fn test_versions_and_listings() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");
    let bob = app.user("bob");

    let first = app.create_save(&alice, circuit("v1", "Counter")).await;
    let id = first["save_id"].as_str().unwrap().to_string();

    let mut next = circuit("v2", "Counter");
    next["save_id"] = json!(id);
    let second = app.create_save(&alice, next).await;
    assert_eq!(second["save_id"], id.as_str());
    assert_eq!(second["version"], 2);

    let mut arduino = circuit("sketch", "Sketch");
    arduino["is_arduino"] = json!(true);
    app.create_save(&alice, arduino).await;

    let response = app
        .request("GET", &format!("/api/state/{id}/versions"), None, Some(&alice.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let versions = response.data().as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["version"], 2);

    let response = app
        .request("GET", "/api/state/mine", None, Some(&alice.token))
        .await;
    assert_eq!(response.data().as_array().unwrap().len(), 2);

    let response = app
        .request("GET", "/api/state/mine?all=true", None, Some(&alice.token))
        .await;
    assert_eq!(response.data().as_array().unwrap().len(), 3);

    let response = app
        .request("GET", "/api/state/arduino", None, Some(&alice.token))
        .await;
    let arduino = response.data().as_array().unwrap();
    assert_eq!(arduino.len(), 1);
    assert_eq!(arduino[0]["name"], "Sketch");

    let exact = format!("/api/state/{id}/1/main/exact");
    let response = app.request("GET", &exact, None, Some(&alice.token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["data_dump"], "v1");

    let response = app.request("GET", &exact, None, Some(&bob.token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("GET", "/api/state/mine", None, Some(&bob.token))
        .await;
    assert_eq!(response.data().as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_search_filters_and_paginates() {
    let app = helpers::TestApp::new();
    let alice = app.user("alice");
    let bob = app.user("bob");

    app.create_save(&alice, circuit("a", "Blink LED")).await;
    app.create_save(&alice, circuit("b", "Fast blink")).await;
    let mut arduino = circuit("c", "Adder");
    arduino["is_arduino"] = json!(true);
    app.create_save(&alice, arduino).await;
    app.create_save(&bob, circuit("d", "Blink too")).await;

    let response = app
        .request(
            "GET",
            "/api/state/search?name=BLINK&per_page=1",
            None,
            Some(&alice.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let page = response.data();
    assert_eq!(page["total_items"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["name"], "Fast blink");
    assert_eq!(page["has_next"], true);

    let response = app
        .request(
            "GET",
            "/api/state/search?name=blink&page=2&per_page=1",
            None,
            Some(&alice.token),
        )
        .await;
    assert_eq!(response.data()["items"][0]["name"], "Blink LED");
    assert_eq!(response.data()["has_next"], false);

    let response = app
        .request(
            "GET",
            "/api/state/search?is_arduino=true",
            None,
            Some(&alice.token),
        )
        .await;
    assert_eq!(response.data()["total_items"], 1);
    assert_eq!(response.data()["items"][0]["name"], "Adder");

    let response = app
        .request("GET", "/api/state/search?is_arduino=maybe", None, Some(&alice.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_memory_store() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "ok");
    assert_eq!(response.data()["database"], "memory");
}
