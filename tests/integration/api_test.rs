// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{InMemoryConfigRepo, InMemoryResultRepo, InMemoryScheduleRepo};
use axum::http::StatusCode;
use axum::Extension;
use axum_test::TestServer;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use usage_scraper::domain::models::scraper_result::{ErrorKind, RunResult};
use usage_scraper::domain::repositories::scraper_result_repository::ScraperResultRepository;
use usage_scraper::domain::services::scraper_admin_service::ScraperAdminService;
use usage_scraper::presentation::routes;
use uuid::Uuid;

struct TestApp {
    server: TestServer,
    results: Arc<InMemoryResultRepo>,
}

fn test_app() -> TestApp {
    let results = Arc::new(InMemoryResultRepo::default());
    let service = Arc::new(ScraperAdminService::new(
        Arc::new(InMemoryConfigRepo::default()),
        Arc::new(InMemoryScheduleRepo::default()),
        results.clone(),
    ));
    let app = routes::routes().layer(Extension(service));

    TestApp {
        server: TestServer::new(app).expect("failed to start test server"),
        results,
    }
}

async fn create_scraper(app: &TestApp) -> Value {
    let response = app
        .server
        .post("/v1/scrapers")
        .json(&json!({
            "name": "Main line",
            "url": "https://portal.example.com/login",
            "subjectIdentifier": "user@isp",
            "credentialKey": "main",
            "createdBy": "admin"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn test_health_and_version() {
    let app = test_app();

    let health = app.server.get("/health").await;
    health.assert_status_ok();
    health.assert_text("OK");

    let version = app.server.get("/v1/version").await;
    version.assert_status_ok();
    version.assert_text(env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_create_and_fetch_scraper() {
    let app = test_app();
    let created = create_scraper(&app).await;

    assert_eq!(created["name"], "Main line");
    assert_eq!(created["isActive"], true);
    let id = created["id"].as_str().unwrap();

    let fetched = app.server.get(&format!("/v1/scrapers/{}", id)).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["subjectIdentifier"], "user@isp");

    let listed = app.server.get("/v1/scrapers").await.json::<Value>();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_scraper_validation_error() {
    let app = test_app();
    let response = app
        .server
        .post("/v1/scrapers")
        .json(&json!({
            "name": "",
            "url": "not a url",
            "subjectIdentifier": "user@isp",
            "credentialKey": "main",
            "createdBy": "admin"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_unknown_scraper_is_not_found() {
    let app = test_app();
    let response = app
        .server
        .get(&format!("/v1/scrapers/{}", Uuid::new_v4()))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_patch_cannot_retarget_scraper() {
    let app = test_app();
    let created = create_scraper(&app).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .server
        .patch(&format!("/v1/scrapers/{}", id))
        .json(&json!({
            "url": "https://evil.example/login",
            "subjectIdentifier": "other@isp",
            "credentialKey": "k2"
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let fetched = app
        .server
        .get(&format!("/v1/scrapers/{}", id))
        .await
        .json::<Value>();
    assert_eq!(fetched["url"], "https://portal.example.com/login");
    assert_eq!(fetched["subjectIdentifier"], "user@isp");
    assert_eq!(fetched["credentialKey"], "main");
}

#[tokio::test]
async fn test_deactivate_via_patch_and_filter_active() {
    let app = test_app();
    let created = create_scraper(&app).await;
    let id = created["id"].as_str().unwrap();

    let patched = app
        .server
        .patch(&format!("/v1/scrapers/{}", id))
        .json(&json!({ "isActive": false }))
        .await;
    patched.assert_status_ok();
    assert_eq!(patched.json::<Value>()["isActive"], false);

    let active = app
        .server
        .get("/v1/scrapers")
        .add_query_param("activeOnly", true)
        .await
        .json::<Value>();
    assert!(active.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_schedule_lifecycle_and_delete_conflict() {
    let app = test_app();
    let created = create_scraper(&app).await;
    let id = created["id"].as_str().unwrap();

    let bad = app
        .server
        .post(&format!("/v1/scrapers/{}/schedules", id))
        .json(&json!({ "frequency": "custom", "customCron": "every so often" }))
        .await;
    bad.assert_status(StatusCode::BAD_REQUEST);

    let schedule = app
        .server
        .post(&format!("/v1/scrapers/{}/schedules", id))
        .json(&json!({ "frequency": "hourly", "interval": 2 }))
        .await;
    schedule.assert_status(StatusCode::CREATED);
    let schedule = schedule.json::<Value>();
    assert_eq!(schedule["frequency"], "hourly");
    assert_eq!(schedule["interval"], 2);
    assert!(schedule["nextRun"].is_null());

    let schedule_id = schedule["id"].as_str().unwrap();
    let updated = app
        .server
        .patch(&format!("/v1/schedules/{}", schedule_id))
        .json(&json!({ "frequency": "custom", "customCron": "0 6 * * 1" }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["customCron"], "0 6 * * 1");

    let deleted = app.server.delete(&format!("/v1/scrapers/{}", id)).await;
    deleted.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_scraper_without_schedules() {
    let app = test_app();
    let created = create_scraper(&app).await;
    let id = created["id"].as_str().unwrap();

    app.server
        .delete(&format!("/v1/scrapers/{}", id))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .get(&format!("/v1/scrapers/{}", id))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_results_endpoints() {
    let app = test_app();
    let created = create_scraper(&app).await;
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    app.server
        .get(&format!("/v1/scrapers/{}/results/latest", id))
        .await
        .assert_status_not_found();

    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    for hour in 0..3 {
        app.results
            .save(&RunResult::succeeded(
                id,
                base + Duration::hours(hour),
                100,
                json!({ "hour": hour }),
                1,
            ))
            .await
            .unwrap();
    }
    app.results
        .save(&RunResult::failed(
            id,
            base + Duration::hours(3),
            100,
            ErrorKind::Authentication,
            "Authentication failed: bad password",
            1,
        ))
        .await
        .unwrap();

    let latest = app
        .server
        .get(&format!("/v1/scrapers/{}/results/latest", id))
        .await;
    latest.assert_status_ok();
    let latest = latest.json::<Value>();
    assert_eq!(latest["success"], false);
    assert_eq!(latest["errorKind"], "authentication");

    let limited = app
        .server
        .get(&format!("/v1/scrapers/{}/results", id))
        .add_query_param("limit", 2)
        .await
        .json::<Value>();
    assert_eq!(limited.as_array().unwrap().len(), 2);

    let since = app
        .server
        .get(&format!("/v1/scrapers/{}/results", id))
        .add_query_param("since", "2024-03-01T02:00:00Z")
        .await
        .json::<Value>();
    assert_eq!(since.as_array().unwrap().len(), 2);

    let between = app
        .server
        .get(&format!("/v1/scrapers/{}/results", id))
        .add_query_param("from", "2024-03-01T01:00:00Z")
        .add_query_param("to", "2024-03-01T03:00:00Z")
        .await
        .json::<Value>();
    let between = between.as_array().unwrap();
    assert_eq!(between.len(), 2);
    assert_eq!(between[0]["resultData"]["hour"], 2);

    app.server
        .get(&format!("/v1/scrapers/{}/results", id))
        .add_query_param("limit", 0)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
