// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Duration, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use usage_scraper::config::settings::DatabaseSettings;
use usage_scraper::domain::models::scraper_config::ScraperConfig;
use usage_scraper::domain::models::scraper_result::{ErrorKind, RunResult};
use usage_scraper::domain::models::scraper_schedule::{Frequency, ScraperSchedule};
use usage_scraper::domain::repositories::scraper_config_repository::ScraperConfigRepository;
use usage_scraper::domain::repositories::scraper_result_repository::ScraperResultRepository;
use usage_scraper::domain::repositories::scraper_schedule_repository::ScraperScheduleRepository;
use usage_scraper::infrastructure::database::connection;
use usage_scraper::infrastructure::repositories::scraper_config_repo_impl::ScraperConfigRepoImpl;
use usage_scraper::infrastructure::repositories::scraper_result_repo_impl::ScraperResultRepoImpl;
use usage_scraper::infrastructure::repositories::scraper_schedule_repo_impl::ScraperScheduleRepoImpl;
use usage_scraper::utils::errors::RepositoryError;
use uuid::Uuid;

async fn sqlite() -> Arc<DatabaseConnection> {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: None,
        min_connections: None,
        connect_timeout: Some(5),
        idle_timeout: None,
    };
    Arc::new(
        connection::connect_and_migrate(&settings)
            .await
            .expect("failed to migrate in-memory database"),
    )
}

fn sample_config() -> ScraperConfig {
    ScraperConfig::new(
        "Main line".to_string(),
        "https://portal.example.com/login".to_string(),
        "user@isp".to_string(),
        "main".to_string(),
        "tests".to_string(),
    )
    .with_selector("table.usage-history")
}

#[tokio::test]
async fn test_config_crud_round_trip() {
    let db = sqlite().await;
    let repo = ScraperConfigRepoImpl::new(db);

    let config = sample_config();
    let created = repo.create(&config).await.unwrap();
    assert_eq!(created.id, config.id);
    assert_eq!(created.selector.as_deref(), Some("table.usage-history"));

    let mut changed = created.clone();
    changed.name = "Renamed".to_string();
    changed.is_active = false;
    changed.created_by = "someone else".to_string();
    changed.url = "https://evil.example/login".to_string();
    changed.subject_identifier = "other@isp".to_string();
    changed.credential_key = "k2".to_string();
    let updated = repo.update(&changed).await.unwrap();
    assert_eq!(updated.name, "Renamed");
    assert!(!updated.is_active);
    assert_eq!(updated.created_by, "tests");
    assert_eq!(updated.url, "https://portal.example.com/login");
    assert_eq!(updated.subject_identifier, "user@isp");
    assert_eq!(updated.credential_key, "main");

    assert!(repo.list(true).await.unwrap().is_empty());
    assert_eq!(repo.list(false).await.unwrap().len(), 1);

    repo.delete(config.id).await.unwrap();
    assert!(repo.find_by_id(config.id).await.unwrap().is_none());
    assert!(matches!(
        repo.delete(config.id).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn test_schedule_due_selection_and_run_bookkeeping() {
    let db = sqlite().await;
    let configs = ScraperConfigRepoImpl::new(db.clone());
    let schedules = ScraperScheduleRepoImpl::new(db);

    let config = configs.create(&sample_config()).await.unwrap();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let never_run = ScraperSchedule::new(config.id, Frequency::Hourly, 1);
    let mut overdue = ScraperSchedule::new(config.id, Frequency::Daily, 1);
    overdue.next_run = Some(now - Duration::minutes(5));
    let mut future = ScraperSchedule::new(config.id, Frequency::Weekly, 1);
    future.next_run = Some(now + Duration::hours(1));
    let mut inactive = ScraperSchedule::new(config.id, Frequency::Monthly, 1);
    inactive.next_run = Some(now - Duration::days(1));
    inactive.is_active = false;

    for schedule in [&never_run, &overdue, &future, &inactive] {
        schedules.create(schedule).await.unwrap();
    }

    let mut due: Vec<Uuid> = schedules
        .find_due(now)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    due.sort();
    let mut expected = vec![never_run.id, overdue.id];
    expected.sort();
    assert_eq!(due, expected);

    let next = now + Duration::hours(1);
    schedules.record_run(never_run.id, now, Some(next)).await.unwrap();
    let stored = schedules.find_by_id(never_run.id).await.unwrap().unwrap();
    assert_eq!(stored.last_run, Some(now));
    assert_eq!(stored.next_run, Some(next));

    schedules.set_active(overdue.id, false).await.unwrap();
    assert!(schedules.find_due(now).await.unwrap().is_empty());

    assert_eq!(schedules.find_by_config_id(config.id).await.unwrap().len(), 4);
    assert!(matches!(
        schedules.set_active(Uuid::new_v4(), true).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn test_schedule_update_keeps_last_run() {
    let db = sqlite().await;
    let configs = ScraperConfigRepoImpl::new(db.clone());
    let schedules = ScraperScheduleRepoImpl::new(db);

    let config = configs.create(&sample_config()).await.unwrap();
    let schedule = schedules
        .create(&ScraperSchedule::new(config.id, Frequency::Daily, 1))
        .await
        .unwrap();
    let last_run = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    schedules.record_run(schedule.id, last_run, None).await.unwrap();

    let mut changed = schedule.clone();
    changed.frequency = Frequency::Custom;
    changed.custom_cron = Some("0 6 * * 1".to_string());
    changed.last_run = None;
    let reset = Utc.with_ymd_and_hms(2024, 1, 8, 6, 0, 0).unwrap();
    let updated = schedules.update(&changed, Some(Some(reset))).await.unwrap();

    assert_eq!(updated.frequency, Frequency::Custom);
    assert_eq!(updated.custom_cron.as_deref(), Some("0 6 * * 1"));
    assert_eq!(updated.last_run, Some(last_run));
    assert_eq!(updated.next_run, Some(reset));
}

#[tokio::test]
async fn test_schedule_update_does_not_overwrite_advanced_next_run() {
    let db = sqlite().await;
    let configs = ScraperConfigRepoImpl::new(db.clone());
    let schedules = ScraperScheduleRepoImpl::new(db);

    let config = configs.create(&sample_config()).await.unwrap();
    let schedule = schedules
        .create(&ScraperSchedule::new(config.id, Frequency::Daily, 1))
        .await
        .unwrap();

    // 管理端读取后、写回前，一次运行推进了 next_run
    let stale = schedules.find_by_id(schedule.id).await.unwrap().unwrap();
    let last_run = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let advanced = last_run + Duration::days(1);
    schedules
        .record_run(schedule.id, last_run, Some(advanced))
        .await
        .unwrap();

    let mut changed = stale;
    changed.is_active = false;
    let updated = schedules.update(&changed, None).await.unwrap();

    assert!(!updated.is_active);
    assert_eq!(updated.last_run, Some(last_run));
    assert_eq!(updated.next_run, Some(advanced));
}

#[tokio::test]
async fn test_config_with_schedules_cannot_be_deleted() {
    let db = sqlite().await;
    let configs = ScraperConfigRepoImpl::new(db.clone());
    let schedules = ScraperScheduleRepoImpl::new(db);

    let config = configs.create(&sample_config()).await.unwrap();
    schedules
        .create(&ScraperSchedule::new(config.id, Frequency::Daily, 1))
        .await
        .unwrap();

    assert!(configs.delete(config.id).await.is_err());
    assert!(configs.find_by_id(config.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_results_are_listed_newest_first() {
    let db = sqlite().await;
    let results = ScraperResultRepoImpl::new(db);
    let config_id = Uuid::new_v4();
    let other_config = Uuid::new_v4();
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

    for day in 0..5 {
        let result = if day % 2 == 0 {
            RunResult::succeeded(
                config_id,
                base + Duration::days(day),
                1_500,
                json!({ "records": [] }),
                1,
            )
        } else {
            RunResult::failed(
                config_id,
                base + Duration::days(day),
                900,
                ErrorKind::Infrastructure,
                "connection reset",
                3,
            )
        };
        results.save(&result).await.unwrap();
    }
    results
        .save(&RunResult::succeeded(other_config, base, 10, json!({}), 1))
        .await
        .unwrap();

    let all = results.list_results(config_id, None, None).await.unwrap();
    assert_eq!(all.len(), 5);
    assert!(all
        .windows(2)
        .all(|pair| pair[0].execution_time >= pair[1].execution_time));
    assert_eq!(all[0].execution_time, base + Duration::days(4));

    let since = results
        .list_results(config_id, Some(base + Duration::days(3)), None)
        .await
        .unwrap();
    assert_eq!(since.len(), 2);

    let limited = results.list_results(config_id, None, Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);

    let latest = results.get_latest(config_id).await.unwrap().unwrap();
    assert!(latest.success);
    assert_eq!(latest.result_data, Some(json!({ "records": [] })));

    let between = results
        .list_between(config_id, base + Duration::days(1), base + Duration::days(3))
        .await
        .unwrap();
    assert_eq!(between.len(), 2);
    let failure = between.iter().find(|r| !r.success).unwrap();
    assert_eq!(failure.error_kind, Some(ErrorKind::Infrastructure));
    assert_eq!(failure.error_message.as_deref(), Some("connection reset"));
    assert_eq!(failure.attempts, 3);
    assert_eq!(failure.duration_ms, 900);

    assert!(results.get_latest(Uuid::new_v4()).await.unwrap().is_none());
}
