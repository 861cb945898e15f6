// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{InMemoryConfigRepo, InMemoryResultRepo, InMemoryScheduleRepo};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use usage_scraper::domain::models::scraper_schedule::Frequency;
use usage_scraper::domain::repositories::scraper_schedule_repository::ScraperScheduleRepository;
use usage_scraper::domain::services::scraper_admin_service::{
    AdminError, NewScraperConfig, NewScraperSchedule, ScraperAdminService, ScraperConfigChanges,
    ScraperScheduleChanges,
};

struct Fixture {
    service: ScraperAdminService,
    schedules: Arc<InMemoryScheduleRepo>,
}

fn fixture() -> Fixture {
    let schedules = Arc::new(InMemoryScheduleRepo::default());
    let service = ScraperAdminService::new(
        Arc::new(InMemoryConfigRepo::default()),
        schedules.clone(),
        Arc::new(InMemoryResultRepo::default()),
    );
    Fixture { service, schedules }
}

fn new_config() -> NewScraperConfig {
    NewScraperConfig {
        name: "  Main line ".to_string(),
        url: "https://portal.example.com/login".to_string(),
        selector: Some("   ".to_string()),
        subject_identifier: "user@isp".to_string(),
        credential_key: "main".to_string(),
        created_by: "admin".to_string(),
    }
}

#[tokio::test]
async fn test_create_config_normalises_input() {
    let f = fixture();
    let config = f.service.create_config(new_config()).await.unwrap();

    assert_eq!(config.name, "Main line");
    assert!(config.selector.is_none());
    assert!(config.is_active);
    assert_eq!(f.service.get_config(config.id).await.unwrap(), config);
}

#[tokio::test]
async fn test_create_config_rejects_bad_url() {
    let f = fixture();
    let mut input = new_config();
    input.url = "ftp://portal.example.com".to_string();

    assert!(matches!(
        f.service.create_config(input).await,
        Err(AdminError::Validation(_))
    ));
}

#[tokio::test]
async fn test_deactivate_config_hides_it_from_active_listing() {
    let f = fixture();
    let config = f.service.create_config(new_config()).await.unwrap();

    let deactivated = f.service.deactivate_config(config.id).await.unwrap();
    assert!(!deactivated.is_active);
    assert!(f.service.list_configs(true).await.unwrap().is_empty());
    assert_eq!(f.service.list_configs(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_config_clears_selector() {
    let f = fixture();
    let mut input = new_config();
    input.selector = Some("table#usage".to_string());
    let config = f.service.create_config(input).await.unwrap();
    assert_eq!(config.selector.as_deref(), Some("table#usage"));

    let updated = f
        .service
        .update_config(
            config.id,
            ScraperConfigChanges {
                selector: Some(None),
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.selector.is_none());
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.url, config.url);
    assert_eq!(updated.subject_identifier, config.subject_identifier);
    assert_eq!(updated.credential_key, config.credential_key);
}

#[tokio::test]
async fn test_delete_config_with_schedules_is_a_conflict() {
    let f = fixture();
    let config = f.service.create_config(new_config()).await.unwrap();
    f.service
        .create_schedule(
            config.id,
            NewScraperSchedule {
                frequency: Frequency::Daily,
                interval: 1,
                custom_cron: None,
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        f.service.delete_config(config.id).await,
        Err(AdminError::Conflict(_))
    ));
    assert!(f.service.get_config(config.id).await.is_ok());
}

#[tokio::test]
async fn test_delete_unknown_config_is_not_found() {
    let f = fixture();
    assert!(matches!(
        f.service.delete_config(uuid::Uuid::new_v4()).await,
        Err(AdminError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_create_schedule_validates_cron() {
    let f = fixture();
    let config = f.service.create_config(new_config()).await.unwrap();

    let missing = f
        .service
        .create_schedule(
            config.id,
            NewScraperSchedule {
                frequency: Frequency::Custom,
                interval: 1,
                custom_cron: None,
            },
        )
        .await;
    assert!(matches!(missing, Err(AdminError::Schedule(_))));

    let invalid = f
        .service
        .create_schedule(
            config.id,
            NewScraperSchedule {
                frequency: Frequency::Custom,
                interval: 1,
                custom_cron: Some("61 * * * *".to_string()),
            },
        )
        .await;
    assert!(matches!(invalid, Err(AdminError::Schedule(_))));

    let valid = f
        .service
        .create_schedule(
            config.id,
            NewScraperSchedule {
                frequency: Frequency::Custom,
                interval: 1,
                custom_cron: Some("0 6 * * 1".to_string()),
            },
        )
        .await
        .unwrap();
    assert!(valid.next_run.is_none());
    assert_eq!(f.service.list_schedules(config.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_schedule_ignores_cron_for_fixed_frequency() {
    let f = fixture();
    let config = f.service.create_config(new_config()).await.unwrap();

    let schedule = f
        .service
        .create_schedule(
            config.id,
            NewScraperSchedule {
                frequency: Frequency::Weekly,
                interval: 2,
                custom_cron: Some("not a cron".to_string()),
            },
        )
        .await
        .unwrap();
    assert!(schedule.custom_cron.is_none());
    assert_eq!(schedule.interval, 2);
}

#[tokio::test]
async fn test_schedule_for_unknown_config_is_not_found() {
    let f = fixture();
    let result = f
        .service
        .create_schedule(
            uuid::Uuid::new_v4(),
            NewScraperSchedule {
                frequency: Frequency::Daily,
                interval: 1,
                custom_cron: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AdminError::NotFound(_))));
}

#[tokio::test]
async fn test_update_schedule_recurrence_resets_next_run() {
    let f = fixture();
    let config = f.service.create_config(new_config()).await.unwrap();
    let schedule = f
        .service
        .create_schedule(
            config.id,
            NewScraperSchedule {
                frequency: Frequency::Daily,
                interval: 1,
                custom_cron: None,
            },
        )
        .await
        .unwrap();

    let last_run = Utc::now() - Duration::minutes(30);
    f.schedules
        .record_run(schedule.id, last_run, Some(last_run + Duration::days(1)))
        .await
        .unwrap();

    let updated = f
        .service
        .update_schedule(
            schedule.id,
            ScraperScheduleChanges {
                frequency: Some(Frequency::Hourly),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.frequency, Frequency::Hourly);
    assert_eq!(updated.next_run, Some(last_run + Duration::hours(1)));
}

#[tokio::test]
async fn test_update_schedule_without_recurrence_change_keeps_next_run() {
    let f = fixture();
    let config = f.service.create_config(new_config()).await.unwrap();
    let schedule = f
        .service
        .create_schedule(
            config.id,
            NewScraperSchedule {
                frequency: Frequency::Daily,
                interval: 1,
                custom_cron: None,
            },
        )
        .await
        .unwrap();
    let next = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    f.schedules
        .record_run(schedule.id, next - Duration::days(1), Some(next))
        .await
        .unwrap();

    let updated = f
        .service
        .update_schedule(
            schedule.id,
            ScraperScheduleChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.next_run, Some(next));
}

#[tokio::test]
async fn test_update_schedule_to_bad_cron_is_rejected() {
    let f = fixture();
    let config = f.service.create_config(new_config()).await.unwrap();
    let schedule = f
        .service
        .create_schedule(
            config.id,
            NewScraperSchedule {
                frequency: Frequency::Daily,
                interval: 1,
                custom_cron: None,
            },
        )
        .await
        .unwrap();

    let result = f
        .service
        .update_schedule(
            schedule.id,
            ScraperScheduleChanges {
                frequency: Some(Frequency::Custom),
                custom_cron: Some(Some("whenever".to_string())),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AdminError::Schedule(_))));

    let stored = f.schedules.get(schedule.id).unwrap();
    assert_eq!(stored.frequency, Frequency::Daily);
}

#[tokio::test]
async fn test_latest_result_without_runs_is_not_found() {
    let f = fixture();
    let config = f.service.create_config(new_config()).await.unwrap();
    assert!(matches!(
        f.service.latest_result(config.id).await,
        Err(AdminError::NotFound(_))
    ));
    assert!(f
        .service
        .list_results(config.id, None, None)
        .await
        .unwrap()
        .is_empty());
}
