// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use usage_scraper::config::settings::PortalSettings;
use usage_scraper::domain::models::usage::YearMonth;
use usage_scraper::domain::services::usage_extractor::{ExtractionTarget, UsageExtractor};
use usage_scraper::engines::fake_portal::{FakePortal, FakeScript};
use usage_scraper::engines::traits::{Credentials, ExtractionError};

fn target(portal: &FakePortal, subject: &str) -> ExtractionTarget {
    ExtractionTarget {
        login_url: portal.login_url(),
        subject: subject.to_string(),
        month: None,
        credentials: Credentials {
            username: "reseller".to_string(),
            password: "secret".to_string(),
        },
        usage_table_selector: None,
    }
}

fn extractor(portal: &FakePortal) -> UsageExtractor {
    UsageExtractor::new(Arc::new(portal.clone()), PortalSettings::default())
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(60)
}

#[tokio::test]
async fn test_session_closed_exactly_once_whichever_phase_fails() {
    let scripts = [
        ("login", FakeScript { reject_login: true, ..Default::default() }, "ghost@isp"),
        ("search", FakeScript::default(), "ghost@isp"),
        ("monthly", FakeScript { missing_usage_table: true, ..Default::default() }, "user@isp"),
        ("success", FakeScript::default(), "user@isp"),
    ];

    for (phase, script, subject) in scripts {
        let portal = FakePortal::default().with_script(script);
        let _ = extractor(&portal).extract(&target(&portal, subject), deadline()).await;

        assert_eq!(portal.sessions_opened(), 1, "phase {}", phase);
        assert_eq!(portal.sessions_closed(), 1, "phase {}", phase);
    }
}

#[tokio::test]
async fn test_every_month_has_one_daily_row_per_calendar_day() {
    let latest = YearMonth::new(2024, 4).unwrap();
    let portal = FakePortal::default().with_history(&["user@isp"], latest, 4);

    let report = extractor(&portal)
        .extract(&target(&portal, "user@isp"), deadline())
        .await
        .unwrap();

    assert_eq!(report.records.len(), 4);
    for (month, days) in [(1, 31), (2, 29), (3, 31), (4, 30)] {
        let ym = YearMonth::new(2024, month).unwrap();
        assert_eq!(report.daily[&ym].len(), days, "month {}", ym);
    }
    assert!(!report.is_partial());
}

#[tokio::test]
async fn test_monthly_totals_match_daily_sums() {
    let portal = FakePortal::default();
    let report = extractor(&portal)
        .extract(&target(&portal, "user@isp"), deadline())
        .await
        .unwrap();

    for record in &report.records {
        let daily_total: u64 = report.daily[&record.year_month]
            .iter()
            .map(|d| d.total_bytes)
            .sum();
        assert_eq!(daily_total, record.total_bytes, "month {}", record.year_month);
        assert_eq!(record.subject_identifier, "user@isp");
    }
}

#[tokio::test]
async fn test_unknown_subject_is_not_found() {
    let portal = FakePortal::default();
    let err = extractor(&portal)
        .extract(&target(&portal, "nobody@isp"), deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::NotFound(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_custom_usage_table_selector_is_honoured() {
    let portal = FakePortal::default();
    let mut target = target(&portal, "user@isp");
    target.usage_table_selector = Some("table.does-not-exist".to_string());

    let err = extractor(&portal)
        .extract(&target, deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Extraction(_)));
    assert_eq!(portal.sessions_closed(), 1);
}
