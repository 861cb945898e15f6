// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

mod memory_repos;

pub use memory_repos::{InMemoryConfigRepo, InMemoryResultRepo, InMemoryScheduleRepo};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use usage_scraper::config::settings::{PortalSettings, SchedulerSettings};
use usage_scraper::domain::models::scraper_config::ScraperConfig;
use usage_scraper::domain::services::usage_extractor::UsageExtractor;
use usage_scraper::engines::fake_portal::FakePortal;
use usage_scraper::engines::traits::{CredentialSource, Credentials};
use usage_scraper::queue::ScraperScheduler;
use usage_scraper::utils::retry_policy::RetryPolicy;
use usage_scraper::workers::RunExecutor;

/// 测试用凭据来源，只认识 `main`
pub struct StaticCredentials(HashMap<String, Credentials>);

impl StaticCredentials {
    pub fn reseller() -> Self {
        let mut map = HashMap::new();
        map.insert(
            "main".to_string(),
            Credentials {
                username: "reseller".to_string(),
                password: "secret".to_string(),
            },
        );
        Self(map)
    }
}

impl CredentialSource for StaticCredentials {
    fn credentials(&self, key: &str) -> Option<Credentials> {
        self.0.get(key).cloned()
    }
}

pub fn scheduler_settings() -> SchedulerSettings {
    SchedulerSettings {
        enabled: true,
        tick_seconds: 60,
        max_run_seconds: 300,
        max_concurrent_runs: 4,
        auth_failure_threshold: 3,
    }
}

/// 基于内存仓库与模拟门户的调度器测试环境
pub struct Harness {
    pub portal: FakePortal,
    pub configs: Arc<InMemoryConfigRepo>,
    pub schedules: Arc<InMemoryScheduleRepo>,
    pub results: Arc<InMemoryResultRepo>,
    pub scheduler: ScraperScheduler,
}

impl Harness {
    pub fn new(portal: FakePortal) -> Self {
        Self::with_settings(portal, scheduler_settings())
    }

    pub fn with_settings(portal: FakePortal, settings: SchedulerSettings) -> Self {
        let configs = Arc::new(InMemoryConfigRepo::default());
        let schedules = Arc::new(InMemoryScheduleRepo::default());
        let results = Arc::new(InMemoryResultRepo::default());

        let executor = Arc::new(RunExecutor::new(
            UsageExtractor::new(Arc::new(portal.clone()), PortalSettings::default()),
            Arc::new(StaticCredentials::reseller()),
            RetryPolicy::none(),
            Duration::from_secs(settings.max_run_seconds),
        ));
        let scheduler = ScraperScheduler::new(
            configs.clone(),
            schedules.clone(),
            results.clone(),
            executor,
            settings,
        );

        Self {
            portal,
            configs,
            schedules,
            results,
            scheduler,
        }
    }

    /// 写入一个指向模拟门户的启用配置
    pub fn add_config(&self, subject: &str) -> ScraperConfig {
        let config = ScraperConfig::new(
            format!("Line {}", subject),
            self.portal.login_url(),
            subject.to_string(),
            "main".to_string(),
            "tests".to_string(),
        );
        self.configs.insert(config.clone());
        config
    }
}
