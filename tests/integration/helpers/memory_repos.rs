// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::Duration;
use usage_scraper::domain::models::scraper_config::ScraperConfig;
use usage_scraper::domain::models::scraper_result::ScraperResult;
use usage_scraper::domain::models::scraper_schedule::ScraperSchedule;
use usage_scraper::domain::repositories::scraper_config_repository::ScraperConfigRepository;
use usage_scraper::domain::repositories::scraper_result_repository::ScraperResultRepository;
use usage_scraper::domain::repositories::scraper_schedule_repository::ScraperScheduleRepository;
use usage_scraper::utils::errors::RepositoryError;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryConfigRepo {
    items: DashMap<Uuid, ScraperConfig>,
    lookup_delay: Mutex<Option<Duration>>,
}

impl InMemoryConfigRepo {
    /// 之后每次 `find_by_id` 都先等待 `delay`
    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock() = Some(delay);
    }

    pub fn insert(&self, config: ScraperConfig) {
        self.items.insert(config.id, config);
    }

    pub fn set_active(&self, id: Uuid, active: bool) {
        if let Some(mut config) = self.items.get_mut(&id) {
            config.is_active = active;
        }
    }
}

#[async_trait]
impl ScraperConfigRepository for InMemoryConfigRepo {
    async fn create(&self, config: &ScraperConfig) -> Result<ScraperConfig, RepositoryError> {
        self.items.insert(config.id, config.clone());
        Ok(config.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperConfig>, RepositoryError> {
        let delay = *self.lookup_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.items.get(&id).map(|c| c.clone()))
    }

    async fn update(&self, config: &ScraperConfig) -> Result<ScraperConfig, RepositoryError> {
        match self.items.get_mut(&config.id) {
            Some(mut existing) => {
                *existing = config.clone();
                Ok(config.clone())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(&self, active_only: bool) -> Result<Vec<ScraperConfig>, RepositoryError> {
        let mut configs: Vec<_> = self
            .items
            .iter()
            .filter(|c| !active_only || c.is_active)
            .map(|c| c.clone())
            .collect();
        configs.sort_by_key(|c| c.created_at);
        Ok(configs)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.items
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
pub struct InMemoryScheduleRepo {
    items: DashMap<Uuid, ScraperSchedule>,
}

impl InMemoryScheduleRepo {
    pub fn insert(&self, schedule: ScraperSchedule) {
        self.items.insert(schedule.id, schedule);
    }

    pub fn get(&self, id: Uuid) -> Option<ScraperSchedule> {
        self.items.get(&id).map(|s| s.clone())
    }
}

#[async_trait]
impl ScraperScheduleRepository for InMemoryScheduleRepo {
    async fn create(&self, schedule: &ScraperSchedule) -> Result<ScraperSchedule, RepositoryError> {
        self.items.insert(schedule.id, schedule.clone());
        Ok(schedule.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperSchedule>, RepositoryError> {
        Ok(self.get(id))
    }

    async fn update(
        &self,
        schedule: &ScraperSchedule,
        next_run: Option<Option<DateTime<Utc>>>,
    ) -> Result<ScraperSchedule, RepositoryError> {
        let mut existing = self
            .items
            .get_mut(&schedule.id)
            .ok_or(RepositoryError::NotFound)?;
        existing.frequency = schedule.frequency;
        existing.interval = schedule.interval;
        existing.custom_cron = schedule.custom_cron.clone();
        existing.is_active = schedule.is_active;
        existing.updated_at = schedule.updated_at;
        if let Some(next_run) = next_run {
            existing.next_run = next_run;
        }
        Ok(existing.clone())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<ScraperSchedule>, RepositoryError> {
        Ok(self
            .items
            .iter()
            .filter(|s| s.is_due(now))
            .map(|s| s.clone())
            .collect())
    }

    async fn find_by_config_id(
        &self,
        config_id: Uuid,
    ) -> Result<Vec<ScraperSchedule>, RepositoryError> {
        Ok(self
            .items
            .iter()
            .filter(|s| s.scraper_config_id == config_id)
            .map(|s| s.clone())
            .collect())
    }

    async fn record_run(
        &self,
        id: Uuid,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let mut schedule = self.items.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        schedule.last_run = Some(last_run);
        schedule.next_run = next_run;
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), RepositoryError> {
        let mut schedule = self.items.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        schedule.is_active = active;
        Ok(())
    }
}

/// 追加写入的结果存储
#[derive(Default)]
pub struct InMemoryResultRepo {
    items: Mutex<Vec<ScraperResult>>,
}

impl InMemoryResultRepo {
    pub fn all(&self) -> Vec<ScraperResult> {
        self.items.lock().clone()
    }
}

#[async_trait]
impl ScraperResultRepository for InMemoryResultRepo {
    async fn save(&self, result: &ScraperResult) -> Result<(), RepositoryError> {
        self.items.lock().push(result.clone());
        Ok(())
    }

    async fn list_results(
        &self,
        config_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: Option<u64>,
    ) -> Result<Vec<ScraperResult>, RepositoryError> {
        let items = self.items.lock();
        // 同一时刻的结果按写入顺序倒序
        let mut results: Vec<_> = items
            .iter()
            .enumerate()
            .filter(|(_, r)| r.scraper_config_id == config_id)
            .filter(|(_, r)| since.is_none_or(|since| r.execution_time >= since))
            .map(|(i, r)| (i, r.clone()))
            .collect();
        results.sort_by(|(ia, a), (ib, b)| {
            b.execution_time
                .cmp(&a.execution_time)
                .then_with(|| ib.cmp(ia))
        });

        let results = results.into_iter().map(|(_, r)| r);
        Ok(match limit {
            Some(limit) => results.take(limit as usize).collect(),
            None => results.collect(),
        })
    }

    async fn get_latest(&self, config_id: Uuid) -> Result<Option<ScraperResult>, RepositoryError> {
        Ok(self
            .list_results(config_id, None, Some(1))
            .await?
            .into_iter()
            .next())
    }

    async fn list_between(
        &self,
        config_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ScraperResult>, RepositoryError> {
        Ok(self
            .list_results(config_id, Some(from), None)
            .await?
            .into_iter()
            .filter(|r| r.execution_time < to)
            .collect())
    }
}
