// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_config::ScraperConfig;
use crate::domain::models::scraper_result::ScraperResult;
use crate::domain::models::scraper_schedule::{Frequency, ScraperSchedule};
use crate::domain::repositories::scraper_config_repository::ScraperConfigRepository;
use crate::domain::repositories::scraper_result_repository::ScraperResultRepository;
use crate::domain::repositories::scraper_schedule_repository::ScraperScheduleRepository;
use crate::domain::services::recurrence::{self, ScheduleError};
use crate::utils::errors::RepositoryError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use url::Url;
use uuid::Uuid;

/// 配置管理错误
#[derive(Error, Debug)]
pub enum AdminError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// 新建配置的输入
#[derive(Debug, Clone)]
pub struct NewScraperConfig {
    pub name: String,
    pub url: String,
    pub selector: Option<String>,
    pub subject_identifier: String,
    pub credential_key: String,
    pub created_by: String,
}

/// 配置的可修改字段，`None` 表示不变
///
/// 目标地址、账户标识与凭据键创建后不可修改，已有结果始终对应产生它们的目标。
#[derive(Debug, Clone, Default)]
pub struct ScraperConfigChanges {
    pub name: Option<String>,
    /// `Some(None)` 清除选择器
    pub selector: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// 新建调度的输入
#[derive(Debug, Clone)]
pub struct NewScraperSchedule {
    pub frequency: Frequency,
    pub interval: u32,
    pub custom_cron: Option<String>,
}

/// 调度的可修改字段，`None` 表示不变
#[derive(Debug, Clone, Default)]
pub struct ScraperScheduleChanges {
    pub frequency: Option<Frequency>,
    pub interval: Option<u32>,
    pub custom_cron: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// 抓取配置管理服务
///
/// 供外部的管理界面创建、修改、停用和删除配置与调度。
/// 调度器每个 tick 重新读取仓库，因此这里的修改无需重启即可生效。
#[derive(Clone)]
pub struct ScraperAdminService {
    configs: Arc<dyn ScraperConfigRepository>,
    schedules: Arc<dyn ScraperScheduleRepository>,
    results: Arc<dyn ScraperResultRepository>,
}

impl ScraperAdminService {
    pub fn new(
        configs: Arc<dyn ScraperConfigRepository>,
        schedules: Arc<dyn ScraperScheduleRepository>,
        results: Arc<dyn ScraperResultRepository>,
    ) -> Self {
        Self {
            configs,
            schedules,
            results,
        }
    }

    pub async fn create_config(&self, input: NewScraperConfig) -> Result<ScraperConfig, AdminError> {
        validate_url(&input.url)?;
        require("name", &input.name)?;
        require("subjectIdentifier", &input.subject_identifier)?;
        require("credentialKey", &input.credential_key)?;

        let mut config = ScraperConfig::new(
            input.name.trim().to_string(),
            input.url,
            input.subject_identifier.trim().to_string(),
            input.credential_key,
            input.created_by,
        );
        config.selector = input.selector.filter(|s| !s.trim().is_empty());

        let created = self.configs.create(&config).await?;
        info!("Created scraper config {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn get_config(&self, id: Uuid) -> Result<ScraperConfig, AdminError> {
        self.configs
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("scraper config {}", id)))
    }

    pub async fn list_configs(&self, active_only: bool) -> Result<Vec<ScraperConfig>, AdminError> {
        Ok(self.configs.list(active_only).await?)
    }

    pub async fn update_config(
        &self,
        id: Uuid,
        changes: ScraperConfigChanges,
    ) -> Result<ScraperConfig, AdminError> {
        let mut config = self.get_config(id).await?;

        if let Some(name) = changes.name {
            require("name", &name)?;
            config.name = name.trim().to_string();
        }
        if let Some(selector) = changes.selector {
            config.selector = selector.filter(|s| !s.trim().is_empty());
        }
        if let Some(active) = changes.is_active {
            config.is_active = active;
        }
        config.updated_at = Utc::now();

        Ok(self.configs.update(&config).await?)
    }

    /// 停用配置，其调度在下一个 tick 起不再被选中
    pub async fn deactivate_config(&self, id: Uuid) -> Result<ScraperConfig, AdminError> {
        self.update_config(
            id,
            ScraperConfigChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// 删除配置；仍有调度引用时拒绝删除
    pub async fn delete_config(&self, id: Uuid) -> Result<(), AdminError> {
        self.get_config(id).await?;

        let schedules = self.schedules.find_by_config_id(id).await?;
        if !schedules.is_empty() {
            return Err(AdminError::Conflict(format!(
                "scraper config {} is still referenced by {} schedule(s)",
                id,
                schedules.len()
            )));
        }

        self.configs.delete(id).await?;
        info!("Deleted scraper config {}", id);
        Ok(())
    }

    pub async fn create_schedule(
        &self,
        config_id: Uuid,
        input: NewScraperSchedule,
    ) -> Result<ScraperSchedule, AdminError> {
        self.get_config(config_id).await?;

        let mut schedule = ScraperSchedule::new(config_id, input.frequency, input.interval);
        if input.frequency == Frequency::Custom {
            schedule.custom_cron = input.custom_cron.map(|c| c.trim().to_string());
        }
        recurrence::validate(&schedule)?;

        let created = self.schedules.create(&schedule).await?;
        info!(
            "Created {} schedule {} for config {}",
            created.frequency, created.id, config_id
        );
        Ok(created)
    }

    pub async fn get_schedule(&self, id: Uuid) -> Result<ScraperSchedule, AdminError> {
        self.schedules
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("schedule {}", id)))
    }

    pub async fn list_schedules(&self, config_id: Uuid) -> Result<Vec<ScraperSchedule>, AdminError> {
        self.get_config(config_id).await?;
        Ok(self.schedules.find_by_config_id(config_id).await?)
    }

    /// 修改调度
    ///
    /// 频率、倍数或 cron 变化时重新校验并重置 `next_run`：从未运行过的调度
    /// 在下一个 tick 立即执行，否则按新规则从 `last_run` 重新推算。
    pub async fn update_schedule(
        &self,
        id: Uuid,
        changes: ScraperScheduleChanges,
    ) -> Result<ScraperSchedule, AdminError> {
        let mut schedule = self.get_schedule(id).await?;
        let mut recurrence_changed = false;

        if let Some(frequency) = changes.frequency {
            recurrence_changed |= frequency != schedule.frequency;
            schedule.frequency = frequency;
        }
        if let Some(interval) = changes.interval {
            let interval = interval.max(1);
            recurrence_changed |= interval != schedule.interval;
            schedule.interval = interval;
        }
        if let Some(cron) = changes.custom_cron {
            let cron = cron.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
            recurrence_changed |= cron != schedule.custom_cron;
            schedule.custom_cron = cron;
        }
        if schedule.frequency != Frequency::Custom {
            schedule.custom_cron = None;
        }
        if let Some(active) = changes.is_active {
            schedule.is_active = active;
        }

        recurrence::validate(&schedule)?;
        // next_run 归调度器所有，只在规则变化时重置
        let next_run = if recurrence_changed {
            Some(match schedule.last_run {
                Some(last_run) => Some(recurrence::next_run(&schedule, last_run, Utc::now())?),
                None => None,
            })
        } else {
            None
        };
        schedule.updated_at = Utc::now();

        Ok(self.schedules.update(&schedule, next_run).await?)
    }

    /// 按执行时间倒序列出配置的运行结果
    pub async fn list_results(
        &self,
        config_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: Option<u64>,
    ) -> Result<Vec<ScraperResult>, AdminError> {
        self.get_config(config_id).await?;
        Ok(self.results.list_results(config_id, since, limit).await?)
    }

    pub async fn latest_result(&self, config_id: Uuid) -> Result<ScraperResult, AdminError> {
        self.get_config(config_id).await?;
        self.results
            .get_latest(config_id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("results for scraper config {}", config_id)))
    }

    /// 列出 `[from, to)` 区间内的运行结果
    pub async fn results_between(
        &self,
        config_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ScraperResult>, AdminError> {
        if from >= to {
            return Err(AdminError::Validation(
                "'from' must be earlier than 'to'".to_string(),
            ));
        }
        self.get_config(config_id).await?;
        Ok(self.results.list_between(config_id, from, to).await?)
    }
}

fn require(field: &str, value: &str) -> Result<(), AdminError> {
    if value.trim().is_empty() {
        return Err(AdminError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn validate_url(raw: &str) -> Result<(), AdminError> {
    let url = Url::parse(raw)
        .map_err(|e| AdminError::Validation(format!("invalid url '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AdminError::Validation(format!(
            "unsupported url scheme '{}'",
            other
        ))),
    }
}
