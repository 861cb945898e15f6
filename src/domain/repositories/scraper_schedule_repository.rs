// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_schedule::ScraperSchedule;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 抓取调度仓库特质
///
/// 定义调度数据访问接口。`record_run` 只供调度器调用。
#[async_trait]
pub trait ScraperScheduleRepository: Send + Sync {
    /// 创建调度
    async fn create(&self, schedule: &ScraperSchedule) -> Result<ScraperSchedule, RepositoryError>;
    /// 根据ID查找调度
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperSchedule>, RepositoryError>;
    /// 更新调度的可编辑字段
    ///
    /// `last_run` 从不写入；`next_run` 为 `None` 时保留库中的值，
    /// 仅在重复规则变化时传入 `Some` 重置。
    async fn update(
        &self,
        schedule: &ScraperSchedule,
        next_run: Option<Option<DateTime<Utc>>>,
    ) -> Result<ScraperSchedule, RepositoryError>;
    /// 查找已到期的启用调度（`next_run` 为空或不晚于 `now`）
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<ScraperSchedule>, RepositoryError>;
    /// 根据配置ID查找调度
    async fn find_by_config_id(
        &self,
        config_id: Uuid,
    ) -> Result<Vec<ScraperSchedule>, RepositoryError>;
    /// 写入一次运行后的 `last_run`/`next_run`
    async fn record_run(
        &self,
        id: Uuid,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;
    /// 启用或停用调度
    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), RepositoryError>;
}
