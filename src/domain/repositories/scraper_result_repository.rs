// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_result::ScraperResult;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 运行结果仓库特质
///
/// 只追加；所有查询均按 `execution_time` 倒序返回
#[async_trait]
pub trait ScraperResultRepository: Send + Sync {
    /// 保存运行结果
    async fn save(&self, result: &ScraperResult) -> Result<(), RepositoryError>;
    /// 列出某配置的结果，可选起始时间与条数上限
    async fn list_results(
        &self,
        config_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: Option<u64>,
    ) -> Result<Vec<ScraperResult>, RepositoryError>;
    /// 获取某配置最近一次结果
    async fn get_latest(&self, config_id: Uuid) -> Result<Option<ScraperResult>, RepositoryError>;
    /// 列出时间区间 `[from, to)` 内的结果
    async fn list_between(
        &self,
        config_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ScraperResult>, RepositoryError>;
}
