// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_config::ScraperConfig;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 抓取配置仓库特质
///
/// 定义抓取配置数据访问接口
#[async_trait]
pub trait ScraperConfigRepository: Send + Sync {
    /// 创建配置
    async fn create(&self, config: &ScraperConfig) -> Result<ScraperConfig, RepositoryError>;
    /// 根据ID查找配置
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperConfig>, RepositoryError>;
    /// 更新配置
    async fn update(&self, config: &ScraperConfig) -> Result<ScraperConfig, RepositoryError>;
    /// 列出配置
    async fn list(&self, active_only: bool) -> Result<Vec<ScraperConfig>, RepositoryError>;
    /// 删除配置
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
