// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_config::ScraperConfig;
use crate::domain::repositories::scraper_config_repository::ScraperConfigRepository;
use crate::infrastructure::database::entities::scraper_config;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

/// 抓取配置仓库实现
#[derive(Clone)]
pub struct ScraperConfigRepoImpl {
    db: Arc<DatabaseConnection>,
}

impl ScraperConfigRepoImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ScraperConfigRepository for ScraperConfigRepoImpl {
    async fn create(&self, config: &ScraperConfig) -> Result<ScraperConfig, RepositoryError> {
        let model = scraper_config::ActiveModel {
            id: Set(config.id),
            name: Set(config.name.clone()),
            url: Set(config.url.clone()),
            selector: Set(config.selector.clone()),
            subject_identifier: Set(config.subject_identifier.clone()),
            credential_key: Set(config.credential_key.clone()),
            is_active: Set(config.is_active),
            created_by: Set(config.created_by.clone()),
            created_at: Set(config.created_at.into()),
            updated_at: Set(config.updated_at.into()),
        };

        let saved = model.insert(self.db.as_ref()).await?;
        Ok(saved.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperConfig>, RepositoryError> {
        let model = scraper_config::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn update(&self, config: &ScraperConfig) -> Result<ScraperConfig, RepositoryError> {
        let existing = scraper_config::Entity::find_by_id(config.id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        // 只有名称、选择器与启用状态可修改，抓取目标与凭据键创建后不可变
        let mut model: scraper_config::ActiveModel = existing.into();
        model.name = Set(config.name.clone());
        model.selector = Set(config.selector.clone());
        model.is_active = Set(config.is_active);
        model.updated_at = Set(Utc::now().into());

        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn list(&self, active_only: bool) -> Result<Vec<ScraperConfig>, RepositoryError> {
        let mut query = scraper_config::Entity::find();
        if active_only {
            query = query.filter(scraper_config::Column::IsActive.eq(true));
        }

        let models = query
            .order_by_asc(scraper_config::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = scraper_config::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl From<scraper_config::Model> for ScraperConfig {
    fn from(model: scraper_config::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            url: model.url,
            selector: model.selector,
            subject_identifier: model.subject_identifier,
            credential_key: model.credential_key,
            is_active: model.is_active,
            created_by: model.created_by,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}
