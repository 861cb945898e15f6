// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_result::{ErrorKind, ScraperResult};
use crate::domain::repositories::scraper_result_repository::ScraperResultRepository;
use crate::infrastructure::database::entities::scraper_result;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::*;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// 运行结果仓库实现
///
/// 只追加：没有更新或删除操作
#[derive(Clone)]
pub struct ScraperResultRepoImpl {
    db: Arc<DatabaseConnection>,
}

impl ScraperResultRepoImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn into_domain(model: scraper_result::Model) -> Result<ScraperResult, RepositoryError> {
        let error_kind = model
            .error_kind
            .as_deref()
            .map(|kind| {
                ErrorKind::from_str(kind).map_err(|_| {
                    RepositoryError::InvalidData(format!("unknown error kind '{}'", kind))
                })
            })
            .transpose()?;

        Ok(ScraperResult {
            id: model.id,
            scraper_config_id: model.scraper_config_id,
            execution_time: model.execution_time.into(),
            duration_ms: model.duration_ms.max(0) as u64,
            success: model.success,
            result_data: model.result_data,
            error_message: model.error_message,
            error_kind,
            attempts: model.attempts.max(0) as u32,
        })
    }
}

#[async_trait]
impl ScraperResultRepository for ScraperResultRepoImpl {
    async fn save(&self, result: &ScraperResult) -> Result<(), RepositoryError> {
        let model = scraper_result::ActiveModel {
            id: Set(result.id),
            scraper_config_id: Set(result.scraper_config_id),
            execution_time: Set(result.execution_time.into()),
            duration_ms: Set(i64::try_from(result.duration_ms).unwrap_or(i64::MAX)),
            success: Set(result.success),
            result_data: Set(result.result_data.clone()),
            error_message: Set(result.error_message.clone()),
            error_kind: Set(result.error_kind.map(|kind| kind.to_string())),
            attempts: Set(i32::try_from(result.attempts).unwrap_or(i32::MAX)),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(())
    }

    async fn list_results(
        &self,
        config_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: Option<u64>,
    ) -> Result<Vec<ScraperResult>, RepositoryError> {
        let mut query = scraper_result::Entity::find()
            .filter(scraper_result::Column::ScraperConfigId.eq(config_id));

        if let Some(since) = since {
            let since: DateTime<FixedOffset> = since.into();
            query = query.filter(scraper_result::Column::ExecutionTime.gte(since));
        }

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let models = query
            .order_by_desc(scraper_result::Column::ExecutionTime)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(Self::into_domain).collect()
    }

    async fn get_latest(&self, config_id: Uuid) -> Result<Option<ScraperResult>, RepositoryError> {
        scraper_result::Entity::find()
            .filter(scraper_result::Column::ScraperConfigId.eq(config_id))
            .order_by_desc(scraper_result::Column::ExecutionTime)
            .one(self.db.as_ref())
            .await?
            .map(Self::into_domain)
            .transpose()
    }

    async fn list_between(
        &self,
        config_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ScraperResult>, RepositoryError> {
        let from: DateTime<FixedOffset> = from.into();
        let to: DateTime<FixedOffset> = to.into();

        let models = scraper_result::Entity::find()
            .filter(scraper_result::Column::ScraperConfigId.eq(config_id))
            .filter(scraper_result::Column::ExecutionTime.gte(from))
            .filter(scraper_result::Column::ExecutionTime.lt(to))
            .order_by_desc(scraper_result::Column::ExecutionTime)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(Self::into_domain).collect()
    }
}
