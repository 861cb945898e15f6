// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_schedule::{Frequency, ScraperSchedule};
use crate::domain::repositories::scraper_schedule_repository::ScraperScheduleRepository;
use crate::infrastructure::database::entities::scraper_schedule;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// 抓取调度仓库实现
#[derive(Clone)]
pub struct ScraperScheduleRepoImpl {
    db: Arc<DatabaseConnection>,
}

impl ScraperScheduleRepoImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn into_domain(model: scraper_schedule::Model) -> Result<ScraperSchedule, RepositoryError> {
        let frequency = Frequency::from_str(&model.frequency).map_err(|_| {
            RepositoryError::InvalidData(format!("unknown frequency '{}'", model.frequency))
        })?;

        Ok(ScraperSchedule {
            id: model.id,
            scraper_config_id: model.scraper_config_id,
            frequency,
            interval: model.interval.max(1) as u32,
            custom_cron: model.custom_cron,
            last_run: model.last_run.map(Into::into),
            next_run: model.next_run.map(Into::into),
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    fn interval(schedule: &ScraperSchedule) -> Result<i32, RepositoryError> {
        i32::try_from(schedule.interval)
            .map_err(|_| RepositoryError::InvalidData("interval out of range".to_string()))
    }
}

#[async_trait]
impl ScraperScheduleRepository for ScraperScheduleRepoImpl {
    async fn create(&self, schedule: &ScraperSchedule) -> Result<ScraperSchedule, RepositoryError> {
        let model = scraper_schedule::ActiveModel {
            id: Set(schedule.id),
            scraper_config_id: Set(schedule.scraper_config_id),
            frequency: Set(schedule.frequency.to_string()),
            interval: Set(Self::interval(schedule)?),
            custom_cron: Set(schedule.custom_cron.clone()),
            last_run: Set(schedule.last_run.map(Into::into)),
            next_run: Set(schedule.next_run.map(Into::into)),
            is_active: Set(schedule.is_active),
            created_at: Set(schedule.created_at.into()),
            updated_at: Set(schedule.updated_at.into()),
        };

        let saved = model.insert(self.db.as_ref()).await?;
        Self::into_domain(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperSchedule>, RepositoryError> {
        scraper_schedule::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(Self::into_domain)
            .transpose()
    }

    async fn update(
        &self,
        schedule: &ScraperSchedule,
        next_run: Option<Option<DateTime<Utc>>>,
    ) -> Result<ScraperSchedule, RepositoryError> {
        let existing = scraper_schedule::Entity::find_by_id(schedule.id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        // last_run 只由调度器通过 record_run 写入，未重置时 next_run 同样保持不变
        let mut model: scraper_schedule::ActiveModel = existing.into();
        model.frequency = Set(schedule.frequency.to_string());
        model.interval = Set(Self::interval(schedule)?);
        model.custom_cron = Set(schedule.custom_cron.clone());
        if let Some(next_run) = next_run {
            model.next_run = Set(next_run.map(Into::into));
        }
        model.is_active = Set(schedule.is_active);
        model.updated_at = Set(Utc::now().into());

        let updated = model.update(self.db.as_ref()).await?;
        Self::into_domain(updated)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<ScraperSchedule>, RepositoryError> {
        let now: DateTime<FixedOffset> = now.into();
        let models = scraper_schedule::Entity::find()
            .filter(scraper_schedule::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(scraper_schedule::Column::NextRun.is_null())
                    .add(scraper_schedule::Column::NextRun.lte(now)),
            )
            .order_by_asc(scraper_schedule::Column::NextRun)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(Self::into_domain).collect()
    }

    async fn find_by_config_id(
        &self,
        config_id: Uuid,
    ) -> Result<Vec<ScraperSchedule>, RepositoryError> {
        let models = scraper_schedule::Entity::find()
            .filter(scraper_schedule::Column::ScraperConfigId.eq(config_id))
            .order_by_asc(scraper_schedule::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(Self::into_domain).collect()
    }

    async fn record_run(
        &self,
        id: Uuid,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let last_run: DateTime<FixedOffset> = last_run.into();
        let next_run: Option<DateTime<FixedOffset>> = next_run.map(Into::into);
        let now: DateTime<FixedOffset> = Utc::now().into();

        let result = scraper_schedule::Entity::update_many()
            .col_expr(scraper_schedule::Column::LastRun, Expr::value(last_run))
            .col_expr(scraper_schedule::Column::NextRun, Expr::value(next_run))
            .col_expr(scraper_schedule::Column::UpdatedAt, Expr::value(now))
            .filter(scraper_schedule::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = scraper_schedule::Entity::update_many()
            .col_expr(scraper_schedule::Column::IsActive, Expr::value(active))
            .col_expr(scraper_schedule::Column::UpdatedAt, Expr::value(now))
            .filter(scraper_schedule::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
