// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::scraper_request::{CreateScheduleRequestDto, UpdateScheduleRequestDto};
use crate::domain::models::scraper_schedule::ScraperSchedule;
use crate::domain::services::scraper_admin_service::ScraperAdminService;
use crate::presentation::errors::AppError;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 为配置创建调度，cron 表达式在此校验
pub async fn create_schedule(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Path(config_id): Path<Uuid>,
    Json(payload): Json<CreateScheduleRequestDto>,
) -> Result<(StatusCode, Json<ScraperSchedule>), AppError> {
    payload.validate()?;
    let schedule = service.create_schedule(config_id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

pub async fn list_schedules(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Path(config_id): Path<Uuid>,
) -> Result<Json<Vec<ScraperSchedule>>, AppError> {
    Ok(Json(service.list_schedules(config_id).await?))
}

/// 修改调度；重复规则变化时重置 `nextRun`
pub async fn update_schedule(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScheduleRequestDto>,
) -> Result<Json<ScraperSchedule>, AppError> {
    payload.validate()?;
    Ok(Json(service.update_schedule(id, payload.into()).await?))
}
