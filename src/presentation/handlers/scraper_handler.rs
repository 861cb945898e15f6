// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::scraper_request::{
    CreateScraperRequestDto, ListScrapersQueryDto, ResultsQueryDto, UpdateScraperRequestDto,
};
use crate::domain::models::scraper_config::ScraperConfig;
use crate::domain::models::scraper_result::ScraperResult;
use crate::domain::services::scraper_admin_service::ScraperAdminService;
use crate::presentation::errors::AppError;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 创建抓取配置
pub async fn create_scraper(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Json(payload): Json<CreateScraperRequestDto>,
) -> Result<(StatusCode, Json<ScraperConfig>), AppError> {
    payload.validate()?;
    let config = service.create_config(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(config)))
}

/// 列出抓取配置，`activeOnly=true` 时只返回启用的配置
pub async fn list_scrapers(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Query(query): Query<ListScrapersQueryDto>,
) -> Result<Json<Vec<ScraperConfig>>, AppError> {
    let configs = service
        .list_configs(query.active_only.unwrap_or(false))
        .await?;
    Ok(Json(configs))
}

pub async fn get_scraper(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScraperConfig>, AppError> {
    Ok(Json(service.get_config(id).await?))
}

pub async fn update_scraper(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScraperRequestDto>,
) -> Result<Json<ScraperConfig>, AppError> {
    payload.validate()?;
    Ok(Json(service.update_config(id, payload.into()).await?))
}

/// 删除抓取配置；仍有调度时返回 409
pub async fn delete_scraper(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.delete_config(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 查询运行结果（按执行时间倒序）
pub async fn list_results(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ResultsQueryDto>,
) -> Result<Json<Vec<ScraperResult>>, AppError> {
    query.validate()?;

    let results = match (query.from, query.to) {
        (Some(from), Some(to)) => service.results_between(id, from, to).await?,
        _ => service.list_results(id, query.since, query.limit).await?,
    };
    Ok(Json(results))
}

pub async fn latest_result(
    Extension(service): Extension<Arc<ScraperAdminService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScraperResult>, AppError> {
    Ok(Json(service.latest_result(id).await?))
}
