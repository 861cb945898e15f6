// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_schedule::Frequency;
use crate::domain::services::scraper_admin_service::{
    NewScraperConfig, NewScraperSchedule, ScraperConfigChanges, ScraperScheduleChanges,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 创建抓取配置请求
#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateScraperRequestDto {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(url)]
    pub url: String,
    #[validate(length(max = 512))]
    pub selector: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub subject_identifier: String,
    #[validate(length(min = 1, max = 128))]
    pub credential_key: String,
    #[validate(length(min = 1, max = 255))]
    pub created_by: String,
}

impl From<CreateScraperRequestDto> for NewScraperConfig {
    fn from(dto: CreateScraperRequestDto) -> Self {
        Self {
            name: dto.name,
            url: dto.url,
            selector: dto.selector,
            subject_identifier: dto.subject_identifier,
            credential_key: dto.credential_key,
            created_by: dto.created_by,
        }
    }
}

/// 修改抓取配置请求
///
/// 省略的字段保持不变；`selector` 为空字符串时清除选择器。
/// 只接受名称、选择器与启用状态，其余字段（如 `url`）会被拒绝。
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateScraperRequestDto {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 512))]
    pub selector: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateScraperRequestDto> for ScraperConfigChanges {
    fn from(dto: UpdateScraperRequestDto) -> Self {
        Self {
            name: dto.name,
            selector: dto.selector.map(|s| Some(s).filter(|s| !s.trim().is_empty())),
            is_active: dto.is_active,
        }
    }
}

/// 创建调度请求
#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequestDto {
    pub frequency: Frequency,
    #[validate(range(min = 1, max = 1000))]
    pub interval: Option<u32>,
    #[validate(length(min = 1, max = 255))]
    pub custom_cron: Option<String>,
}

impl From<CreateScheduleRequestDto> for NewScraperSchedule {
    fn from(dto: CreateScheduleRequestDto) -> Self {
        Self {
            frequency: dto.frequency,
            interval: dto.interval.unwrap_or(1),
            custom_cron: dto.custom_cron,
        }
    }
}

/// 修改调度请求
///
/// 省略的字段保持不变；`customCron` 为空字符串时清除表达式
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequestDto {
    pub frequency: Option<Frequency>,
    #[validate(range(min = 1, max = 1000))]
    pub interval: Option<u32>,
    #[validate(length(max = 255))]
    pub custom_cron: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateScheduleRequestDto> for ScraperScheduleChanges {
    fn from(dto: UpdateScheduleRequestDto) -> Self {
        Self {
            frequency: dto.frequency,
            interval: dto.interval,
            custom_cron: dto.custom_cron.map(|c| Some(c).filter(|c| !c.trim().is_empty())),
            is_active: dto.is_active,
        }
    }
}

/// 列出配置的查询参数
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListScrapersQueryDto {
    pub active_only: Option<bool>,
}

/// 查询运行结果的参数
///
/// 同时给出 `from` 与 `to` 时按区间查询，否则按 `since`/`limit` 查询
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct ResultsQueryDto {
    pub since: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
