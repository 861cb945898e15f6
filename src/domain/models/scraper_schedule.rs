// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 调度频率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Hourly,
    #[default]
    Daily,
    Weekly,
    Monthly,
    /// 使用 `custom_cron` 表达式
    Custom,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Frequency::Hourly => write!(f, "hourly"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for Frequency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Frequency::Hourly),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "custom" => Ok(Frequency::Custom),
            _ => Err(()),
        }
    }
}

/// 调度运行状态
///
/// Idle → Due → Running → Idle，不持久化，由调度器按需推导
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// 空闲，尚未到期或未启用
    Idle,
    /// 已到期，等待执行
    Due,
    /// 该配置正在执行
    Running,
}

/// 抓取调度
///
/// 一个配置的重复执行策略。`last_run`/`next_run` 只由调度器写入。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperSchedule {
    pub id: Uuid,
    pub scraper_config_id: Uuid,
    pub frequency: Frequency,
    /// 频率倍数，至少为 1
    pub interval: u32,
    /// 仅当 `frequency == Custom` 时使用
    pub custom_cron: Option<String>,
    pub last_run: Option<DateTime<Utc>>,
    /// 为空表示从未运行，首次 tick 立即执行
    pub next_run: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScraperSchedule {
    /// 创建新的调度
    pub fn new(scraper_config_id: Uuid, frequency: Frequency, interval: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scraper_config_id,
            frequency,
            interval: interval.max(1),
            custom_cron: None,
            last_run: None,
            next_run: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// 创建基于 cron 表达式的调度
    pub fn custom(scraper_config_id: Uuid, expression: impl Into<String>) -> Self {
        let mut schedule = Self::new(scraper_config_id, Frequency::Custom, 1);
        schedule.custom_cron = Some(expression.into());
        schedule
    }

    /// 判断调度在给定时间是否到期
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_run.is_none_or(|next| next <= now)
    }

    /// 推导当前状态
    pub fn state(&self, now: DateTime<Utc>, in_flight: bool) -> ScheduleState {
        if in_flight {
            ScheduleState::Running
        } else if self.is_due(now) {
            ScheduleState::Due
        } else {
            ScheduleState::Idle
        }
    }
}
