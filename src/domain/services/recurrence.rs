// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_schedule::{Frequency, ScraperSchedule};
use chrono::{DateTime, Duration, Months, Utc};
use std::str::FromStr;
use thiserror::Error;

/// 调度计算错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// 自定义频率缺少 cron 表达式
    #[error("custom frequency requires a cron expression")]
    MissingCron,
    /// cron 表达式无法解析
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },
    /// cron 表达式之后不再有匹配时刻
    #[error("cron expression '{0}' has no upcoming occurrence")]
    NoUpcomingOccurrence(String),
    /// 时间计算溢出
    #[error("next run time is out of range")]
    OutOfRange,
}

/// 解析 cron 表达式
///
/// 接受标准 5 段格式（分 时 日 月 周，周日为 0 或 7），以及带秒的 6/7 段格式
/// （Quartz 风格，周日为 1）。
pub fn parse_cron(expression: &str) -> Result<cron::Schedule, ScheduleError> {
    let invalid = |reason: String| ScheduleError::InvalidCron {
        expression: expression.to_string(),
        reason,
    };

    let fields: Vec<&str> = expression.split_whitespace().collect();
    let normalized = match fields.len() {
        5 => {
            let weekdays = translate_weekdays(fields[4]).map_err(invalid)?;
            format!("0 {} {} {} {} {}", fields[0], fields[1], fields[2], fields[3], weekdays)
        }
        6 | 7 => fields.join(" "),
        n => return Err(invalid(format!("expected 5 to 7 fields, found {}", n))),
    };

    cron::Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))
}

const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// 将标准 cron 的数字星期（0-7，0 与 7 均为周日）展开为星期名列表
///
/// 名称写法（`MON-FRI`）原样保留。
fn translate_weekdays(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut days: Vec<&str> = Vec::new();
    let mut named: Vec<&str> = Vec::new();
    for element in field.split(',') {
        if element.chars().any(|c| c.is_ascii_alphabetic()) {
            named.push(element);
            continue;
        }

        let (base, step) = match element.split_once('/') {
            Some((base, step)) => {
                let step: usize = step
                    .parse()
                    .map_err(|_| format!("invalid day-of-week step '{}'", element))?;
                (base, Some(step))
            }
            None => (element, None),
        };
        if step == Some(0) {
            return Err(format!("invalid day-of-week step '{}'", element));
        }

        let day = |raw: &str| -> Result<usize, String> {
            raw.parse::<usize>()
                .ok()
                .filter(|d| *d <= 7)
                .ok_or_else(|| format!("invalid day of week '{}'", raw))
        };
        let (start, end) = match base.split_once('-') {
            Some((start, end)) => (day(start)?, day(end)?),
            None if base == "*" => (0, 6),
            None if step.is_some() => (day(base)?, 6),
            None => {
                let d = day(base)?;
                (d, d)
            }
        };
        if start > end {
            return Err(format!("invalid day-of-week range '{}'", element));
        }

        for d in (start..=end).step_by(step.unwrap_or(1)) {
            let name = WEEKDAY_NAMES[d % 7];
            if !days.contains(&name) {
                days.push(name);
            }
        }
    }

    days.extend(named);
    Ok(days.join(","))
}

/// 校验调度的重复规则
pub fn validate(schedule: &ScraperSchedule) -> Result<(), ScheduleError> {
    if schedule.frequency == Frequency::Custom {
        let expression = schedule
            .custom_cron
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ScheduleError::MissingCron)?;
        parse_cron(expression)?;
    }
    Ok(())
}

/// 根据上次运行时间计算下一次运行时间（不考虑当前时间）
///
/// hourly/daily/weekly/monthly 在 `last_run` 上加 `interval` 个对应日历单位，
/// custom 取 cron 表达式在 `last_run` 之后的第一个匹配时刻。
pub fn next_after(
    schedule: &ScraperSchedule,
    last_run: DateTime<Utc>,
) -> Result<DateTime<Utc>, ScheduleError> {
    let interval = schedule.interval.max(1);

    let next = match schedule.frequency {
        Frequency::Hourly => last_run.checked_add_signed(Duration::hours(interval as i64)),
        Frequency::Daily => last_run.checked_add_signed(Duration::days(interval as i64)),
        Frequency::Weekly => last_run.checked_add_signed(Duration::weeks(interval as i64)),
        Frequency::Monthly => last_run.checked_add_months(Months::new(interval)),
        Frequency::Custom => {
            let expression = schedule
                .custom_cron
                .as_deref()
                .ok_or(ScheduleError::MissingCron)?;
            let cron = parse_cron(expression)?;
            return cron
                .after(&last_run)
                .next()
                .ok_or_else(|| ScheduleError::NoUpcomingOccurrence(expression.to_string()));
        }
    };

    next.ok_or(ScheduleError::OutOfRange)
}

/// 计算运行完成后的 `next_run`
///
/// 结果总是晚于 `now` 的最早时刻；停机期间错过的运行被跳过，不做补跑。
pub fn next_run(
    schedule: &ScraperSchedule,
    last_run: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ScheduleError> {
    let next = next_after(schedule, last_run)?;
    if next > now {
        return Ok(next);
    }

    let step = match schedule.frequency {
        Frequency::Hourly => Some(Duration::hours(schedule.interval.max(1) as i64)),
        Frequency::Daily => Some(Duration::days(schedule.interval.max(1) as i64)),
        Frequency::Weekly => Some(Duration::weeks(schedule.interval.max(1) as i64)),
        Frequency::Monthly | Frequency::Custom => None,
    };

    match step {
        Some(step) => {
            let behind = (now - next).num_seconds() / step.num_seconds() + 1;
            let skip = i32::try_from(behind).map_err(|_| ScheduleError::OutOfRange)?;
            next.checked_add_signed(step * skip)
                .ok_or(ScheduleError::OutOfRange)
        }
        None if schedule.frequency == Frequency::Custom => next_after(schedule, now),
        None => {
            // 始终从 last_run 起算，避免月末截断逐月累积
            let interval = schedule.interval.max(1);
            let mut periods: u32 = 1;
            let mut candidate = next;
            while candidate <= now {
                periods = periods.checked_add(1).ok_or(ScheduleError::OutOfRange)?;
                let months = interval
                    .checked_mul(periods)
                    .ok_or(ScheduleError::OutOfRange)?;
                candidate = last_run
                    .checked_add_months(Months::new(months))
                    .ok_or(ScheduleError::OutOfRange)?;
            }
            Ok(candidate)
        }
    }
}
