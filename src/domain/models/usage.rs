// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Datelike, Month, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 1 GiB，换算 GB 时使用的二进制单位
pub const BYTES_PER_GB: u64 = 1 << 30;

/// 年月键
///
/// 以 `YYYY-MM` 形式序列化，用作月度记录与日明细之间的关联键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

/// 年月解析错误
#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid year-month: {0}")]
pub struct YearMonthParseError(pub String);

impl YearMonth {
    /// 创建年月，月份必须在 1..=12 之间
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// 该月的天数（考虑闰年）
    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    /// 月份英文全称，例如 `January`
    pub fn month_name(&self) -> &'static str {
        Month::try_from(self.month as u8)
            .map(|m| m.name())
            .unwrap_or("Unknown")
    }

    /// 该月第一天
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// 判断日期是否落在该月内
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = YearMonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (year, month) = trimmed
            .split_once('-')
            .ok_or_else(|| YearMonthParseError(s.to_string()))?;
        let year: i32 = year.parse().map_err(|_| YearMonthParseError(s.to_string()))?;
        let month: u32 = month.parse().map_err(|_| YearMonthParseError(s.to_string()))?;
        YearMonth::new(year, month).ok_or_else(|| YearMonthParseError(s.to_string()))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 月度用量记录
///
/// 抽取阶段的临时产物，不单独持久化，而是嵌入到 `resultData` 中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub year_month: YearMonth,
    pub source: String,
    pub year: i32,
    pub month_name: String,
    pub subject_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msisdn: Option<String>,
    pub connected_time: String,
    pub total_bytes: u64,
    #[serde(rename = "totalGB")]
    pub total_gb: String,
}

/// 日用量记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsageRecord {
    pub date: NaiveDate,
    pub total_bytes: u64,
    #[serde(rename = "totalGB")]
    pub total_gb: String,
    pub connected_time: String,
}

impl DailyUsageRecord {
    /// 门户未列出的日期以零用量补齐
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_bytes: 0,
            total_gb: to_gb(0),
            connected_time: String::new(),
        }
    }
}

/// 一次抽取的完整结果
///
/// `gaps` 列出日明细缺失的月份，这些月份在 `daily` 中对应空列表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub records: Vec<UsageRecord>,
    pub daily: BTreeMap<YearMonth, Vec<DailyUsageRecord>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<YearMonth>,
}

impl UsageReport {
    /// 是否存在部分缺失
    pub fn is_partial(&self) -> bool {
        !self.gaps.is_empty()
    }
}

/// 字节数换算为 GB 字符串
///
/// 以 2^30 为除数，保留两位小数，采用银行家舍入（round-half-to-even）。
/// 全程整数运算，结果与浮点精度无关。
pub fn to_gb(bytes: u64) -> String {
    let scaled = bytes as u128 * 100;
    let divisor = BYTES_PER_GB as u128;
    let mut hundredths = scaled / divisor;
    let remainder = scaled % divisor;
    let half = divisor / 2;

    if remainder > half || (remainder == half && hundredths % 2 == 1) {
        hundredths += 1;
    }

    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

/// 给定年月的天数
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(start), Some(end)) => (end - start).num_days() as u32,
        _ => 0,
    }
}
