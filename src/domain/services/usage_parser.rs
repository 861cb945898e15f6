// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::usage::{to_gb, DailyUsageRecord, UsageRecord, YearMonth};
use crate::engines::traits::ExtractionError;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

static PERIOD_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/.](\d{1,2})$|^(\d{1,2})[-/.](\d{4})$").unwrap());
static PERIOD_NAMED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z]{3,9})[\s,\-/]+(\d{4})$").unwrap());
static BYTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([0-9][0-9,\s_]*(?:\.[0-9]+)?)\s*(b|bytes?|kb|kib|mb|mib|gb|gib|tb|tib)?$")
        .unwrap()
});

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y", "%d %B %Y",
];

/// 月度表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRow {
    pub record: UsageRecord,
    /// 该月日明细页面的链接（行内第一个 `a[href]`）
    pub daily_link: Option<String>,
}

/// 表格列角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Period,
    Date,
    Msisdn,
    Connected,
    Source,
    Bytes,
}

impl Column {
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Column::Period => &["month", "period", "billing cycle"],
            Column::Date => &["date", "day"],
            Column::Msisdn => &["msisdn", "mobile", "number", "sim"],
            Column::Connected => &["connected", "duration", "online", "session time"],
            Column::Source => &["source", "service", "type"],
            Column::Bytes => &["bytes", "usage", "volume", "data", "total"],
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector)
        .map_err(|e| ExtractionError::Extraction(format!("invalid selector '{}': {}", selector, e)))
}

fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 判断页面中是否存在匹配选择器的元素
pub fn has_element(html: &str, selector: &str) -> Result<bool, ExtractionError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

/// 读取登录失败提示
///
/// 匹配到错误指示元素且其文本非空时返回该文本
pub fn find_login_error(html: &str, selector: &str) -> Result<Option<String>, ExtractionError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let message = document
        .select(&selector)
        .map(cell_text)
        .find(|text| !text.is_empty());
    Ok(message)
}

/// 在搜索结果中查找账户链接
///
/// 链接文本需与账户标识完全相同（忽略大小写），或含有与之相同的独立词，
/// 例如 `user@isp (active)`。`john` 不匹配 `john.smith@isp`，href 不参与匹配。
pub fn find_subject_link(
    html: &str,
    selector: &str,
    subject: &str,
) -> Result<Option<String>, ExtractionError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let wanted = subject.trim().to_lowercase();
    if wanted.is_empty() {
        return Ok(None);
    }

    let mut token_match = None;
    for link in document.select(&selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let text = cell_text(link).to_lowercase();
        if text == wanted {
            return Ok(Some(href.to_string()));
        }
        if token_match.is_none() && text.split(is_token_separator).any(|token| token == wanted) {
            token_match = Some(href.to_string());
        }
    }

    Ok(token_match)
}

fn is_token_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ',' | ';' | '|')
}

/// 按表头关键词定位列
fn map_columns(headers: &[String], roles: &[Column]) -> BTreeMap<usize, Column> {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let mut assigned = BTreeMap::new();

    for role in roles {
        let position = lowered.iter().enumerate().position(|(idx, header)| {
            !assigned.contains_key(&idx) && role.keywords().iter().any(|k| header.contains(k))
        });
        if let Some(idx) = position {
            assigned.insert(idx, *role);
        }
    }

    assigned
}

/// 表头与数据行
struct Table {
    headers: Vec<String>,
    rows: Vec<(Vec<String>, Option<String>)>,
}

/// 选出第一张能识别出必需列的表格
fn read_table(
    html: &str,
    table_selector: &str,
    roles: &[Column],
    required: &[Column],
) -> Result<(Table, BTreeMap<usize, Column>), ExtractionError> {
    let table_selector = parse_selector(table_selector)?;
    let row_selector = parse_selector("tr")?;
    let header_selector = parse_selector("th")?;
    let cell_selector = parse_selector("td")?;
    let link_selector = parse_selector("a[href]")?;
    let document = Html::parse_document(html);

    let mut tables_seen = 0;
    for table in document.select(&table_selector) {
        tables_seen += 1;

        let mut headers = Vec::new();
        let mut rows = Vec::new();
        for row in table.select(&row_selector) {
            let th: Vec<String> = row.select(&header_selector).map(cell_text).collect();
            let td: Vec<String> = row.select(&cell_selector).map(cell_text).collect();

            if headers.is_empty() && !th.is_empty() && td.is_empty() {
                headers = th;
                continue;
            }
            if td.is_empty() {
                continue;
            }
            let link = row
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string);
            // 一些门户把表头写成第一行 td
            if headers.is_empty() && rows.is_empty() && th.is_empty() {
                let candidate = map_columns(&td, roles);
                if required.iter().all(|r| candidate.values().any(|c| c == r)) {
                    headers = td;
                    continue;
                }
            }
            rows.push((td, link));
        }

        let columns = map_columns(&headers, roles);
        if required.iter().all(|r| columns.values().any(|c| c == r)) {
            return Ok((Table { headers, rows }, columns));
        }
        debug!(
            "Skipping table with headers {:?}: required columns {:?} not found",
            headers, required
        );
    }

    if tables_seen == 0 {
        Err(ExtractionError::Extraction(
            "usage table not found on page".to_string(),
        ))
    } else {
        Err(ExtractionError::Extraction(format!(
            "no table exposes the required columns {:?}",
            required
        )))
    }
}

fn column_value<'a>(
    cells: &'a [String],
    columns: &BTreeMap<usize, Column>,
    role: Column,
) -> Option<&'a str> {
    columns
        .iter()
        .find(|(_, c)| **c == role)
        .and_then(|(idx, _)| cells.get(*idx))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

/// 解析年月单元格
///
/// 支持 `2024-01`、`2024/1`、`01/2024`、`January 2024`、`Jan-2024` 等写法
pub fn parse_period(raw: &str) -> Option<YearMonth> {
    let value = raw.trim();

    if let Some(caps) = PERIOD_NUMERIC.captures(value) {
        let (year, month) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
            (Some(y), Some(m), _, _) => (y.as_str(), m.as_str()),
            (_, _, Some(m), Some(y)) => (y.as_str(), m.as_str()),
            _ => return None,
        };
        return YearMonth::new(year.parse().ok()?, month.parse().ok()?);
    }

    if let Some(caps) = PERIOD_NAMED.captures(value) {
        let name = caps.get(1)?.as_str().to_lowercase();
        let year: i32 = caps.get(2)?.as_str().parse().ok()?;
        let month = (1..=12u32).find(|m| {
            YearMonth::new(year, *m)
                .map(|ym| {
                    let full = ym.month_name().to_lowercase();
                    full == name || (name.len() >= 3 && full.starts_with(&name))
                })
                .unwrap_or(false)
        })?;
        return YearMonth::new(year, month);
    }

    None
}

/// 解析日期单元格
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// 解析字节数单元格
///
/// 无单位时视为字节；支持千位分隔符与 KB/MB/GB/TB（按 1024 进制）
pub fn parse_bytes(raw: &str) -> Option<u64> {
    let value = raw.trim();
    let caps = BYTES.captures(value)?;
    let number: String = caps
        .get(1)?
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let multiplier: u64 = match caps.get(2).map(|u| u.as_str().to_lowercase()).as_deref() {
        None | Some("b") | Some("byte") | Some("bytes") => 1,
        Some("kb") | Some("kib") => 1 << 10,
        Some("mb") | Some("mib") => 1 << 20,
        Some("gb") | Some("gib") => 1 << 30,
        Some("tb") | Some("tib") => 1 << 40,
        Some(_) => return None,
    };

    if !number.contains('.') {
        return number.parse::<u64>().ok()?.checked_mul(multiplier);
    }

    let parsed: f64 = number.parse().ok()?;
    let bytes = (parsed * multiplier as f64).round();
    if bytes.is_finite() && bytes >= 0.0 && bytes <= u64::MAX as f64 {
        Some(bytes as u64)
    } else {
        None
    }
}

/// 解析月度用量表
///
/// 结果按年月从旧到新排序；同一月份重复出现时保留第一行
pub fn parse_monthly_table(
    html: &str,
    table_selector: &str,
    subject_identifier: &str,
    default_source: &str,
) -> Result<Vec<MonthlyRow>, ExtractionError> {
    let roles = [
        Column::Period,
        Column::Msisdn,
        Column::Connected,
        Column::Source,
        Column::Bytes,
    ];
    let (table, columns) = read_table(html, table_selector, &roles, &[Column::Period, Column::Bytes])?;

    let mut by_month: BTreeMap<YearMonth, MonthlyRow> = BTreeMap::new();
    for (cells, link) in table.rows {
        let Some(year_month) = column_value(&cells, &columns, Column::Period).and_then(parse_period)
        else {
            debug!("Skipping monthly row without a recognisable period: {:?}", cells);
            continue;
        };
        let raw_bytes = column_value(&cells, &columns, Column::Bytes).unwrap_or("0");
        let total_bytes = parse_bytes(raw_bytes).ok_or_else(|| {
            ExtractionError::Extraction(format!(
                "unreadable byte count '{}' for {}",
                raw_bytes, year_month
            ))
        })?;

        if by_month.contains_key(&year_month) {
            debug!("Duplicate monthly row for {}, keeping the first", year_month);
            continue;
        }

        let record = UsageRecord {
            year_month,
            source: column_value(&cells, &columns, Column::Source)
                .unwrap_or(default_source)
                .to_string(),
            year: year_month.year,
            month_name: year_month.month_name().to_string(),
            subject_identifier: subject_identifier.to_string(),
            msisdn: column_value(&cells, &columns, Column::Msisdn).map(str::to_string),
            connected_time: column_value(&cells, &columns, Column::Connected)
                .unwrap_or_default()
                .to_string(),
            total_bytes,
            total_gb: to_gb(total_bytes),
        };
        by_month.insert(year_month, MonthlyRow { record, daily_link: link });
    }

    debug!(
        "Parsed {} monthly rows from table with headers {:?}",
        by_month.len(),
        table.headers
    );
    Ok(by_month.into_values().collect())
}

/// 解析某月的日用量表
///
/// 返回值恰好包含该月每一天一条记录；门户未列出的日期补零，
/// 不属于该月的行被忽略，同一天多行时累加。
pub fn parse_daily_table(
    html: &str,
    table_selector: &str,
    year_month: YearMonth,
) -> Result<Vec<DailyUsageRecord>, ExtractionError> {
    let roles = [Column::Date, Column::Connected, Column::Bytes];
    let (table, columns) = read_table(html, table_selector, &roles, &[Column::Date, Column::Bytes])?;

    let mut by_day: BTreeMap<u32, (u64, String)> = BTreeMap::new();
    for (cells, _) in table.rows {
        let Some(date) = column_value(&cells, &columns, Column::Date).and_then(parse_date) else {
            continue;
        };
        if !year_month.contains(date) {
            debug!("Ignoring daily row {} outside {}", date, year_month);
            continue;
        }
        let raw_bytes = column_value(&cells, &columns, Column::Bytes).unwrap_or("0");
        let bytes = parse_bytes(raw_bytes).ok_or_else(|| {
            ExtractionError::Extraction(format!("unreadable byte count '{}' on {}", raw_bytes, date))
        })?;
        let connected = column_value(&cells, &columns, Column::Connected)
            .unwrap_or_default()
            .to_string();

        let entry = by_day.entry(date.day()).or_insert((0, String::new()));
        entry.0 = entry.0.saturating_add(bytes);
        if entry.1.is_empty() {
            entry.1 = connected;
        }
    }

    let first = year_month
        .first_day()
        .ok_or_else(|| ExtractionError::Extraction(format!("invalid month {}", year_month)))?;

    Ok(first
        .iter_days()
        .take(year_month.days_in_month() as usize)
        .map(|date| match by_day.remove(&date.day()) {
            Some((bytes, connected)) => DailyUsageRecord {
                date,
                total_bytes: bytes,
                total_gb: to_gb(bytes),
                connected_time: connected,
            },
            None => DailyUsageRecord::empty(date),
        })
        .collect())
}
