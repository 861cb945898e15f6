// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 失败分类
///
/// 原样持久化，供运维诊断失败的抓取目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 会话或浏览器启动失败
    Infrastructure,
    /// 凭据被门户拒绝
    Authentication,
    /// 门户中不存在该账户
    NotFound,
    /// 页面结构与预期不符
    Extraction,
    /// 运行超出时间预算
    Timeout,
    /// 调度或配置本身有误
    Configuration,
}

impl ErrorKind {
    /// 是否需要告警；账户不存在属于预期结果
    pub fn is_alerting(&self) -> bool {
        !matches!(self, ErrorKind::NotFound)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Infrastructure => write!(f, "infrastructure"),
            ErrorKind::Authentication => write!(f, "authentication"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Extraction => write!(f, "extraction"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Configuration => write!(f, "configuration"),
        }
    }
}

impl FromStr for ErrorKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "infrastructure" => Ok(ErrorKind::Infrastructure),
            "authentication" => Ok(ErrorKind::Authentication),
            "not_found" => Ok(ErrorKind::NotFound),
            "extraction" => Ok(ErrorKind::Extraction),
            "timeout" => Ok(ErrorKind::Timeout),
            "configuration" => Ok(ErrorKind::Configuration),
            _ => Err(()),
        }
    }
}

/// 一次运行的结果
///
/// 每次执行尝试对应一条，创建后不再修改。这是系统的审计日志，
/// 也是诊断失败目标的唯一依据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub id: Uuid,
    pub scraper_config_id: Uuid,
    /// 运行开始时间
    pub execution_time: DateTime<Utc>,
    /// 墙钟耗时（毫秒）
    pub duration_ms: u64,
    pub success: bool,
    /// 成功时的结构化负载
    pub result_data: Option<serde_json::Value>,
    /// 仅在失败时设置
    pub error_message: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// 合并进本条记录的驱动调用次数（含重试）
    pub attempts: u32,
}

/// 持久化后的运行结果
pub type ScraperResult = RunResult;

impl RunResult {
    /// 创建成功结果
    pub fn succeeded(
        scraper_config_id: Uuid,
        execution_time: DateTime<Utc>,
        duration_ms: u64,
        result_data: serde_json::Value,
        attempts: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            scraper_config_id,
            execution_time,
            duration_ms,
            success: true,
            result_data: Some(result_data),
            error_message: None,
            error_kind: None,
            attempts,
        }
    }

    /// 创建失败结果
    pub fn failed(
        scraper_config_id: Uuid,
        execution_time: DateTime<Utc>,
        duration_ms: u64,
        kind: ErrorKind,
        message: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            scraper_config_id,
            execution_time,
            duration_ms,
            success: false,
            result_data: None,
            error_message: Some(message.into()),
            error_kind: Some(kind),
            attempts,
        }
    }

    /// 是否为认证失败
    pub fn is_authentication_failure(&self) -> bool {
        !self.success && self.error_kind == Some(ErrorKind::Authentication)
    }
}
