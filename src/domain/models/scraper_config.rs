// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 抓取目标配置
///
/// 标识一个抓取目标：门户地址、要查询的账户以及所用凭据的名称。
/// 创建后除 `is_active` 和描述性字段外不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperConfig {
    /// 配置唯一标识符
    pub id: Uuid,
    /// 显示名称
    pub name: String,
    /// 门户登录地址
    pub url: String,
    /// 抽取提示：月度用量表的 CSS 选择器（为空时使用门户默认选择器）
    pub selector: Option<String>,
    /// 门户中要查询的账户标识
    pub subject_identifier: String,
    /// 凭据来源中的凭据名称
    pub credential_key: String,
    /// 是否启用
    pub is_active: bool,
    /// 创建者
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScraperConfig {
    /// 创建一个新的启用状态配置
    pub fn new(
        name: String,
        url: String,
        subject_identifier: String,
        credential_key: String,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            url,
            selector: None,
            subject_identifier,
            credential_key,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// 设置抽取提示选择器
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}
