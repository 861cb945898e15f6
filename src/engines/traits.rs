// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_result::ErrorKind;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// 抽取错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// 会话获取失败（浏览器启动失败、目标不可达）
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
    /// 门户拒绝了凭据，携带门户返回的提示
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// 门户中找不到该账户
    #[error("Subject not found: {0}")]
    NotFound(String),
    /// 页面结构与预期不符
    #[error("Extraction failed: {0}")]
    Extraction(String),
    /// 超时
    #[error("timeout")]
    Timeout,
}

impl ExtractionError {
    /// 对应的持久化分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::Infrastructure(_) => ErrorKind::Infrastructure,
            ExtractionError::Authentication(_) => ErrorKind::Authentication,
            ExtractionError::NotFound(_) => ErrorKind::NotFound,
            ExtractionError::Extraction(_) => ErrorKind::Extraction,
            ExtractionError::Timeout => ErrorKind::Timeout,
        }
    }

    /// 判断错误是否可重试
    ///
    /// 只有基础设施错误会在执行器层重试；认证失败重试可能导致门户锁定账户
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractionError::Infrastructure(_))
    }
}

/// 门户凭据
///
/// `Debug` 输出会隐藏密码，凭据值永远不会进入日志
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// 凭据来源
pub trait CredentialSource: Send + Sync {
    /// 按名称查找凭据
    fn credentials(&self, key: &str) -> Option<Credentials>;
}

/// 一个隔离的浏览会话
///
/// 提供页面级的基本操作，登录、搜索与抽取的状态机由抽取驱动实现。
/// 会话状态（cookie、存储）只属于单次运行。
#[async_trait]
pub trait PortalSession: Send {
    /// 导航到指定地址并等待加载完成
    async fn goto(&mut self, url: &str) -> Result<(), ExtractionError>;
    /// 向匹配选择器的输入框写入文本（先清空）
    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), ExtractionError>;
    /// 点击匹配选择器的元素并等待导航完成
    async fn click(&mut self, selector: &str) -> Result<(), ExtractionError>;
    /// 当前页面的 HTML
    async fn content(&mut self) -> Result<String, ExtractionError>;
    /// 当前页面地址
    async fn current_url(&mut self) -> Result<String, ExtractionError>;
    /// 关闭会话并释放浏览上下文
    async fn close(&mut self) -> Result<(), ExtractionError>;
}

/// 会话工厂
///
/// 每次运行获取一个新会话；获取失败归类为基础设施错误
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PortalSession>, ExtractionError>;

    /// 工厂名称
    fn name(&self) -> &'static str;
}
