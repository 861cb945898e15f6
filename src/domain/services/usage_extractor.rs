// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::PortalSettings;
use crate::domain::models::usage::{DailyUsageRecord, UsageReport, YearMonth};
use crate::domain::services::usage_parser::{self, MonthlyRow};
use crate::engines::traits::{Credentials, ExtractionError, PortalSession, SessionFactory};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// 一次抽取的目标
#[derive(Debug, Clone)]
pub struct ExtractionTarget {
    /// 门户登录页地址
    pub login_url: String,
    /// 要查询的账户标识
    pub subject: String,
    /// 只保留该月；为空时保留门户列出的全部月份
    pub month: Option<YearMonth>,
    pub credentials: Credentials,
    /// 覆盖默认的月度表选择器
    pub usage_table_selector: Option<String>,
}

/// 会话守卫
///
/// 保证会话在每条退出路径上恰好关闭一次。正常路径调用 [`SessionGuard::release`]；
/// 若守卫在释放前被丢弃（panic 或外部取消），则在后台任务中关闭会话。
pub struct SessionGuard {
    session: Option<Box<dyn PortalSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn PortalSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// 借出会话
    pub fn session(&mut self) -> Result<&mut (dyn PortalSession + 'static), ExtractionError> {
        self.session
            .as_deref_mut()
            .ok_or_else(|| ExtractionError::Infrastructure("session already released".to_string()))
    }

    /// 关闭会话
    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!("Failed to close portal session: {}", e);
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!("Failed to close abandoned portal session: {}", e);
                    }
                });
            }
            Err(_) => warn!("Portal session dropped outside of a runtime; it was not closed"),
        }
    }
}

/// 用量抽取驱动
///
/// 每次调用打开一个新会话，依次执行登录、查找账户、月度抽取、日明细抽取，
/// 最后无条件释放会话。驱动内部不做重试。
#[derive(Clone)]
pub struct UsageExtractor {
    sessions: Arc<dyn SessionFactory>,
    portal: PortalSettings,
}

impl UsageExtractor {
    pub fn new(sessions: Arc<dyn SessionFactory>, portal: PortalSettings) -> Self {
        Self { sessions, portal }
    }

    /// 执行一次完整抽取
    ///
    /// # 参数
    ///
    /// * `target` - 抽取目标
    /// * `deadline` - 截止时间，到期后中止并返回 `Timeout`，会话照常释放
    pub async fn extract(
        &self,
        target: &ExtractionTarget,
        deadline: Instant,
    ) -> Result<UsageReport, ExtractionError> {
        let session = self.open_session(deadline).await?;
        debug!("Opened {} session for {}", self.sessions.name(), target.subject);

        let mut guard = SessionGuard::new(session);
        let outcome = match guard.session() {
            Ok(session) => match timeout_at(deadline, self.run_phases(session, target)).await {
                Ok(result) => result,
                Err(_) => Err(ExtractionError::Timeout),
            },
            Err(e) => Err(e),
        };
        guard.release().await;

        outcome
    }

    /// 在截止时间内打开会话
    ///
    /// 打开在独立任务中进行；超时后才打开成功的会话由该任务负责关闭。
    async fn open_session(
        &self,
        deadline: Instant,
    ) -> Result<Box<dyn PortalSession>, ExtractionError> {
        let sessions = self.sessions.clone();
        let (tx, mut rx) = oneshot::channel();
        tokio::spawn(async move {
            let opened = sessions.open().await;
            if let Err(Ok(session)) = tx.send(opened) {
                debug!("Session opened after the run gave up, closing it");
                SessionGuard::new(session).release().await;
            }
        });

        tokio::select! {
            opened = &mut rx => match opened {
                Ok(result) => result,
                Err(_) => Err(ExtractionError::Infrastructure(
                    "session open task ended unexpectedly".to_string(),
                )),
            },
            _ = sleep_until(deadline) => {
                rx.close();
                // 超时与打开完成同时发生时，会话已在通道中
                if let Ok(Ok(session)) = rx.try_recv() {
                    drop(SessionGuard::new(session));
                }
                Err(ExtractionError::Timeout)
            }
        }
    }

    async fn run_phases(
        &self,
        session: &mut dyn PortalSession,
        target: &ExtractionTarget,
    ) -> Result<UsageReport, ExtractionError> {
        self.login(session, target).await?;
        self.locate_subject(session, target).await?;

        let rows = self.monthly(session, target).await?;
        let mut report = UsageReport::default();
        for row in rows {
            let year_month = row.record.year_month;
            match self.daily(session, &row).await {
                Ok(days) => {
                    report.daily.insert(year_month, days);
                }
                Err(e) => {
                    warn!("Daily breakdown for {} unavailable: {}", year_month, e);
                    report.daily.insert(year_month, Vec::new());
                    report.gaps.push(year_month);
                }
            }
            report.records.push(row.record);
        }

        info!(
            "Extracted {} months for {} ({} gaps)",
            report.records.len(),
            target.subject,
            report.gaps.len()
        );
        Ok(report)
    }

    async fn login(
        &self,
        session: &mut dyn PortalSession,
        target: &ExtractionTarget,
    ) -> Result<(), ExtractionError> {
        session.goto(&target.login_url).await?;
        session
            .fill(&self.portal.username_input, &target.credentials.username)
            .await?;
        session
            .fill(&self.portal.password_input, &target.credentials.password)
            .await?;
        session.click(&self.portal.login_submit).await?;

        let html = session.content().await?;
        if let Some(message) = usage_parser::find_login_error(&html, &self.portal.login_error)? {
            return Err(ExtractionError::Authentication(message));
        }
        if usage_parser::has_element(&html, &self.portal.password_input)? {
            return Err(ExtractionError::Authentication(
                "login form still present after submit".to_string(),
            ));
        }

        debug!("Authenticated as {}", target.credentials.username);
        Ok(())
    }

    async fn locate_subject(
        &self,
        session: &mut dyn PortalSession,
        target: &ExtractionTarget,
    ) -> Result<(), ExtractionError> {
        session.fill(&self.portal.search_input, &target.subject).await?;
        session.click(&self.portal.search_submit).await?;

        let html = session.content().await?;
        if usage_parser::has_element(&html, &self.portal.not_found)? {
            return Err(ExtractionError::NotFound(target.subject.clone()));
        }

        match usage_parser::find_subject_link(&html, &self.portal.result_link, &target.subject)? {
            Some(href) => {
                let url = self.resolve(session, &href).await?;
                session.goto(&url).await
            }
            // 一些门户在唯一匹配时直接跳转到账户页
            None if usage_parser::has_element(&html, self.usage_table(target))? => Ok(()),
            None => Err(ExtractionError::NotFound(target.subject.clone())),
        }
    }

    async fn monthly(
        &self,
        session: &mut dyn PortalSession,
        target: &ExtractionTarget,
    ) -> Result<Vec<MonthlyRow>, ExtractionError> {
        let html = session.content().await?;
        let mut rows = usage_parser::parse_monthly_table(
            &html,
            self.usage_table(target),
            &target.subject,
            &self.portal.default_source,
        )?;

        if let Some(month) = target.month {
            rows.retain(|row| row.record.year_month == month);
        }
        Ok(rows)
    }

    async fn daily(
        &self,
        session: &mut dyn PortalSession,
        row: &MonthlyRow,
    ) -> Result<Vec<DailyUsageRecord>, ExtractionError> {
        let href = row.daily_link.as_deref().ok_or_else(|| {
            ExtractionError::Extraction(format!(
                "no daily link for {}",
                row.record.year_month
            ))
        })?;
        let url = self.resolve(session, href).await?;
        session.goto(&url).await?;

        let html = session.content().await?;
        usage_parser::parse_daily_table(&html, &self.portal.daily_table, row.record.year_month)
    }

    fn usage_table<'a>(&'a self, target: &'a ExtractionTarget) -> &'a str {
        target
            .usage_table_selector
            .as_deref()
            .unwrap_or(&self.portal.usage_table)
    }

    /// 将页面内链接解析为绝对地址
    async fn resolve(
        &self,
        session: &mut dyn PortalSession,
        href: &str,
    ) -> Result<String, ExtractionError> {
        let base = session.current_url().await?;
        let base = Url::parse(&base)
            .map_err(|e| ExtractionError::Extraction(format!("invalid page url '{}': {}", base, e)))?;
        base.join(href)
            .map(String::from)
            .map_err(|e| ExtractionError::Extraction(format!("invalid link '{}': {}", href, e)))
    }
}
