// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 测试夹具：模拟的用量门户
//!
//! 仅用于测试与本地演示。它以随机（可复现的种子）用量数据渲染登录页、搜索页、
//! 月度表与日明细表的 HTML，让抽取驱动走真实的解析路径而无需联网。
//! 可以按阶段脚本化失败、注入延迟，并统计会话的打开与关闭次数。

use crate::domain::models::usage::YearMonth;
use crate::engines::traits::{ExtractionError, PortalSession, SessionFactory};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "http://portal.test";

/// 失败脚本
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    /// 前 N 次打开会话失败（基础设施错误）
    pub failing_opens: u32,
    /// 登录总是被拒绝
    pub reject_login: bool,
    /// 账户页不渲染用量表
    pub missing_usage_table: bool,
    /// 这些月份的日明细页不可用
    pub missing_daily: Vec<YearMonth>,
    /// 每次导航与点击前的延迟
    pub delay: Option<Duration>,
}

struct PortalState {
    username: String,
    password: String,
    subjects: Vec<String>,
    latest: YearMonth,
    months: u32,
    seed: u64,
    script: Mutex<FakeScript>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// 模拟门户（会话工厂）
#[derive(Clone)]
pub struct FakePortal {
    state: Arc<PortalState>,
}

impl Default for FakePortal {
    fn default() -> Self {
        Self::new("reseller", "secret")
    }
}

impl FakePortal {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            state: Arc::new(PortalState {
                username: username.to_string(),
                password: password.to_string(),
                subjects: vec!["user@isp".to_string()],
                latest: YearMonth { year: 2024, month: 3 },
                months: 3,
                seed: 42,
                script: Mutex::new(FakeScript::default()),
                opened: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
            }),
        }
    }

    /// 设置门户中存在的账户与历史月份
    ///
    /// 仅能在克隆之前调用
    pub fn with_history(mut self, subjects: &[&str], latest: YearMonth, months: u32) -> Self {
        if let Some(state) = Arc::get_mut(&mut self.state) {
            state.subjects = subjects.iter().map(|s| s.to_string()).collect();
            state.latest = latest;
            state.months = months.max(1);
        }
        self
    }

    pub fn with_script(self, script: FakeScript) -> Self {
        self.set_script(script);
        self
    }

    /// 运行期间替换脚本
    pub fn set_script(&self, script: FakeScript) {
        *self.state.script.lock() = script;
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", BASE_URL)
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for FakePortal {
    async fn open(&self) -> Result<Box<dyn PortalSession>, ExtractionError> {
        {
            let mut script = self.state.script.lock();
            if script.failing_opens > 0 {
                script.failing_opens -= 1;
                return Err(ExtractionError::Infrastructure(
                    "browser launch failed (scripted)".to_string(),
                ));
            }
        }

        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
            path: "about:blank".to_string(),
            fields: HashMap::new(),
            query: None,
            closed: false,
        }))
    }

    fn name(&self) -> &'static str {
        "fake_portal"
    }
}

struct FakeSession {
    state: Arc<PortalState>,
    path: String,
    fields: HashMap<&'static str, String>,
    query: Option<String>,
    closed: bool,
}

impl FakeSession {
    async fn pause(&self) {
        let delay = self.state.script.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn ensure_open(&self) -> Result<(), ExtractionError> {
        if self.closed {
            return Err(ExtractionError::Infrastructure("session already closed".to_string()));
        }
        Ok(())
    }

    fn render(&self) -> String {
        let script = self.state.script.lock().clone();
        let path = self.path.as_str();

        if path == "/login" || path == "/login?error=1" {
            let error = if path.ends_with("error=1") {
                r#"<div class="alert-danger">Invalid username or password</div>"#
            } else {
                ""
            };
            return page(&format!(
                r#"{error}<form action="/login" method="post">
                     <input name="username" type="text"><input name="password" type="password">
                     <button type="submit">Sign in</button></form>"#
            ));
        }

        if path == "/search" {
            return page(
                r#"<form role="search"><input type="search" name="q"><button>Search</button></form>"#,
            );
        }

        if path == "/search/results" {
            let query = self.query.clone().unwrap_or_default();
            return match self.subject_index(&query) {
                Some(idx) => page(&format!(
                    r#"<div class="search-results"><a href="/subscribers/{idx}">{}</a></div>"#,
                    self.state.subjects[idx]
                )),
                None => page(r#"<div class="no-results">No subscriber matches your search</div>"#),
            };
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match segments.as_slice() {
            ["subscribers", idx] => match idx.parse::<usize>().ok().and_then(|i| self.state.subjects.get(i)) {
                Some(subject) if !script.missing_usage_table => self.monthly_page(idx, subject),
                Some(_) => page("<p>Usage history is under maintenance</p>"),
                None => page("<h1>404</h1>"),
            },
            ["subscribers", idx, "usage", month] => {
                let subject = idx.parse::<usize>().ok().and_then(|i| self.state.subjects.get(i));
                match (subject, month.parse::<YearMonth>()) {
                    (Some(_), Ok(ym)) if script.missing_daily.contains(&ym) => {
                        page("<p>Daily breakdown unavailable</p>")
                    }
                    (Some(subject), Ok(ym)) => self.daily_page(subject, ym),
                    _ => page("<h1>404</h1>"),
                }
            }
            _ => page("<h1>404</h1>"),
        }
    }

    fn subject_index(&self, query: &str) -> Option<usize> {
        let wanted = query.trim().to_lowercase();
        self.state
            .subjects
            .iter()
            .position(|s| s.to_lowercase() == wanted)
    }

    fn months(&self) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let (mut year, mut month) = (self.state.latest.year, self.state.latest.month);
        for _ in 0..self.state.months {
            months.push(YearMonth { year, month });
            if month == 1 {
                year -= 1;
                month = 12;
            } else {
                month -= 1;
            }
        }
        months
    }

    /// 某月的随机日用量，种子由账户与月份决定
    fn daily_usage(&self, subject: &str, ym: YearMonth) -> Vec<(u64, u32)> {
        let seed = subject
            .bytes()
            .fold(self.state.seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
            ^ ((ym.year as u64) << 8 | ym.month as u64);
        let mut rng = StdRng::seed_from_u64(seed);
        (0..ym.days_in_month())
            .map(|_| (rng.random_range(0..(2u64 << 30)), rng.random_range(0..86_400)))
            .collect()
    }

    fn monthly_page(&self, idx: &str, subject: &str) -> String {
        let rows: String = self
            .months()
            .into_iter()
            .map(|ym| {
                let days = self.daily_usage(subject, ym);
                let bytes: u64 = days.iter().map(|(b, _)| b).sum();
                let seconds: u32 = days.iter().map(|(_, s)| s).sum();
                format!(
                    r#"<tr><td><a href="/subscribers/{idx}/usage/{ym}">{} {}</a></td><td>LTE</td><td>27820000{idx:0>3}</td><td>{}</td><td>{}</td></tr>"#,
                    ym.month_name(),
                    ym.year,
                    hms(seconds),
                    bytes
                )
            })
            .collect();

        page(&format!(
            r#"<table class="usage-history"><thead><tr><th>Month</th><th>Source</th><th>MSISDN</th><th>Connected Time</th><th>Total Bytes</th></tr></thead><tbody>{rows}</tbody></table>"#
        ))
    }

    fn daily_page(&self, subject: &str, ym: YearMonth) -> String {
        let rows: String = self
            .daily_usage(subject, ym)
            .into_iter()
            .enumerate()
            .map(|(day, (bytes, seconds))| {
                format!(
                    "<tr><td>{}-{:02}</td><td>{}</td><td>{}</td></tr>",
                    ym,
                    day + 1,
                    hms(seconds),
                    bytes
                )
            })
            .collect();

        page(&format!(
            r#"<table class="daily-usage"><thead><tr><th>Date</th><th>Connected</th><th>Bytes</th></tr></thead><tbody>{rows}</tbody></table>"#
        ))
    }
}

fn page(body: &str) -> String {
    format!("<html><head><title>Portal</title></head><body>{}</body></html>", body)
}

fn hms(seconds: u32) -> String {
    format!("{:02}:{:02}:{:02}", seconds / 3600, seconds % 3600 / 60, seconds % 60)
}

/// 夹具按选择器中的关键字识别字段
fn field_for(selector: &str) -> &'static str {
    let lowered = selector.to_lowercase();
    if lowered.contains("password") {
        "password"
    } else if lowered.contains("search") || lowered.contains("name=q") {
        "q"
    } else {
        "username"
    }
}

#[async_trait]
impl PortalSession for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<(), ExtractionError> {
        self.ensure_open()?;
        self.pause().await;
        let path = url.strip_prefix(BASE_URL).ok_or_else(|| {
            ExtractionError::Infrastructure(format!("host unreachable: {}", url))
        })?;
        self.path = if path.is_empty() { "/".to_string() } else { path.to_string() };
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), ExtractionError> {
        self.ensure_open()?;
        self.fields.insert(field_for(selector), value.to_string());
        Ok(())
    }

    async fn click(&mut self, _selector: &str) -> Result<(), ExtractionError> {
        self.ensure_open()?;
        self.pause().await;
        match self.path.as_str() {
            "/login" | "/login?error=1" => {
                let rejected = self.state.script.lock().reject_login;
                let username = self.fields.get("username").map(String::as_str);
                let password = self.fields.get("password").map(String::as_str);
                let accepted = !rejected
                    && username == Some(self.state.username.as_str())
                    && password == Some(self.state.password.as_str());
                self.path = if accepted { "/search" } else { "/login?error=1" }.to_string();
                Ok(())
            }
            "/search" | "/search/results" => {
                self.query = self.fields.get("q").cloned();
                self.path = "/search/results".to_string();
                Ok(())
            }
            other => Err(ExtractionError::Extraction(format!(
                "nothing clickable on {}",
                other
            ))),
        }
    }

    async fn content(&mut self) -> Result<String, ExtractionError> {
        self.ensure_open()?;
        Ok(self.render())
    }

    async fn current_url(&mut self) -> Result<String, ExtractionError> {
        self.ensure_open()?;
        Ok(format!("{}{}", BASE_URL, self.path))
    }

    async fn close(&mut self) -> Result<(), ExtractionError> {
        self.closed = true;
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
