// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_config::ScraperConfig;
use crate::domain::models::scraper_result::{ErrorKind, RunResult};
use crate::domain::models::usage::{UsageReport, YearMonth};
use crate::domain::services::usage_extractor::{ExtractionTarget, UsageExtractor};
use crate::engines::traits::{CredentialSource, ExtractionError};
use crate::utils::retry_policy::RetryPolicy;
use chrono::Utc;
use futures::FutureExt;
use metrics::{counter, histogram};
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

/// 运行执行器
///
/// 包装一次抽取调用：计时、重试基础设施错误、捕获所有错误并产出一条
/// [`RunResult`]。执行器从不向调用方返回错误或传播 panic。
pub struct RunExecutor {
    extractor: UsageExtractor,
    credentials: Arc<dyn CredentialSource>,
    retry: RetryPolicy,
    max_run_duration: Duration,
}

impl RunExecutor {
    pub fn new(
        extractor: UsageExtractor,
        credentials: Arc<dyn CredentialSource>,
        retry: RetryPolicy,
        max_run_duration: Duration,
    ) -> Self {
        Self {
            extractor,
            credentials,
            retry,
            max_run_duration,
        }
    }

    /// 执行一次完整抓取
    pub async fn run(&self, config: &ScraperConfig) -> RunResult {
        self.run_for_month(config, None).await
    }

    /// 执行一次抓取，只保留指定月份
    #[instrument(skip(self, config), fields(config_id = %config.id, subject = %config.subject_identifier))]
    pub async fn run_for_month(&self, config: &ScraperConfig, month: Option<YearMonth>) -> RunResult {
        let execution_time = Utc::now();
        let started = Instant::now();

        let result = match self.credentials.credentials(&config.credential_key) {
            None => RunResult::failed(
                config.id,
                execution_time,
                elapsed_ms(started),
                ErrorKind::Configuration,
                format!("no credentials configured for key '{}'", config.credential_key),
                0,
            ),
            Some(credentials) => {
                let target = ExtractionTarget {
                    login_url: config.url.clone(),
                    subject: config.subject_identifier.clone(),
                    month,
                    credentials,
                    usage_table_selector: config.selector.clone(),
                };
                let (outcome, attempts) = self.attempt_with_retry(&target, started).await;

                match outcome.and_then(|report| to_result_data(config, month, &report, attempts)) {
                    Ok(data) => RunResult::succeeded(
                        config.id,
                        execution_time,
                        elapsed_ms(started),
                        data,
                        attempts,
                    ),
                    Err(e) => RunResult::failed(
                        config.id,
                        execution_time,
                        elapsed_ms(started),
                        e.kind(),
                        e.to_string(),
                        attempts,
                    ),
                }
            }
        };

        record_metrics(&result);
        match (&result.error_kind, &result.error_message) {
            (None, _) => info!("Run succeeded in {} ms", result.duration_ms),
            (Some(kind), Some(message)) if kind.is_alerting() => {
                error!(kind = %kind, "Run failed: {}", message)
            }
            (Some(kind), message) => {
                warn!(kind = %kind, "Run failed: {}", message.as_deref().unwrap_or_default())
            }
        }
        result
    }

    /// 调用驱动，基础设施错误按退避策略重试，直到截止时间
    async fn attempt_with_retry(
        &self,
        target: &ExtractionTarget,
        started: Instant,
    ) -> (Result<UsageReport, ExtractionError>, u32) {
        let deadline = started + self.max_run_duration;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = AssertUnwindSafe(self.extractor.extract(target, deadline))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    Err(ExtractionError::Extraction(format!("driver panicked: {}", message)))
                });

            match outcome {
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    let backoff = self.retry.calculate_backoff(attempt);
                    if Instant::now() + backoff >= deadline {
                        warn!("Not retrying after attempt {}: run budget exhausted", attempt);
                        return (Err(e), attempt);
                    }
                    warn!(
                        "Attempt {} failed with {}; retrying in {:?}",
                        attempt, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return (other, attempt),
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn to_result_data(
    config: &ScraperConfig,
    month: Option<YearMonth>,
    report: &UsageReport,
    attempts: u32,
) -> Result<Value, ExtractionError> {
    if report.is_partial() {
        warn!("Partial extraction, daily data missing for {:?}", report.gaps);
    }

    let mut data = serde_json::to_value(report)
        .map_err(|e| ExtractionError::Extraction(format!("failed to serialise report: {}", e)))?;
    if let Value::Object(map) = &mut data {
        map.insert("subjectIdentifier".to_string(), json!(config.subject_identifier));
        map.insert("attempts".to_string(), json!(attempts));
        if let Some(month) = month {
            map.insert("month".to_string(), json!(month));
        }
    }
    Ok(data)
}

fn record_metrics(result: &RunResult) {
    let outcome = if result.success { "success" } else { "failure" };
    let kind = result
        .error_kind
        .map(|k| k.to_string())
        .unwrap_or_else(|| "none".to_string());

    counter!("scraper_runs_total", "outcome" => outcome, "kind" => kind).increment(1);
    histogram!("scraper_run_duration_ms").record(result.duration_ms as f64);
}
