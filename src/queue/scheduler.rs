// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SchedulerSettings;
use crate::domain::models::scraper_config::ScraperConfig;
use crate::domain::models::scraper_result::{ErrorKind, RunResult};
use crate::domain::models::scraper_schedule::ScraperSchedule;
use crate::domain::repositories::scraper_config_repository::ScraperConfigRepository;
use crate::domain::repositories::scraper_result_repository::ScraperResultRepository;
use crate::domain::repositories::scraper_schedule_repository::ScraperScheduleRepository;
use crate::domain::services::recurrence::{self, ScheduleError};
use crate::utils::errors::SchedulerError;
use crate::workers::run_executor::RunExecutor;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::counter;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 正在执行的配置集合（配置ID -> 调度ID）
type InFlight = Arc<DashMap<Uuid, Uuid>>;

/// 单个配置的执行许可
///
/// 持有期间同一配置不会被再次触发；丢弃时（包括 panic）自动释放
struct InFlightGuard {
    in_flight: InFlight,
    config_id: Uuid,
}

impl InFlightGuard {
    fn acquire(in_flight: &InFlight, config_id: Uuid, schedule_id: Uuid) -> Option<Self> {
        match in_flight.entry(config_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                entry.insert(schedule_id);
                Some(Self {
                    in_flight: in_flight.clone(),
                    config_id,
                })
            }
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.config_id);
    }
}

/// 抓取调度器
///
/// 每个 tick 从仓库重新加载到期调度（无需重启即可感知启停与频率修改），
/// 为每个到期调度启动一个独立任务执行抓取，完成后保存结果并推进 `next_run`。
#[derive(Clone)]
pub struct ScraperScheduler {
    configs: Arc<dyn ScraperConfigRepository>,
    schedules: Arc<dyn ScraperScheduleRepository>,
    results: Arc<dyn ScraperResultRepository>,
    executor: Arc<RunExecutor>,
    settings: SchedulerSettings,
    in_flight: InFlight,
    permits: Arc<Semaphore>,
}

impl ScraperScheduler {
    /// 创建新的调度器实例
    pub fn new(
        configs: Arc<dyn ScraperConfigRepository>,
        schedules: Arc<dyn ScraperScheduleRepository>,
        results: Arc<dyn ScraperResultRepository>,
        executor: Arc<RunExecutor>,
        settings: SchedulerSettings,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_runs.max(1)));
        Self {
            configs,
            schedules,
            results,
            executor,
            settings,
            in_flight: Arc::new(DashMap::new()),
            permits,
        }
    }

    /// 配置当前是否有运行在执行
    pub fn is_in_flight(&self, config_id: Uuid) -> bool {
        self.in_flight.contains_key(&config_id)
    }

    /// 启动调度循环
    ///
    /// 按固定节奏 tick，直到 `shutdown` 完成；退出前等待已启动的运行结束
    pub fn start<F>(&self, shutdown: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let scheduler = self.clone();

        tokio::spawn(async move {
            let mut ticker = interval(scheduler.settings.tick_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tokio::pin!(shutdown);

            let mut running: Vec<JoinHandle<()>> = Vec::new();
            info!(
                "Scheduler started, ticking every {:?}",
                scheduler.settings.tick_interval()
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        running.retain(|handle| !handle.is_finished());
                        match scheduler.tick(Utc::now()).await {
                            Ok(handles) => running.extend(handles),
                            Err(e) => error!("Scheduler tick failed: {}", e),
                        }
                    }
                    _ = &mut shutdown => {
                        info!("Shutdown requested, waiting for {} running scrapes", running.len());
                        break;
                    }
                }
            }

            for handle in running {
                if let Err(e) = handle.await {
                    error!("Scrape task ended abnormally: {}", e);
                }
            }
            info!("Scheduler stopped");
        })
    }

    /// 执行一次 tick
    ///
    /// 返回本次启动的运行任务句柄；没有到期调度时返回空列表
    #[instrument(skip(self))]
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<JoinHandle<()>>, SchedulerError> {
        counter!("scheduler_ticks_total").increment(1);

        let due = self.schedules.find_due(now).await?;
        if due.is_empty() {
            return Ok(Vec::new());
        }
        debug!("{} schedules due", due.len());

        let mut handles = Vec::new();
        for schedule in due {
            if !schedule.is_due(now) {
                continue;
            }

            if let Err(e) = recurrence::validate(&schedule) {
                self.deactivate_misconfigured(&schedule, e, now).await;
                continue;
            }

            let config = match self.configs.find_by_id(schedule.scraper_config_id).await? {
                Some(config) if config.is_active => config,
                Some(_) => {
                    debug!("Config {} is inactive, skipping schedule {}", schedule.scraper_config_id, schedule.id);
                    continue;
                }
                None => {
                    warn!("Schedule {} references missing config {}", schedule.id, schedule.scraper_config_id);
                    continue;
                }
            };

            let Some(guard) = InFlightGuard::acquire(&self.in_flight, config.id, schedule.id) else {
                counter!("scheduler_skipped_in_flight_total").increment(1);
                debug!("Config {} already has a run in flight, skipping schedule {}", config.id, schedule.id);
                continue;
            };

            // 快照可能已过期：持有许可后重新读取，期间完成的运行已推进 next_run
            let schedule = match self.schedules.find_by_id(schedule.id).await? {
                Some(fresh) if fresh.is_due(now) => fresh,
                _ => {
                    debug!("Schedule {} is no longer due, skipping", schedule.id);
                    continue;
                }
            };

            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler.execute(schedule, config, guard).await;
            }));
        }

        Ok(handles)
    }

    #[instrument(skip(self, schedule, config, guard), fields(schedule_id = %schedule.id, config_id = %config.id))]
    async fn execute(&self, schedule: ScraperSchedule, config: ScraperConfig, guard: InFlightGuard) {
        let _guard = guard;
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Run permits unavailable: {}", e);
                return;
            }
        };

        let result = self.executor.run(&config).await;
        if let Err(e) = self.results.save(&result).await {
            error!("Failed to persist run result {}: {}", result.id, e);
        }

        let last_run = result.execution_time;
        match recurrence::next_run(&schedule, last_run, Utc::now()) {
            Ok(next_run) => {
                if let Err(e) = self.schedules.record_run(schedule.id, last_run, Some(next_run)).await {
                    error!("Failed to advance schedule {}: {}", schedule.id, e);
                }
                debug!("Schedule {} next run at {}", schedule.id, next_run);
            }
            Err(e) => {
                warn!("Schedule {} has no next run ({}), deactivating", schedule.id, e);
                if let Err(e) = self.schedules.record_run(schedule.id, last_run, None).await {
                    error!("Failed to record run for schedule {}: {}", schedule.id, e);
                }
                self.deactivate(schedule.id, "no_next_run").await;
            }
        }

        if result.is_authentication_failure() {
            self.check_authentication_streak(config.id).await;
        }
    }

    /// 连续认证失败达到阈值时停用该配置的全部调度，避免门户锁定账户
    async fn check_authentication_streak(&self, config_id: Uuid) {
        let threshold = self.settings.auth_failure_threshold.max(1) as u64;
        let recent = match self.results.list_results(config_id, None, Some(threshold)).await {
            Ok(recent) => recent,
            Err(e) => {
                error!("Failed to load recent results for {}: {}", config_id, e);
                return;
            }
        };

        let streak = recent.len() as u64 >= threshold
            && recent.iter().all(RunResult::is_authentication_failure);
        if !streak {
            return;
        }

        warn!(
            "Config {} failed authentication {} times in a row, deactivating its schedules",
            config_id, threshold
        );
        match self.schedules.find_by_config_id(config_id).await {
            Ok(schedules) => {
                for schedule in schedules.into_iter().filter(|s| s.is_active) {
                    self.deactivate(schedule.id, "authentication").await;
                }
            }
            Err(e) => error!("Failed to load schedules for {}: {}", config_id, e),
        }
    }

    /// 无法解析的 cron 调度：停用并记录一次配置错误
    async fn deactivate_misconfigured(
        &self,
        schedule: &ScraperSchedule,
        error: ScheduleError,
        now: DateTime<Utc>,
    ) {
        error!("Schedule {} is misconfigured: {}", schedule.id, error);
        self.deactivate(schedule.id, "configuration").await;

        let result = RunResult::failed(
            schedule.scraper_config_id,
            now,
            0,
            ErrorKind::Configuration,
            error.to_string(),
            0,
        );
        if let Err(e) = self.results.save(&result).await {
            error!("Failed to persist configuration failure: {}", e);
        }
    }

    async fn deactivate(&self, schedule_id: Uuid, reason: &'static str) {
        counter!("scheduler_deactivations_total", "reason" => reason).increment(1);
        if let Err(e) = self.schedules.set_active(schedule_id, false).await {
            error!("Failed to deactivate schedule {}: {}", schedule_id, e);
        }
    }
}
