// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::Extension;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use usage_scraper::config::credentials::SettingsCredentialSource;
use usage_scraper::config::settings::Settings;
use usage_scraper::domain::services::scraper_admin_service::ScraperAdminService;
use usage_scraper::domain::services::usage_extractor::UsageExtractor;
use usage_scraper::engines::browser_session::BrowserSessionFactory;
use usage_scraper::infrastructure::database::connection;
use usage_scraper::infrastructure::repositories::scraper_config_repo_impl::ScraperConfigRepoImpl;
use usage_scraper::infrastructure::repositories::scraper_result_repo_impl::ScraperResultRepoImpl;
use usage_scraper::infrastructure::repositories::scraper_schedule_repo_impl::ScraperScheduleRepoImpl;
use usage_scraper::presentation::routes;
use usage_scraper::queue::ScraperScheduler;
use usage_scraper::utils::retry_policy::RetryPolicy;
use usage_scraper::utils::telemetry;
use usage_scraper::workers::RunExecutor;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(&settings.log);
    info!("Starting usage-scraper...");
    usage_scraper::infrastructure::metrics::init_metrics(&settings.metrics);

    // 3. Connect to database and apply migrations
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);
    info!("Database connection established");

    // 4. Initialize components
    let config_repo = Arc::new(ScraperConfigRepoImpl::new(db.clone()));
    let schedule_repo = Arc::new(ScraperScheduleRepoImpl::new(db.clone()));
    let result_repo = Arc::new(ScraperResultRepoImpl::new(db.clone()));

    if settings.credentials.is_empty() {
        warn!("No portal credentials configured; every run will fail with a configuration error");
    }
    let credentials = Arc::new(SettingsCredentialSource::new(settings.credentials.clone()));
    let sessions = Arc::new(BrowserSessionFactory::new(settings.browser.clone()));
    let extractor = UsageExtractor::new(sessions, settings.portal.clone());
    let executor = Arc::new(RunExecutor::new(
        extractor,
        credentials,
        RetryPolicy::from(&settings.retry),
        settings.scheduler.max_run_duration(),
    ));

    let admin = Arc::new(ScraperAdminService::new(
        config_repo.clone(),
        schedule_repo.clone(),
        result_repo.clone(),
    ));

    // 5. Shutdown signal shared by scheduler and server
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // 6. Start scheduler
    let scheduler_handle = if settings.scheduler.enabled {
        let scheduler = ScraperScheduler::new(
            config_repo,
            schedule_repo,
            result_repo,
            executor,
            settings.scheduler.clone(),
        );
        Some(scheduler.start(wait_for_shutdown(shutdown_rx.clone())))
    } else {
        info!("Scheduler disabled by configuration");
        None
    };

    // 7. Start HTTP server
    let app = routes::routes()
        .layer(Extension(admin))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .await?;

    if let Some(handle) = scheduler_handle {
        handle.await?;
    }
    info!("usage-scraper stopped");
    Ok(())
}

async fn wait_for_shutdown(mut rx: tokio::sync::watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
