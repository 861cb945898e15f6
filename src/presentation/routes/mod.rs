// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::presentation::handlers::{schedule_handler, scraper_handler};
use axum::{
    routing::{get, patch, post},
    Router,
};

/// 创建应用路由
///
/// 管理接口依赖 `Extension<Arc<ScraperAdminService>>`，由调用方以 layer 注入
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let admin_routes = Router::new()
        .route(
            "/v1/scrapers",
            post(scraper_handler::create_scraper).get(scraper_handler::list_scrapers),
        )
        .route(
            "/v1/scrapers/{id}",
            get(scraper_handler::get_scraper)
                .patch(scraper_handler::update_scraper)
                .delete(scraper_handler::delete_scraper),
        )
        .route(
            "/v1/scrapers/{id}/schedules",
            post(schedule_handler::create_schedule).get(schedule_handler::list_schedules),
        )
        .route("/v1/schedules/{id}", patch(schedule_handler::update_schedule))
        .route("/v1/scrapers/{id}/results", get(scraper_handler::list_results))
        .route(
            "/v1/scrapers/{id}/results/latest",
            get(scraper_handler::latest_result),
        );

    Router::new().merge(public_routes).merge(admin_routes)
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
