// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 安装 Prometheus 导出器并登记指标说明
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        info!("Metrics exporter disabled");
        return;
    }

    let addr: SocketAddr = match settings.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics listen address '{}': {}", settings.listen, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(
        "scraper_runs_total",
        "Total number of scraper runs, labelled by outcome and error kind"
    );
    describe_histogram!(
        "scraper_run_duration_ms",
        "Wall-clock duration of scraper runs in milliseconds"
    );
    describe_counter!("scheduler_ticks_total", "Total number of scheduler ticks");
    describe_counter!(
        "scheduler_skipped_in_flight_total",
        "Due schedules skipped because their config already had a run in flight"
    );
    describe_counter!(
        "scheduler_deactivations_total",
        "Schedules deactivated automatically, labelled by reason"
    );
}
