// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::orchestrator::ScraperService;
use crate::presentation::handlers::{health_handler, metrics_handler, scrape_handler};
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    /// 抓取编排服务
    pub service: Arc<ScraperService>,
    /// Prometheus指标句柄
    pub metrics: PrometheusHandle,
}

/// 装配应用路由
///
/// # 参数
///
/// * `service` - 抓取编排服务
/// * `metrics` - Prometheus指标句柄
pub fn build_router(service: Arc<ScraperService>, metrics: PrometheusHandle) -> Router {
    let state = AppState { service, metrics };

    Router::new()
        .route("/scrape", post(scrape_handler::scrape))
        .route("/health", get(health_handler::health))
        .route("/metrics", get(metrics_handler::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
