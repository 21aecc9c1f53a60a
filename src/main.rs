// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use harvestrs::config::Settings;
use harvestrs::engines::orchestrator::ScraperService;
use harvestrs::presentation::routes;
use harvestrs::utils::telemetry;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// 熔断器条目清理周期
const BREAKER_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting harvestrs...");

    // 2. Initialize Prometheus metrics
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    // 3. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // 4. Build the scraper service
    let service = Arc::new(ScraperService::from_settings(&settings));

    // 5. Background sweep of stale circuit breaker entries
    let sweeper = service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(BREAKER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweeper.sweep_breaker();
            if removed > 0 {
                tracing::debug!(removed, "swept stale circuit breaker entries");
            }
        }
    });

    // 6. Serve
    let app = routes::build_router(service, metrics_handle);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
