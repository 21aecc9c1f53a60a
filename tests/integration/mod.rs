// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use harvestrs::config::settings::{
    BreakerSettings, RemoteSettings, RetrySettings, ScraperSettings, ServerSettings, Settings,
};

mod api_tests;
mod breaker_tests;
mod queue_tests;
mod scrape_tests;
mod sitemap_tests;

/// 集成测试用配置：浏览器禁用，走原始HTTP路径
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        scraper: ScraperSettings {
            max_concurrent: 2,
            queue_wait_secs: 5,
            request_budget_secs: 30,
            browser_enabled: false,
        },
        breaker: BreakerSettings {
            failure_threshold: 4,
            open_secs: 120,
            entry_ttl_secs: 1800,
        },
        retry: RetrySettings {
            max_attempts: 1,
            base_delay_ms: 1,
            max_delay_ms: 4,
        },
        remote: RemoteSettings {
            url: None,
            timeout_secs: 5,
        },
    }
}
