// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含服务器、抓取、熔断、重试与远端后端等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 抓取配置
    pub scraper: ScraperSettings,
    /// 熔断配置
    pub breaker: BreakerSettings,
    /// 重试配置
    pub retry: RetrySettings,
    /// 远端后端配置
    pub remote: RemoteSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 抓取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    /// 最大并发抓取任务数
    pub max_concurrent: usize,
    /// 准入队列最大等待秒数
    pub queue_wait_secs: u64,
    /// 单次请求的总时间预算（秒）
    pub request_budget_secs: u64,
    /// 是否启用浏览器路径
    pub browser_enabled: bool,
}

/// 熔断配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BreakerSettings {
    /// 连续失败阈值
    pub failure_threshold: u32,
    /// 打开状态持续秒数
    pub open_secs: u64,
    /// 空闲条目存活秒数
    pub entry_ttl_secs: u64,
}

/// 重试配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// 最大尝试次数
    pub max_attempts: u32,
    /// 基础退避毫秒数
    pub base_delay_ms: u64,
    /// 最大退避毫秒数
    pub max_delay_ms: u64,
}

/// 远端后端配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
    /// 远端抓取后端URL，空表示禁用
    pub url: Option<String>,
    /// 远端请求超时秒数
    pub timeout_secs: u64,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件与环境变量加载配置，支持默认值
    ///
    /// # 返回值
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default scraper settings
            .set_default("scraper.max_concurrent", 2)?
            .set_default("scraper.queue_wait_secs", 45)?
            .set_default("scraper.request_budget_secs", 45)?
            .set_default("scraper.browser_enabled", true)?
            // Default breaker settings
            .set_default("breaker.failure_threshold", 4)?
            .set_default("breaker.open_secs", 120)?
            .set_default("breaker.entry_ttl_secs", 1800)?
            // Default retry settings
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_delay_ms", 900)?
            .set_default("retry.max_delay_ms", 8000)?
            // Default remote backend settings
            .set_default("remote.timeout_secs", 60)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("HARVESTRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}

impl ScraperSettings {
    /// 准入队列最大等待时长
    pub fn queue_wait(&self) -> Duration {
        Duration::from_secs(self.queue_wait_secs)
    }

    /// 单次请求的总时间预算
    pub fn request_budget(&self) -> Duration {
        Duration::from_secs(self.request_budget_secs)
    }
}

impl BreakerSettings {
    /// 打开状态持续时长
    pub fn open_duration(&self) -> Duration {
        Duration::from_secs(self.open_secs)
    }

    /// 空闲条目存活时长
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_ttl_secs)
    }
}
