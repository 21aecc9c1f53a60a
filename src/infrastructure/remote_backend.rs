// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::RemoteSettings;
use crate::domain::models::scrape_request::ScrapeRequest;
use crate::domain::models::scrape_result::ScrapeResult;
use metrics::counter;
use std::time::Duration;

/// 深度超过此值的爬取视为重型请求
const HEAVY_DEPTH_THRESHOLD: u32 = 1;

/// 模块数达到此值的请求视为重型请求
const HEAVY_MODULE_COUNT: usize = 3;

/// 远端抓取后端客户端
///
/// 重型请求可以转发到专用的远端抓取集群。远端与本地的
/// 请求/结果形状完全一致，远端任何失败都静默回落到本地路径。
#[derive(Clone)]
pub struct RemoteBackendClient {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl RemoteBackendClient {
    /// 按配置创建远端客户端
    ///
    /// # 参数
    ///
    /// * `settings` - 远端后端配置，URL缺省时客户端处于禁用状态
    pub fn new(settings: &RemoteSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: settings.url.clone(),
        }
    }

    /// 判断请求是否重型，重型请求优先走远端
    pub fn is_heavy(request: &ScrapeRequest) -> bool {
        request.effective_crawl_depth() > HEAVY_DEPTH_THRESHOLD
            || request.modules.len() >= HEAVY_MODULE_COUNT
    }

    /// 是否配置了远端后端
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// 尝试在远端执行请求
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求，原样转发
    ///
    /// # 返回值
    ///
    /// 远端成功时返回结果；未配置、网络失败、非2xx状态或
    /// 响应无法解析时返回None，调用方回落到本地执行
    pub async fn try_scrape(&self, request: &ScrapeRequest) -> Option<ScrapeResult> {
        let base_url = self.base_url.as_deref()?;
        let endpoint = format!("{}/scrape", base_url.trim_end_matches('/'));

        let response = match self.client.post(&endpoint).json(request).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "remote backend unreachable, falling back to local");
                counter!("remote_backend_failures_total").increment(1);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                status = response.status().as_u16(),
                "remote backend returned error status, falling back to local"
            );
            counter!("remote_backend_failures_total").increment(1);
            return None;
        }

        match response.json::<ScrapeResult>().await {
            Ok(result) => {
                counter!("remote_backend_successes_total").increment(1);
                Some(result)
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote backend response unparseable, falling back");
                counter!("remote_backend_failures_total").increment(1);
                None
            }
        }
    }
}
