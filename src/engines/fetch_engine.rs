// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_request::AuthConfig;
use crate::engines::traits::{FetchedPage, ScrapeError};
use std::time::Duration;

/// 默认请求超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 默认User-Agent，与主流桌面浏览器一致以减少封锁
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 原始HTTP抓取引擎
///
/// 不执行JavaScript，直接请求页面HTML。浏览器路径失败或
/// 被禁用时的次级抓取手段。
#[derive(Clone)]
pub struct FetchEngine {
    client: reqwest::Client,
}

impl Default for FetchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchEngine {
    /// 创建新的HTTP抓取引擎
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// 抓取页面HTML
    ///
    /// # 参数
    ///
    /// * `url` - 目标URL
    /// * `auth` - 可选的认证配置，提供Cookie、自定义头与代理
    ///
    /// # 返回值
    ///
    /// 抓取结果；4xx/5xx状态码视为错误
    pub async fn fetch(
        &self,
        url: &str,
        auth: Option<&AuthConfig>,
    ) -> Result<FetchedPage, ScrapeError> {
        let client = self.client_for(auth)?;
        let mut request = client.get(url).header("Accept", "text/html,application/xhtml+xml");

        if let Some(auth) = auth {
            let cookies = auth.parsed_cookies();
            if !cookies.is_empty() {
                let header = cookies
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect::<Vec<_>>()
                    .join("; ");
                request = request.header("Cookie", header);
            }
            for (name, value) in &auth.headers {
                request = request.header(name.as_str(), value.as_str());
            }
            if let Some(api_key) = &auth.api_key {
                request = request.header("X-Api-Key", api_key.as_str());
            }
        }

        let response = request.send().await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "fetch engine got error status");
            return Err(ScrapeError::UpstreamStatus(status.as_u16()));
        }

        let html = response.text().await?;
        Ok(FetchedPage {
            html,
            final_url,
            screenshot: None,
            used_browser: false,
        })
    }

    /// 按认证配置选择客户端：带代理时构造一次性客户端
    fn client_for(&self, auth: Option<&AuthConfig>) -> Result<reqwest::Client, ScrapeError> {
        let Some(proxy_url) = auth.and_then(|a| a.proxy.as_deref()) else {
            return Ok(self.client.clone());
        };
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ScrapeError::InvalidRequest(format!("invalid proxy: {}", e)))?;
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .proxy(proxy)
            .build()
            .map_err(ScrapeError::Network)
    }
}
