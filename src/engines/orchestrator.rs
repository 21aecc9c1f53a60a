// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::Settings;
use crate::domain::models::scrape_request::{AuthConfig, ScrapeModule, ScrapeRequest};
use crate::domain::models::scrape_result::{crawl_cap_for_depth, ScrapeResult};
use crate::domain::services::site_adapter::{AdaptedSiteConfig, SiteAdapter};
use crate::engines::browser_engine::BrowserEngine;
use crate::engines::circuit_breaker::{BreakerConfig, HostCircuitBreaker};
use crate::engines::fetch_engine::FetchEngine;
use crate::engines::traits::{FetchedPage, ScrapeError};
use crate::extract;
use crate::infrastructure::remote_backend::RemoteBackendClient;
use crate::queue::admission::AdmissionQueue;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::robots::RobotsChecker;
use crate::utils::sitemap::{SitemapDiscovery, DEEP_URL_CAP, DEFAULT_URL_CAP};
use crate::utils::url_utils;
use metrics::{counter, histogram};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use url::Url;

/// 合规检查使用的User-Agent
const ROBOTS_USER_AGENT: &str = "harvestrs-bot/1.0";

/// robots.txt声明的Crawl-delay的遵守上限
const MAX_CRAWL_DELAY: Duration = Duration::from_secs(5);

/// 单次请求内展开的内嵌视频页上限
const MAX_EMBED_EXPANSIONS: usize = 3;

/// 抓取编排服务
///
/// 串联准入队列、熔断器、重试策略与多级抓取路径：
/// 浏览器渲染优先，浏览器基础设施故障时降级为原始HTTP，
/// 爬取结果为空时按适配规则回退到站点地图发现。
/// 所有协作对象在构造时注入，服务自身可克隆共享。
#[derive(Clone)]
pub struct ScraperService {
    adapter: SiteAdapter,
    browser: Arc<BrowserEngine>,
    fetch: FetchEngine,
    queue: AdmissionQueue,
    breaker: HostCircuitBreaker,
    retry: RetryPolicy,
    sitemap: Arc<SitemapDiscovery>,
    robots: RobotsChecker,
    remote: RemoteBackendClient,
    request_budget: Duration,
}

impl ScraperService {
    /// 按配置构造服务
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            adapter: SiteAdapter::new(),
            browser: Arc::new(BrowserEngine::new(settings.scraper.browser_enabled)),
            fetch: FetchEngine::new(),
            queue: AdmissionQueue::new(
                settings.scraper.max_concurrent,
                settings.scraper.queue_wait(),
            ),
            breaker: HostCircuitBreaker::new(BreakerConfig {
                failure_threshold: settings.breaker.failure_threshold,
                open_duration: settings.breaker.open_duration(),
                entry_ttl: settings.breaker.entry_ttl(),
                // A probe claim cannot outlive the request it backs
                probe_timeout: settings.scraper.request_budget(),
            }),
            retry: RetryPolicy {
                max_attempts: settings.retry.max_attempts,
                base_delay: Duration::from_millis(settings.retry.base_delay_ms),
                max_delay: Duration::from_millis(settings.retry.max_delay_ms),
                ..Default::default()
            },
            sitemap: Arc::new(SitemapDiscovery::new()),
            robots: RobotsChecker::new(),
            remote: RemoteBackendClient::new(&settings.remote),
            request_budget: settings.scraper.request_budget(),
        }
    }

    /// 执行一次抓取请求
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// 稀疏的抓取结果；队列超时、熔断拒绝、参数无效
    /// 或所有抓取路径均失败时返回错误
    pub async fn scrape(&self, request: ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("scrape", %request_id, url = %request.url);
        self.scrape_inner(request).instrument(span).await
    }

    async fn scrape_inner(&self, request: ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        let started = Instant::now();

        let config = self.validate(&request)?;
        tracing::info!(
            host = %config.host,
            modules = ?config.modules,
            adapter = config.adapter_id,
            "scrape request admitted for processing"
        );

        // Compliance check is warn-only
        match self.robots.is_allowed(config.url.as_str(), ROBOTS_USER_AGENT).await {
            Ok(false) => {
                tracing::warn!(url = %config.url, "robots.txt disallows this path, proceeding");
            }
            Ok(true) => {}
            Err(e) => tracing::debug!(error = %e, "robots.txt check failed"),
        }

        // Declared Crawl-delay is honored up to a bound
        if let Ok(Some(delay)) = self
            .robots
            .crawl_delay(config.url.as_str(), ROBOTS_USER_AGENT)
            .await
        {
            let wait = delay.min(MAX_CRAWL_DELAY);
            if !wait.is_zero() {
                tracing::debug!(wait_ms = wait.as_millis() as u64, "honoring robots crawl-delay");
                tokio::time::sleep(wait).await;
            }
        }

        if RemoteBackendClient::is_heavy(&request) && self.remote.is_configured() {
            if let Some(result) = self.remote.try_scrape(&request).await {
                tracing::info!("heavy request served by remote backend");
                return Ok(result);
            }
        }

        let budget = self.request_budget;
        let outcome = self
            .queue
            .run(async {
                match tokio::time::timeout(budget, self.execute(&request, &config)).await {
                    Ok(result) => result,
                    Err(_) => Err(ScrapeError::Internal(format!(
                        "request budget of {:?} exceeded",
                        budget
                    ))),
                }
            })
            .await;

        let result = match outcome {
            Ok(inner) => inner,
            Err(queue_err) => Err(queue_err),
        };

        let elapsed = started.elapsed();
        histogram!("scrape_duration_seconds").record(elapsed.as_secs_f64());
        match &result {
            Ok(_) => counter!("scrape_requests_total", "outcome" => "ok").increment(1),
            Err(e) => {
                tracing::warn!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "scrape failed");
                counter!("scrape_requests_total", "outcome" => "error").increment(1);
            }
        }
        result
    }

    /// 校验请求并派生站点配置
    fn validate(&self, request: &ScrapeRequest) -> Result<AdaptedSiteConfig, ScrapeError> {
        if request.modules.is_empty() {
            return Err(ScrapeError::InvalidRequest(
                "at least one module must be selected".to_string(),
            ));
        }

        let url = url_utils::normalize_request_url(&request.url)
            .map_err(|e| ScrapeError::InvalidRequest(format!("invalid url: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ScrapeError::InvalidRequest(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        self.adapter
            .adapt(&url, &request.modules)
            .ok_or_else(|| ScrapeError::InvalidRequest("url has no host".to_string()))
    }

    /// 抓取页面并运行所有选定模块
    async fn execute(
        &self,
        request: &ScrapeRequest,
        config: &AdaptedSiteConfig,
    ) -> Result<ScrapeResult, ScrapeError> {
        let page = self.fetch_with_resilience(request, config).await?;
        let mut result = self.run_modules(request, config, &page);

        self.expand_video_embeds(&mut result).await;

        // Crawl came up empty on the live DOM: sitemap is the last tier
        if request.wants(ScrapeModule::Crawl)
            && result.crawl.is_none()
            && config.sitemap_fallback
        {
            let cap = if request.effective_crawl_depth() > 1 {
                DEEP_URL_CAP
            } else {
                DEFAULT_URL_CAP
            };
            let urls = self.sitemap.discover(&config.url, cap).await;
            if !urls.is_empty() {
                tracing::info!(count = urls.len(), "crawl backfilled from sitemap");
                counter!("sitemap_backfills_total").increment(1);
            }
            result.set_crawl(urls, cap);
        }

        if let Some(screenshot) = page.screenshot {
            result.screenshot = Some(screenshot);
        }

        Ok(result)
    }

    /// 在熔断器与重试策略保护下抓取页面
    ///
    /// 熔断器以整次（含重试的）抓取为单位记录成败；
    /// 重试只针对瞬态错误，非瞬态立即传播。
    async fn fetch_with_resilience(
        &self,
        request: &ScrapeRequest,
        config: &AdaptedSiteConfig,
    ) -> Result<FetchedPage, ScrapeError> {
        self.breaker.before_request(&config.host)?;

        let outcome = self
            .retry
            .execute(
                || self.fetch_once(request, config),
                ScrapeError::is_transient,
            )
            .await;

        match &outcome {
            Ok(_) => self.breaker.record_success(&config.host),
            Err(e) if counts_for_breaker(e) => self.breaker.record_failure(&config.host),
            Err(_) => {}
        }
        outcome
    }

    /// 单次抓取尝试：浏览器优先，基础设施故障降级到原始HTTP
    ///
    /// 指定了每请求代理时跳过浏览器层：共享浏览器实例
    /// 无法按请求切换代理，原始HTTP路径可以。
    async fn fetch_once(
        &self,
        request: &ScrapeRequest,
        config: &AdaptedSiteConfig,
    ) -> Result<FetchedPage, ScrapeError> {
        let want_screenshot = request.wants(ScrapeModule::Screenshot);
        let auth = request.auth.as_ref();

        if prefers_raw_http(auth) {
            return self.fetch.fetch(config.url.as_str(), auth).await;
        }

        match self
            .browser
            .fetch(config.url.as_str(), auth, want_screenshot)
            .await
        {
            Ok(page) => Ok(page),
            Err(e) if e.is_browser_infrastructure() => {
                tracing::warn!(error = %e, "browser unavailable, degrading to raw http fetch");
                counter!("browserless_fallbacks_total").increment(1);
                self.fetch.fetch(config.url.as_str(), auth).await
            }
            Err(e) => {
                tracing::debug!(error = %e, "browser fetch failed, trying raw http before retry");
                match self.fetch.fetch(config.url.as_str(), auth).await {
                    Ok(page) => Ok(page),
                    // The browser error carries more context, keep it
                    Err(_) => Err(e),
                }
            }
        }
    }

    /// 对抓取到的页面运行所有选定模块
    ///
    /// 每个模块独立执行，单个模块的panic只丢弃该模块的结果
    fn run_modules(
        &self,
        request: &ScrapeRequest,
        config: &AdaptedSiteConfig,
        page: &FetchedPage,
    ) -> ScrapeResult {
        let base = Url::parse(&page.final_url).unwrap_or_else(|_| config.url.clone());
        let html = page.html.as_str();
        let mut result = ScrapeResult::default();

        for module in &config.modules {
            let applied = std::panic::catch_unwind(AssertUnwindSafe(|| match module {
                ScrapeModule::Images => {
                    result.set_images(extract::images::extract_images(html, &base));
                }
                ScrapeModule::Videos => {
                    result.set_videos(extract::videos::extract_videos(html, &base));
                }
                ScrapeModule::Products => {
                    result.set_products(extract::products::extract_products(html, &base));
                }
                ScrapeModule::Text => {
                    result.set_text(extract::text::extract_text(html));
                }
                ScrapeModule::Contacts => {
                    result.set_contacts(extract::contacts::extract_contacts(html));
                }
                ScrapeModule::Assets => {
                    result.set_assets(extract::assets::extract_assets(html, &base));
                }
                ScrapeModule::Crawl => {
                    let cap = crawl_cap_for_depth(request.effective_crawl_depth());
                    result.set_crawl(
                        extract::links::extract_crawl_links(html, &base, cap),
                        cap,
                    );
                }
                ScrapeModule::Screenshot => {
                    // Captured on the fetch path, nothing to extract
                }
            }));

            if applied.is_err() {
                tracing::error!(module = module.name(), "module extraction panicked, skipped");
                counter!("module_failures_total", "module" => module.name()).increment(1);
            }
        }

        result
    }

    /// 展开内嵌视频指向的播放页
    ///
    /// 对前几个平台内嵌条目各追加一次播放页抓取，从脚本与
    /// 属性中挖掘直链媒体URL并合并进结果。尽力而为，抓取
    /// 失败只记录不报错。
    async fn expand_video_embeds(&self, result: &mut ScrapeResult) {
        let targets: Vec<String> = match &result.videos {
            Some(videos) => videos
                .iter()
                .filter(|v| v.is_embedded)
                .take(MAX_EMBED_EXPANSIONS)
                .map(|v| v.url.clone())
                .collect(),
            None => return,
        };
        if targets.is_empty() {
            return;
        }

        let mut found = Vec::new();
        for url in &targets {
            match self.fetch.fetch(url, None).await {
                Ok(page) => {
                    found.extend(extract::videos::direct_media_urls(&page.html));
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "embed player page fetch failed");
                }
            }
        }
        if found.is_empty() {
            return;
        }

        if let Some(videos) = result.videos.as_mut() {
            let merged = extract::videos::merge_direct_urls(videos, found);
            if merged > 0 {
                tracing::debug!(merged, "direct media urls mined from embed pages");
                counter!("embed_expansions_total").increment(merged as u64);
            }
        }
    }

    /// 清理熔断器的过期条目，由后台任务周期调用
    pub fn sweep_breaker(&self) -> usize {
        self.breaker.sweep()
    }
}

/// 带每请求代理的抓取必须走原始HTTP路径
fn prefers_raw_http(auth: Option<&AuthConfig>) -> bool {
    auth.map(|a| a.proxy.is_some()).unwrap_or(false)
}

/// 计入熔断统计的错误：对目标主机真实发起且失败的请求
fn counts_for_breaker(error: &ScrapeError) -> bool {
    matches!(
        error,
        ScrapeError::Navigation(_) | ScrapeError::Network(_) | ScrapeError::UpstreamStatus(_)
    )
}
