// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_request::AuthConfig;
use crate::engines::traits::{FetchedPage, ScrapeError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::OnceCell;

/// 桌面浏览器User-Agent
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 导航阶梯的单级
struct NavTier {
    /// 级别名称，用于日志
    name: &'static str,
    /// 本级导航超时
    goto_timeout: Duration,
    /// 导航成功后的静置时间
    settle: Duration,
}

/// 导航阶梯：逐级放宽超时，任一级成功即停止
const NAV_LADDER: &[NavTier] = &[
    NavTier {
        name: "fast",
        goto_timeout: Duration::from_secs(15),
        settle: Duration::from_secs(2),
    },
    NavTier {
        name: "standard",
        goto_timeout: Duration::from_secs(22),
        settle: Duration::from_secs(4),
    },
    NavTier {
        name: "patient",
        goto_timeout: Duration::from_secs(30),
        settle: Duration::from_secs(6),
    },
];

/// 懒加载滚动的最大迭代次数
const MAX_SCROLL_ITERATIONS: u32 = 10;

/// 页面高度连续不增长该次数后停止滚动
const SCROLL_NO_GROWTH_LIMIT: u32 = 2;

/// 每次滚动后的等待时间
const SCROLL_SETTLE: Duration = Duration::from_millis(700);

/// 点击常见Cookie同意弹窗的脚本，失败静默
const CONSENT_DISMISS_SCRIPT: &str = r#"
(() => {
    const selectors = [
        '#onetrust-accept-btn-handler',
        '.cc-allow', '.cc-accept', '.cookie-accept',
        '[data-testid="cookie-policy-manage-dialog-accept-button"]',
        'button[aria-label*="ccept"]', 'button[id*="accept"]', 'button[class*="accept"]'
    ];
    for (const sel of selectors) {
        const el = document.querySelector(sel);
        if (el) { el.click(); return sel; }
    }
    const buttons = document.querySelectorAll('button');
    for (const btn of buttons) {
        const label = (btn.textContent || '').trim().toLowerCase();
        if (['accept', 'accept all', 'i agree', 'agree', 'got it'].includes(label)) {
            btn.click();
            return label;
        }
    }
    return null;
})()
"#;

/// 浏览器抓取引擎
///
/// 基于chromiumoxide的渲染抓取路径。浏览器实例在首次使用时
/// 启动并在实例内复用，事件循环由后台任务驱动。
pub struct BrowserEngine {
    browser: OnceCell<Browser>,
    enabled: bool,
}

impl BrowserEngine {
    /// 创建新的浏览器引擎
    ///
    /// # 参数
    ///
    /// * `enabled` - 禁用时所有调用返回BrowserMissing，走回退路径
    pub fn new(enabled: bool) -> Self {
        Self {
            browser: OnceCell::new(),
            enabled,
        }
    }

    /// 获取或启动共享浏览器实例
    async fn browser(&self) -> Result<&Browser, ScrapeError> {
        if !self.enabled {
            return Err(ScrapeError::BrowserMissing);
        }

        self.browser
            .get_or_try_init(|| async {
                let config = BrowserConfig::builder()
                    .no_sandbox()
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage")
                    .request_timeout(Duration::from_secs(30))
                    .build()
                    .map_err(ScrapeError::BrowserLaunchFailed)?;

                let (browser, mut handler) = Browser::launch(config)
                    .await
                    .map_err(|e| classify_launch_error(&e.to_string()))?;

                tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if event.is_err() {
                            break;
                        }
                    }
                });

                tracing::info!("browser instance launched");
                Ok(browser)
            })
            .await
    }

    /// 渲染并抓取页面
    ///
    /// 导航按阶梯逐级重试，成功后静置、注入Cookie、滚动触发
    /// 懒加载、关闭同意弹窗，最后取序列化DOM。
    ///
    /// # 参数
    ///
    /// * `url` - 目标URL
    /// * `auth` - 可选的认证配置
    /// * `want_screenshot` - 是否截图
    pub async fn fetch(
        &self,
        url: &str,
        auth: Option<&AuthConfig>,
        want_screenshot: bool,
    ) -> Result<FetchedPage, ScrapeError> {
        let browser = self.browser().await?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Navigation(e.to_string()))?;

        let result = self.fetch_on_page(&page, url, auth, want_screenshot).await;
        if let Err(close_err) = page.close().await {
            tracing::debug!(error = %close_err, "page close failed");
        }
        result
    }

    async fn fetch_on_page(
        &self,
        page: &Page,
        url: &str,
        auth: Option<&AuthConfig>,
        want_screenshot: bool,
    ) -> Result<FetchedPage, ScrapeError> {
        page.set_user_agent(user_agent_override(auth))
            .await
            .map_err(|e| ScrapeError::Navigation(e.to_string()))?;

        if let Some(auth) = auth {
            if !auth.headers.is_empty() {
                // Arbitrary headers need request interception, not worth the cost here
                tracing::warn!("custom headers are only partially supported on the browser path");
            }
            if let Some(tz) = auth.timezone.as_deref() {
                if let Err(e) = page.execute(SetTimezoneOverrideParams::new(tz)).await {
                    tracing::debug!(timezone = tz, error = %e, "timezone override failed");
                }
            }
        }

        let tier = self.navigate_with_ladder(page, url).await?;
        tokio::time::sleep(tier.settle).await;

        let cookies = auth.map(|a| a.parsed_cookies()).unwrap_or_default();
        if !cookies.is_empty() {
            for (name, value) in &cookies {
                let script = format!(
                    "document.cookie = {};",
                    serde_json::json!(format!("{}={}; path=/", name, value))
                );
                if let Err(e) = page.evaluate(script.as_str()).await {
                    tracing::debug!(error = %e, "cookie injection failed");
                }
            }
            // Reload so the injected session takes effect
            page.reload()
                .await
                .map_err(|e| ScrapeError::Navigation(e.to_string()))?;
            tokio::time::sleep(tier.settle).await;
        }

        if let Err(e) = page.evaluate(CONSENT_DISMISS_SCRIPT).await {
            tracing::debug!(error = %e, "consent dismissal script failed");
        }

        self.scroll_for_lazy_content(page).await;

        let html = page
            .content()
            .await
            .map_err(|e| ScrapeError::Navigation(e.to_string()))?;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        let screenshot = if want_screenshot {
            self.capture_screenshot(page).await
        } else {
            None
        };

        Ok(FetchedPage {
            html,
            final_url,
            screenshot,
            used_browser: true,
        })
    }

    /// 沿导航阶梯逐级尝试，返回成功的级别
    async fn navigate_with_ladder(
        &self,
        page: &Page,
        url: &str,
    ) -> Result<&'static NavTier, ScrapeError> {
        let mut last_error = String::new();
        for tier in NAV_LADDER {
            match tokio::time::timeout(tier.goto_timeout, page.goto(url)).await {
                Ok(Ok(_)) => {
                    tracing::debug!(url, tier = tier.name, "navigation succeeded");
                    return Ok(tier);
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    tracing::debug!(url, tier = tier.name, error = %last_error, "navigation failed");
                }
                Err(_) => {
                    last_error = format!("navigation timeout after {:?}", tier.goto_timeout);
                    tracing::debug!(url, tier = tier.name, "navigation timed out");
                }
            }
        }
        Err(ScrapeError::Navigation(format!(
            "all navigation tiers exhausted: {}",
            last_error
        )))
    }

    /// 滚动页面以触发懒加载
    ///
    /// 每轮滚到底部后读取文档高度，高度连续两轮不增长或
    /// 达到迭代上限即停止。脚本错误视为停止信号。
    async fn scroll_for_lazy_content(&self, page: &Page) {
        let mut last_height: i64 = 0;
        let mut no_growth = 0u32;

        for _ in 0..MAX_SCROLL_ITERATIONS {
            if page
                .evaluate("window.scrollTo(0, document.body.scrollHeight);")
                .await
                .is_err()
            {
                break;
            }
            tokio::time::sleep(SCROLL_SETTLE).await;

            let height: i64 = match page.evaluate("document.body.scrollHeight").await {
                Ok(result) => result.into_value().unwrap_or(0),
                Err(_) => break,
            };

            if height <= last_height {
                no_growth += 1;
                if no_growth >= SCROLL_NO_GROWTH_LIMIT {
                    break;
                }
            } else {
                no_growth = 0;
                last_height = height;
            }
        }
    }

    /// 截取整页截图并编码为base64
    async fn capture_screenshot(&self, page: &Page) -> Option<String> {
        let params = chromiumoxide::page::ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(80)
            .full_page(true)
            .build();
        match page.screenshot(params).await {
            Ok(bytes) => Some(BASE64.encode(bytes)),
            Err(e) => {
                tracing::warn!(error = %e, "screenshot capture failed");
                None
            }
        }
    }
}

/// 构造User-Agent覆写参数，带上请求的区域设置
///
/// locale作为Accept-Language随导航请求发送
fn user_agent_override(auth: Option<&AuthConfig>) -> SetUserAgentOverrideParams {
    let mut builder = SetUserAgentOverrideParams::builder().user_agent(USER_AGENT);
    if let Some(locale) = auth.and_then(|a| a.locale.as_deref()) {
        builder = builder.accept_language(locale);
    }
    builder
        .build()
        .unwrap_or_else(|_| SetUserAgentOverrideParams::new(USER_AGENT))
}

/// 按错误文本区分"浏览器缺失"与"启动失败"
fn classify_launch_error(message: &str) -> ScrapeError {
    let lower = message.to_lowercase();
    let missing = lower.contains("no such file")
        || lower.contains("not found")
        || lower.contains("could not auto detect")
        || lower.contains("executable");
    if missing {
        ScrapeError::BrowserMissing
    } else {
        ScrapeError::BrowserLaunchFailed(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_error_classification() {
        assert!(matches!(
            classify_launch_error("Could not auto detect a chrome executable"),
            ScrapeError::BrowserMissing
        ));
        assert!(matches!(
            classify_launch_error("No such file or directory (os error 2)"),
            ScrapeError::BrowserMissing
        ));
        assert!(matches!(
            classify_launch_error("websocket handshake failed"),
            ScrapeError::BrowserLaunchFailed(_)
        ));
    }

    #[test]
    fn test_locale_sent_as_accept_language() {
        let params = user_agent_override(None);
        assert!(params.accept_language.is_none());

        let auth = AuthConfig {
            locale: Some("de-DE".to_string()),
            ..Default::default()
        };
        let params = user_agent_override(Some(&auth));
        assert_eq!(params.accept_language.as_deref(), Some("de-DE"));
        assert_eq!(params.user_agent, USER_AGENT);
    }

    #[tokio::test]
    async fn test_disabled_engine_reports_browser_missing() {
        let engine = BrowserEngine::new(false);
        let err = engine.fetch("https://example.com", None, false).await.unwrap_err();
        assert!(matches!(err, ScrapeError::BrowserMissing));
        assert!(err.is_browser_infrastructure());
    }
}
