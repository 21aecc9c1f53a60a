// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use parking_lot::Mutex;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// robots.txt抓取超时
const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(6);

/// 缓存的robots.txt内容
#[derive(Clone)]
struct CachedRobots {
    content: String,
    expires_at: Instant,
}

/// Robots.txt检查器
///
/// 带内存缓存的robots.txt抓取与匹配；默认仅告警不强制（合规检查策略由调用方决定）
#[derive(Clone)]
pub struct RobotsChecker {
    /// HTTP客户端
    client: Client,
    /// 内存缓存
    memory_cache: Arc<Mutex<HashMap<String, CachedRobots>>>,
    /// 缓存有效期
    cache_ttl: Duration,
}

impl Default for RobotsChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotsChecker {
    /// 创建新的Robots检查器实例
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            memory_cache: Arc::new(Mutex::new(HashMap::new())),
            cache_ttl: Duration::from_secs(3600),
        }
    }

    /// 检查URL是否被允许访问
    ///
    /// # 参数
    ///
    /// * `url_str` - 目标URL
    /// * `user_agent` - User-Agent字符串
    ///
    /// # 返回值
    ///
    /// 如果robots.txt允许访问则返回true；抓取失败时默认允许
    pub async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool> {
        let content = self.get_robots_content(url_str).await?;
        let url = Url::parse(url_str)?;
        let mut matcher = DefaultMatcher::default();
        Ok(matcher.one_agent_allowed_by_robots(user_agent, url.path(), &content))
    }

    /// 获取robots.txt中声明的站点地图URL列表
    pub async fn sitemap_urls(&self, url_str: &str) -> Result<Vec<String>> {
        let content = self.get_robots_content(url_str).await?;
        Ok(content
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                let lower = line.to_lowercase();
                lower
                    .starts_with("sitemap:")
                    .then(|| line[8..].trim().to_string())
            })
            .filter(|s| !s.is_empty())
            .collect())
    }

    /// 获取适用于该User-Agent的Crawl-delay
    pub async fn crawl_delay(&self, url_str: &str, user_agent: &str) -> Result<Option<Duration>> {
        let content = self.get_robots_content(url_str).await?;
        Ok(parse_crawl_delay(&content, user_agent))
    }

    /// 获取robots.txt内容（带缓存）
    async fn get_robots_content(&self, url_str: &str) -> Result<String> {
        let url = Url::parse(url_str)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid URL: no host"))?
            .to_string();
        // join keeps a non-default port, host-only formatting would not
        let robots_url = url.join("/robots.txt")?.to_string();

        {
            let mut cache = self.memory_cache.lock();
            if let Some(cached) = cache.get(&robots_url) {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.content.clone());
                }
                cache.remove(&robots_url);
            }
        }

        let content = match self
            .client
            .get(&robots_url)
            .header("User-Agent", "harvestrs-bot/1.0")
            .timeout(ROBOTS_FETCH_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            Ok(resp) => {
                // 404 means no robots.txt; other statuses treated as "no restrictions"
                tracing::debug!("robots.txt fetch for {} returned {}", host, resp.status());
                String::new()
            }
            Err(e) => {
                tracing::warn!("Failed to fetch robots.txt from {}: {}", robots_url, e);
                String::new()
            }
        };

        let mut cache = self.memory_cache.lock();
        cache.insert(
            robots_url,
            CachedRobots {
                content: content.clone(),
                expires_at: Instant::now() + self.cache_ttl,
            },
        );

        Ok(content)
    }
}

/// 解析Crawl-delay指令
///
/// 简化实现：定位匹配的User-agent块，块内查找Crawl-delay；
/// 专属块优先于通配块
fn parse_crawl_delay(content: &str, user_agent: &str) -> Option<Duration> {
    let mut current_agent_matched = false;
    let mut specific_agent_found = false;
    let mut delay: Option<f64> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let lower_line = line.to_lowercase();
        if lower_line.starts_with("user-agent:") {
            let agent = line[11..].trim();
            if agent == "*" {
                current_agent_matched = !specific_agent_found;
            } else if user_agent.to_lowercase().contains(&agent.to_lowercase()) {
                current_agent_matched = true;
                specific_agent_found = true;
                delay = None;
            } else {
                current_agent_matched = false;
            }
        } else if lower_line.starts_with("crawl-delay:") && current_agent_matched {
            if let Ok(d) = line[12..].trim().parse::<f64>() {
                delay = Some(d);
            }
        }
    }

    delay.map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crawl_delay_wildcard() {
        let content = "User-agent: *\nCrawl-delay: 2\n";
        assert_eq!(
            parse_crawl_delay(content, "harvestrs-bot"),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_parse_crawl_delay_specific_overrides_wildcard() {
        let content = "User-agent: *\nCrawl-delay: 10\nUser-agent: harvestrs\nCrawl-delay: 1\n";
        assert_eq!(
            parse_crawl_delay(content, "harvestrs-bot/1.0"),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_parse_crawl_delay_absent() {
        let content = "User-agent: *\nDisallow: /private\n";
        assert_eq!(parse_crawl_delay(content, "harvestrs-bot"), None);
    }
}
