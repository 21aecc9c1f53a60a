// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::robots::RobotsChecker;
use crate::utils::url_utils;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// 站点地图正文抓取超时
const SITEMAP_FETCH_TIMEOUT: Duration = Duration::from_secs(9);

/// 嵌套站点地图索引的最大抓取数
const MAX_NESTED_FETCHES: usize = 8;

/// 默认URL上限
pub const DEFAULT_URL_CAP: usize = 300;

/// 深度爬取请求时的URL上限
pub const DEEP_URL_CAP: usize = 500;

/// 常规站点地图位置
const CONVENTIONAL_LOCATIONS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/wp-sitemap.xml"];

static LOC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<loc>\s*(.*?)\s*</loc>").unwrap());

/// 站点地图发现器
///
/// 对robots.txt声明与常规位置做有界BFS，回填`crawl`模块。
/// 空结果表示"无站点地图可用"，不是错误。
pub struct SitemapDiscovery {
    client: Client,
    robots: RobotsChecker,
}

impl Default for SitemapDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl SitemapDiscovery {
    /// 创建新的站点地图发现器实例
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            robots: RobotsChecker::new(),
        }
    }

    /// 发现页面所属站点的同主机URL列表
    ///
    /// # 参数
    ///
    /// * `page_url` - 触发发现的页面URL
    /// * `url_cap` - 收集URL的上限
    ///
    /// # 返回值
    ///
    /// 发现的同主机URL列表，可能为空
    pub async fn discover(&self, page_url: &Url, url_cap: usize) -> Vec<String> {
        let origin_host = match url_utils::host_of(page_url) {
            Some(h) => h,
            None => return Vec::new(),
        };

        let mut candidates: VecDeque<String> = VecDeque::new();
        for loc in CONVENTIONAL_LOCATIONS {
            if let Ok(u) = page_url.join(loc) {
                candidates.push_back(u.to_string());
            }
        }

        match self.robots.sitemap_urls(page_url.as_str()).await {
            Ok(declared) => {
                for s in declared {
                    candidates.push_back(s);
                }
            }
            Err(e) => tracing::debug!("robots.txt sitemap lookup failed: {}", e),
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut discovered: Vec<String> = Vec::new();
        let mut nested_fetches = 0usize;

        while let Some(sitemap_url) = candidates.pop_front() {
            if discovered.len() >= url_cap {
                break;
            }
            if !visited.insert(sitemap_url.clone()) {
                continue;
            }

            let body = match self.fetch_sitemap(&sitemap_url).await {
                Some(b) => b,
                None => continue,
            };

            let locs = extract_locs(&body);

            if body.contains("<sitemapindex") {
                // Nested index: enqueue same-host child sitemaps, bounded
                for loc in locs {
                    if nested_fetches >= MAX_NESTED_FETCHES {
                        break;
                    }
                    if let Ok(u) = Url::parse(&loc) {
                        if url_utils::host_of(&u).as_deref() == Some(origin_host.as_str()) {
                            candidates.push_back(loc);
                            nested_fetches += 1;
                        }
                    }
                }
            } else {
                for loc in locs {
                    if discovered.len() >= url_cap {
                        break;
                    }
                    if let Ok(u) = Url::parse(&loc) {
                        if url_utils::host_of(&u).as_deref() == Some(origin_host.as_str()) {
                            discovered.push(loc);
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Sitemap discovery for {} found {} urls",
            origin_host,
            discovered.len()
        );
        discovered
    }

    /// 抓取单个站点地图文档
    async fn fetch_sitemap(&self, sitemap_url: &str) -> Option<String> {
        let resp = self
            .client
            .get(sitemap_url)
            .header("User-Agent", "harvestrs-bot/1.0")
            .timeout(SITEMAP_FETCH_TIMEOUT)
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if content_type.contains("text/html") {
            // Soft-404 pages masquerading as sitemaps
            return None;
        }

        resp.text().await.ok()
    }
}

/// 从站点地图XML中提取<loc>项（同主机过滤由调用方完成）
pub fn extract_locs(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .map(|c| c[1].trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_locs() {
        let xml = r#"<?xml version="1.0"?>
            <urlset>
              <url><loc>https://example.com/a</loc></url>
              <url><loc>
                https://example.com/b
              </loc></url>
            </urlset>"#;
        let locs = extract_locs(xml);
        assert_eq!(
            locs,
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_extract_locs_empty() {
        assert!(extract_locs("<urlset></urlset>").is_empty());
    }
}
