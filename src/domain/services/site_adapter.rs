// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_request::ScrapeModule;
use crate::utils::url_utils;
use url::Url;

/// 模块的规范优先级顺序
const CANONICAL_MODULE_ORDER: &[ScrapeModule] = &[
    ScrapeModule::Images,
    ScrapeModule::Videos,
    ScrapeModule::Products,
    ScrapeModule::Text,
    ScrapeModule::Contacts,
    ScrapeModule::Assets,
    ScrapeModule::Crawl,
    ScrapeModule::Screenshot,
];

/// 适配规则
struct AdapterRule {
    /// 规则标识
    id: &'static str,
    /// 匹配的主机名后缀；空表示通配
    host_suffixes: &'static [&'static str],
    /// 是否允许站点地图回退
    sitemap_fallback: bool,
}

/// 规则表：专属规则在前，通配规则兜底。
/// 作品集/图库类站点的站点地图充满画廊永久链接，对crawl回退是噪声。
const RULES: &[AdapterRule] = &[
    AdapterRule {
        id: "portfolio-gallery",
        host_suffixes: &[
            "behance.net",
            "dribbble.com",
            "artstation.com",
            "500px.com",
            "flickr.com",
        ],
        sitemap_fallback: false,
    },
    AdapterRule {
        id: "generic",
        host_suffixes: &[],
        sitemap_fallback: true,
    },
];

/// 按请求派生的站点配置
///
/// 纯函数产物，不保存、不复用
#[derive(Debug, Clone)]
pub struct AdaptedSiteConfig {
    /// 适配器标识
    pub adapter_id: &'static str,
    /// 规范化后的URL（已剥离跟踪参数）
    pub url: Url,
    /// 小写主机名
    pub host: String,
    /// 规范化后的模块列表（去重、按固定优先级排序）
    pub modules: Vec<ScrapeModule>,
    /// 是否允许站点地图回退
    pub sitemap_fallback: bool,
}

/// 站点适配器
///
/// 按主机名选择首个匹配规则，规范化URL与模块列表。无I/O、无状态。
#[derive(Debug, Default, Clone)]
pub struct SiteAdapter;

impl SiteAdapter {
    /// 创建新的站点适配器实例
    pub fn new() -> Self {
        Self
    }

    /// 为请求派生站点配置
    ///
    /// # 参数
    ///
    /// * `url` - 已规范化为绝对形式的目标URL
    /// * `modules` - 请求的模块列表（可能乱序、重复）
    ///
    /// # 返回值
    ///
    /// 派生的站点配置；主机名缺失时返回None
    pub fn adapt(&self, url: &Url, modules: &[ScrapeModule]) -> Option<AdaptedSiteConfig> {
        let host = url_utils::host_of(url)?;

        let rule = RULES
            .iter()
            .find(|r| {
                r.host_suffixes.is_empty()
                    || r.host_suffixes
                        .iter()
                        .any(|suffix| host == *suffix || host.ends_with(&format!(".{}", suffix)))
            })
            .expect("generic rule always matches");

        let cleaned = url_utils::strip_tracking_params(url);

        let canonical_modules: Vec<ScrapeModule> = CANONICAL_MODULE_ORDER
            .iter()
            .copied()
            .filter(|m| modules.contains(m))
            .collect();

        Some(AdaptedSiteConfig {
            adapter_id: rule.id,
            url: cleaned,
            host,
            modules: canonical_modules,
            sitemap_fallback: rule.sitemap_fallback,
        })
    }
}
