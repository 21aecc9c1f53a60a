// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 抓取模块词汇表
///
/// 变体顺序即规范优先级顺序，站点适配器据此重排模块列表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeModule {
    /// 图片
    Images,
    /// 视频
    Videos,
    /// 商品
    Products,
    /// 页面文本
    Text,
    /// 联系方式
    Contacts,
    /// 可下载资源
    Assets,
    /// 同主机链接图
    Crawl,
    /// 页面截图
    Screenshot,
}

impl ScrapeModule {
    /// 模块名称（与请求词汇表一致）
    pub fn name(&self) -> &'static str {
        match self {
            ScrapeModule::Images => "images",
            ScrapeModule::Videos => "videos",
            ScrapeModule::Products => "products",
            ScrapeModule::Text => "text",
            ScrapeModule::Contacts => "contacts",
            ScrapeModule::Assets => "assets",
            ScrapeModule::Crawl => "crawl",
            ScrapeModule::Screenshot => "screenshot",
        }
    }
}

/// 会话/认证配置
///
/// 对抓取层不透明的凭证配置，逐字段透传给具体引擎
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Cookie字符串列表，格式 "name=value; domain=example.com"
    #[serde(default)]
    pub cookies: Vec<String>,
    /// 额外请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// API密钥，以 X-Api-Key 头发送
    #[serde(default)]
    pub api_key: Option<String>,
    /// 代理URL；指定时该请求走原始HTTP路径（共享浏览器无法按请求换代理）
    #[serde(default)]
    pub proxy: Option<String>,
    /// 区域设置，如 "en-US"，以Accept-Language发送
    #[serde(default)]
    pub locale: Option<String>,
    /// 时区，如 "Europe/Berlin"，浏览器路径生效
    #[serde(default)]
    pub timezone: Option<String>,
}

impl AuthConfig {
    /// 解析Cookie字符串为 (name, value) 对
    ///
    /// 非法条目被跳过
    pub fn parsed_cookies(&self) -> Vec<(String, String)> {
        self.cookies
            .iter()
            .filter_map(|raw| {
                let first = raw.split(';').next()?;
                let (name, value) = first.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect()
    }
}

/// 抓取请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    /// 目标URL
    pub url: String,
    /// 选定的模块集合（有序、去重后非空）
    pub modules: Vec<ScrapeModule>,
    /// 可选的认证/会话配置
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    /// 爬取深度，仅在选择crawl模块时有意义，≥1
    #[serde(default)]
    pub crawl_depth: Option<u32>,
}

impl ScrapeRequest {
    /// 创建仅指定URL与模块的请求
    pub fn new(url: impl Into<String>, modules: Vec<ScrapeModule>) -> Self {
        Self {
            url: url.into(),
            modules,
            auth: None,
            crawl_depth: None,
        }
    }

    /// 生效的爬取深度（缺省为1）
    pub fn effective_crawl_depth(&self) -> u32 {
        self.crawl_depth.unwrap_or(1).max(1)
    }

    /// 是否请求了指定模块
    pub fn wants(&self, module: ScrapeModule) -> bool {
        self.modules.contains(&module)
    }
}
