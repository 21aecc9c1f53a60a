// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::url_utils;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// 从HTML中提取同主机的可爬取链接
///
/// 仅保留与页面同主机的http(s)链接，剥离fragment与跟踪参数，
/// 去重并保持文档顺序。上限由调用方给定。
pub fn extract_crawl_links(html: &str, base: &Url, cap: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchor_sel = Selector::parse("a[href]").expect("static selector");

    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&anchor_sel) {
        if links.len() >= cap {
            break;
        }
        let href = anchor.value().attr("href").unwrap_or("").trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        if !url_utils::same_host(base, &resolved) {
            continue;
        }

        resolved.set_fragment(None);
        let cleaned = url_utils::strip_tracking_params(&resolved);
        let url = cleaned.to_string();
        if url != base.as_str() && seen.insert(url.clone()) {
            links.push(url);
        }
    }

    links
}
