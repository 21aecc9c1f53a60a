// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_result::AssetRecord;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// 识别为可下载资源的扩展名
const ASSET_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "mp4", "docx", "csv", "xlsx", "ppt", "pptx", "mp3", "doc", "rar", "7z",
];

/// 从HTML中提取可下载资源链接
///
/// 扫描所有锚点，按URL路径的扩展名识别资源类型，
/// 解析为绝对URL并去重。
pub fn extract_assets(html: &str, base: &Url) -> Vec<AssetRecord> {
    let document = Html::parse_document(html);
    let anchor_sel = Selector::parse("a[href]").expect("static selector");

    let mut seen: HashSet<String> = HashSet::new();
    let mut assets = Vec::new();

    for anchor in document.select(&anchor_sel) {
        let href = anchor.value().attr("href").unwrap_or("");
        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }

        let path = resolved.path();
        let Some(extension) = path.rsplit('.').next().map(str::to_lowercase) else {
            continue;
        };
        if !path.contains('.') || !ASSET_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }

        let url = resolved.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }

        let filename = path
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();

        assets.push(AssetRecord {
            filename,
            url,
            r#type: extension,
        });
    }

    assets
}
