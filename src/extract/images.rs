// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_result::ImageRecord;
use crate::utils::url_utils;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// 懒加载图片常用的候选属性
const LAZY_SRC_ATTRS: &[&str] = &[
    "src",
    "data-src",
    "data-lazy-src",
    "data-original",
    "data-image",
    "data-lazy",
    "data-url",
    "data-img-src",
    "data-full-src",
    "data-zoom-image",
    "data-large-src",
];

/// URL中指示跟踪像素的片段
const PIXEL_HINTS: &[&str] = &["pixel", "tracking", "beacon", "1x1", "spacer"];

static CSS_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(['"]?([^'")]+)['"]?\)"#).unwrap());
static SHOPIFY_SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_(\d+x\d*|pico|icon|thumb|small|compact|medium|large|grande)(\.(?:jpe?g|png|webp|gif))")
        .unwrap()
});
static WORDPRESS_DIM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\d+x\d+(\.(?:jpe?g|png|webp|gif))").unwrap());
static CLOUDINARY_TRANSFORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/upload/(?:[a-z]+_[^/]+/)+").unwrap());

/// 从HTML中提取图片记录
///
/// 来源：img标签（含srcset与懒加载属性）、picture源、CSS背景图、
/// 通用data属性。相对URL解析为绝对，应用CDN原图改写，
/// 丢弃data:URI、跟踪像素与20×20以下小图，按最终URL去重。
pub fn extract_images(html: &str, base: &Url) -> Vec<ImageRecord> {
    let document = Html::parse_document(html);
    let mut seen: HashSet<String> = HashSet::new();
    let mut images: Vec<ImageRecord> = Vec::new();

    let mut push = |raw: &str, alt: &str, width: u32, height: u32| {
        if let Some(url) = canonicalize(raw, base) {
            if is_plausible(&url, width, height) && seen.insert(url.clone()) {
                images.push(ImageRecord {
                    url,
                    alt: alt.to_string(),
                    width,
                    height,
                });
            }
        }
    };

    let img_sel = Selector::parse("img").expect("static selector");
    for img in document.select(&img_sel) {
        let alt = img.value().attr("alt").unwrap_or("");
        let width = parse_dim(img.value().attr("width"));
        let height = parse_dim(img.value().attr("height"));

        let srcset = img
            .value()
            .attr("srcset")
            .or_else(|| img.value().attr("data-srcset"));
        if let Some(srcset) = srcset {
            if let Some(best) = best_srcset_entry(srcset) {
                push(&best, alt, width, height);
            }
        }

        for attr in LAZY_SRC_ATTRS {
            if let Some(src) = img.value().attr(attr) {
                push(src, alt, width, height);
            }
        }
    }

    let picture_sel = Selector::parse("picture source").expect("static selector");
    for source in document.select(&picture_sel) {
        let srcset = source
            .value()
            .attr("srcset")
            .or_else(|| source.value().attr("data-srcset"));
        if let Some(srcset) = srcset {
            if let Some(best) = best_srcset_entry(srcset) {
                push(&best, "", 0, 0);
            }
        }
    }

    let style_sel = Selector::parse("[style*=\"background\"]").expect("static selector");
    for element in document.select(&style_sel) {
        let style = element.value().attr("style").unwrap_or("");
        if let Some(cap) = CSS_URL_RE.captures(style) {
            push(&cap[1], "", 0, 0);
        }
    }

    let data_sel = Selector::parse("[data-image], [data-background], [data-bg]")
        .expect("static selector");
    for element in document.select(&data_sel) {
        for attr in ["data-image", "data-background", "data-bg"] {
            if let Some(src) = element.value().attr(attr) {
                push(src, "", 0, 0);
            }
        }
    }

    images
}

/// 解析srcset并返回声明宽度最高的候选
fn best_srcset_entry(srcset: &str) -> Option<String> {
    let mut best: Option<(String, f64)> = None;
    for entry in srcset.split(',') {
        let mut parts = entry.split_whitespace();
        let url = parts.next()?.to_string();
        let descriptor = parts.next().unwrap_or("1x");
        let width = if let Some(w) = descriptor.strip_suffix('w') {
            w.parse::<f64>().unwrap_or(0.0)
        } else if let Some(x) = descriptor.strip_suffix('x') {
            x.parse::<f64>().unwrap_or(0.0) * 1000.0
        } else {
            0.0
        };
        if best.as_ref().map_or(true, |(_, bw)| width > *bw) {
            best = Some((url, width));
        }
    }
    best.map(|(url, _)| url)
}

/// 解析为绝对URL并应用CDN原图改写
fn canonicalize(raw: &str, base: &Url) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with("data:") {
        return None;
    }
    let resolved = url_utils::resolve_url(base, trimmed).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    Some(upgrade_cdn_url(&resolved))
}

/// 候选有效性分类：排除跟踪像素与已知小图
fn is_plausible(url: &str, width: u32, height: u32) -> bool {
    let lower = url.to_lowercase();
    if PIXEL_HINTS.iter().any(|hint| lower.contains(hint)) {
        return false;
    }
    // Declared dimensions below 20x20 are icons or pixels
    if width > 0 && height > 0 && width < 20 && height < 20 {
        return false;
    }
    true
}

/// CDN专属的"请求原图/最高画质"URL改写
///
/// 每个已知CDN族有独立规则；未知CDN原样返回
pub fn upgrade_cdn_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or("").to_lowercase();
    let as_str = url.as_str();

    if host.ends_with("cdn.shopify.com") || as_str.contains("/cdn/shop/") {
        return SHOPIFY_SIZE_RE.replace(as_str, "$2").into_owned();
    }

    if host.ends_with("wixstatic.com") {
        // Everything after /v1/ is a transformation chain
        if let Some(idx) = as_str.find("/v1/") {
            return as_str[..idx].to_string();
        }
        return as_str.to_string();
    }

    if host.ends_with("res.cloudinary.com") {
        return CLOUDINARY_TRANSFORM_RE
            .replace(as_str, "/upload/")
            .into_owned();
    }

    if host.ends_with("images.squarespace-cdn.com") {
        let mut upgraded = url.clone();
        upgraded.set_query(Some("format=2500w"));
        return upgraded.to_string();
    }

    if host.ends_with("files.wordpress.com") || as_str.contains("/wp-content/uploads/") {
        return WORDPRESS_DIM_RE.replace(as_str, "$1").into_owned();
    }

    as_str.to_string()
}

fn parse_dim(attr: Option<&str>) -> u32 {
    attr.and_then(|v| v.trim().parse::<u32>().ok()).unwrap_or(0)
}
