// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_result::{TextRecord, MAX_TITLE_LEN};
use crate::utils::normalizer;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// 正文之外的结构性容器，其中的文字不算页面内容
const CHROME_CONTAINERS: &[&str] = &["nav", "header", "footer", "aside"];

/// 短于此长度的段落视为界面碎片
const MIN_PARAGRAPH_LEN: usize = 20;

/// 从HTML中提取页面文本
///
/// 标题取`<title>`，空时回退og:title；描述取meta description，
/// 空时回退og:description。标题与段落跳过nav/header/footer/aside
/// 容器内的节点，去重并保持文档顺序。
pub fn extract_text(html: &str) -> TextRecord {
    let document = Html::parse_document(html);

    let title_sel = Selector::parse("title").expect("static selector");
    let og_title_sel = Selector::parse(r#"meta[property="og:title"]"#).expect("static selector");
    let mut title = document
        .select(&title_sel)
        .next()
        .map(|t| normalizer::clean_text(&t.text().collect::<String>()))
        .unwrap_or_default();
    if title.is_empty() {
        title = document
            .select(&og_title_sel)
            .next()
            .and_then(|m| m.value().attr("content"))
            .map(normalizer::clean_text)
            .unwrap_or_default();
    }
    if let Some((cut, _)) = title.char_indices().nth(MAX_TITLE_LEN) {
        title.truncate(cut);
    }

    let meta_sel = Selector::parse(r#"meta[name="description"]"#).expect("static selector");
    let og_desc_sel =
        Selector::parse(r#"meta[property="og:description"]"#).expect("static selector");
    let mut meta = document
        .select(&meta_sel)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(normalizer::clean_text)
        .unwrap_or_default();
    if meta.is_empty() {
        meta = document
            .select(&og_desc_sel)
            .next()
            .and_then(|m| m.value().attr("content"))
            .map(normalizer::clean_text)
            .unwrap_or_default();
    }

    let heading_sel = Selector::parse("h1, h2, h3").expect("static selector");
    let mut seen: HashSet<String> = HashSet::new();
    let mut headings = Vec::new();
    for heading in document.select(&heading_sel) {
        if inside_chrome(&heading) {
            continue;
        }
        let text = normalizer::clean_text(&heading.text().collect::<String>());
        if !text.is_empty() && seen.insert(text.clone()) {
            headings.push(text);
        }
    }

    let paragraph_sel = Selector::parse("p").expect("static selector");
    let mut seen_paragraphs: HashSet<String> = HashSet::new();
    let mut paragraphs = Vec::new();
    for paragraph in document.select(&paragraph_sel) {
        if inside_chrome(&paragraph) {
            continue;
        }
        let text = normalizer::clean_text(&paragraph.text().collect::<String>());
        if text.len() >= MIN_PARAGRAPH_LEN && seen_paragraphs.insert(text.clone()) {
            paragraphs.push(text);
        }
    }

    TextRecord {
        title,
        meta,
        headings,
        paragraphs,
    }
}

/// 判断元素是否位于页面骨架容器内
fn inside_chrome(element: &ElementRef) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .map(|el| CHROME_CONTAINERS.contains(&el.name()))
            .unwrap_or(false)
    })
}
