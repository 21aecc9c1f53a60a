// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_result::ContactsRecord;
use crate::utils::normalizer;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;

/// 社交平台主机名
const SOCIAL_HOSTS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "pinterest.com",
    "github.com",
];

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+?\d[\d\s().-]{8,}\d").unwrap()
});

/// 图片等资源文件的扩展名，邮箱正则会误匹配形如 logo@2x.png 的文件名
const FILE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".css", ".js"];

/// 从HTML中提取联系方式
///
/// 邮箱：mailto:链接与可见文本正则匹配；
/// 电话：tel:链接与文本匹配，经规范化校验（至少10位数字）；
/// 社交：指向已知社交平台的链接。各类去重并保持出现顺序。
pub fn extract_contacts(html: &str) -> ContactsRecord {
    let document = Html::parse_document(html);

    let mut emails: Vec<String> = Vec::new();
    let mut phones: Vec<String> = Vec::new();
    let mut socials: Vec<String> = Vec::new();
    let mut seen_emails: HashSet<String> = HashSet::new();
    let mut seen_phones: HashSet<String> = HashSet::new();
    let mut seen_socials: HashSet<String> = HashSet::new();

    let anchor_sel = Selector::parse("a[href]").expect("static selector");
    for anchor in document.select(&anchor_sel) {
        let href = anchor.value().attr("href").unwrap_or("");
        if let Some(raw) = href.strip_prefix("mailto:") {
            let email = raw.split('?').next().unwrap_or("").trim().to_lowercase();
            if is_plausible_email(&email) && seen_emails.insert(email.clone()) {
                emails.push(email);
            }
        } else if let Some(raw) = href.strip_prefix("tel:") {
            if let Some(phone) = normalizer::normalize_phone(raw) {
                if seen_phones.insert(phone.clone()) {
                    phones.push(phone);
                }
            }
        } else if is_social_link(href) && seen_socials.insert(href.to_string()) {
            socials.push(href.to_string());
        }
    }

    let text = document.root_element().text().collect::<String>();
    for m in EMAIL_RE.find_iter(&text) {
        let email = m.as_str().to_lowercase();
        if is_plausible_email(&email) && seen_emails.insert(email.clone()) {
            emails.push(email);
        }
    }
    for m in PHONE_RE.find_iter(&text) {
        if let Some(phone) = normalizer::normalize_phone(m.as_str()) {
            if seen_phones.insert(phone.clone()) {
                phones.push(phone);
            }
        }
    }

    ContactsRecord {
        emails,
        phones,
        socials,
    }
}

fn is_plausible_email(email: &str) -> bool {
    !email.is_empty()
        && EMAIL_RE.is_match(email)
        && !FILE_SUFFIXES.iter().any(|s| email.ends_with(s))
}

fn is_social_link(href: &str) -> bool {
    let lower = href.to_lowercase();
    if !lower.starts_with("http") {
        return false;
    }
    SOCIAL_HOSTS.iter().any(|host| {
        lower.contains(&format!("//{}", host)) || lower.contains(&format!(".{}", host))
    })
}
