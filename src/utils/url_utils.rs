// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 已知的跟踪查询参数前缀与名称
const TRACKING_PARAMS: &[&str] = &[
    "gclid", "fbclid", "msclkid", "mc_eid", "igshid", "ref", "_hsenc", "_hsmi", "yclid", "dclid",
];

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 规范化请求URL：补全scheme并转为绝对形式
///
/// # 参数
///
/// * `raw` - 用户输入的URL，可能缺少scheme
///
/// # 返回值
///
/// * `Ok(Url)` - 规范化后的绝对URL
/// * `Err(ParseError)` - 无法解析
pub fn normalize_request_url(raw: &str) -> Result<Url, ParseError> {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("https://{}", trimmed))
    }
}

/// 移除URL中的跟踪查询参数（utm_*、gclid、fbclid等）
pub fn strip_tracking_params(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let key = k.to_lowercase();
            !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&key.as_str())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    cleaned
}

/// 获取URL的小写主机名
pub fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// 判断两个URL是否同主机（忽略大小写）
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (host_of(a), host_of(b)) {
        (Some(ha), Some(hb)) => ha == hb,
        _ => false,
    }
}
