// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;

static CURRENCY_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[£$€¥₹]").unwrap());
static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#\d+;").unwrap());
static NAMED_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&\w+;").unwrap());

/// 归一化后的价格信息
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPrice {
    /// 数值
    pub value: f64,
    /// 货币代码
    pub currency: String,
    /// 原始字符串
    pub original: String,
}

/// 从价格字符串中提取数值与货币
///
/// 处理欧式（逗号为小数点）与美式记法，货币符号映射为ISO代码。
///
/// # 参数
///
/// * `price_str` - 价格字符串，如 "$19.99"、"€1.234,56"
///
/// # 返回值
///
/// 解析成功时返回归一化价格，否则返回None
pub fn normalize_price(price_str: &str) -> Option<NormalizedPrice> {
    if price_str.trim().is_empty() {
        return None;
    }

    let mut cleaned: String = price_str
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if cleaned.contains(',') && cleaned.contains('.') {
        if cleaned.rfind(',') > cleaned.rfind('.') {
            // European format, e.g. "1.234,56"
            cleaned = cleaned.replace('.', "").replace(',', ".");
        } else {
            cleaned = cleaned.replace(',', "");
        }
    } else if cleaned.contains(',') {
        let parts: Vec<&str> = cleaned.split(',').collect();
        if parts.len() == 2 && parts[1].len() <= 2 {
            cleaned = cleaned.replace(',', ".");
        } else {
            cleaned = cleaned.replace(',', "");
        }
    }

    let value: f64 = cleaned.parse().ok()?;

    let currency = CURRENCY_SYMBOL
        .find(price_str)
        .map(|m| match m.as_str() {
            "$" => "USD",
            "€" => "EUR",
            "£" => "GBP",
            "¥" => "JPY",
            "₹" => "INR",
            other => other,
        })
        .unwrap_or("USD")
        .to_string();

    Some(NormalizedPrice {
        value,
        currency,
        original: price_str.to_string(),
    })
}

/// 将电话号码归一化为带国家码的形式
///
/// 少于10位的号码视为无效；10位无前缀的号码默认补"+1"。
pub fn normalize_phone(phone: &str) -> Option<String> {
    let has_plus = phone.trim_start().starts_with('+');
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < 10 {
        return None;
    }

    if digits.len() == 10 && !has_plus {
        return Some(format!("+1{}", digits));
    }

    Some(format!("+{}", digits))
}

/// 清理文本：解码HTML实体并规范化空白
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let decoded = html_escape::decode_html_entities(text);
    let stripped = NUMERIC_ENTITY.replace_all(&decoded, "");
    let stripped = NAMED_ENTITY.replace_all(&stripped, "");

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
