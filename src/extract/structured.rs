// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::{Html, Selector};
use serde_json::Value;

/// 收集HTML中指定@type的JSON-LD节点
///
/// 递归遍历每个 `script[type="application/ld+json"]` 的内容，
/// 展开 @graph、数组与 ItemList.itemListElement 嵌套结构。
///
/// # 参数
///
/// * `html` - 原始HTML
/// * `type_name` - 目标类型名，如 "Product"、"VideoObject"
///
/// # 返回值
///
/// 匹配类型的JSON对象列表
pub fn typed_nodes(html: &str, type_name: &str) -> Vec<Value> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector");

    let mut found = Vec::new();
    for element in document.select(&selector) {
        let text = element.text().collect::<String>();
        if let Ok(json) = serde_json::from_str::<Value>(&text) {
            collect_typed(&json, type_name, &mut found);
        }
    }
    found
}

/// 递归收集目标类型节点
fn collect_typed(value: &Value, type_name: &str, found: &mut Vec<Value>) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::Array(graph)) = obj.get("@graph") {
                for item in graph {
                    collect_typed(item, type_name, found);
                }
            }

            if node_has_type(obj, type_name) {
                found.push(value.clone());
            }

            // ItemList entries wrap their payload in an "item" key
            if let Some(Value::Array(elements)) = obj.get("itemListElement") {
                for element in elements {
                    collect_typed(element, type_name, found);
                    if let Some(item) = element.get("item") {
                        collect_typed(item, type_name, found);
                    }
                }
            }
        }
        Value::Array(arr) => {
            for item in arr {
                collect_typed(item, type_name, found);
            }
        }
        _ => {}
    }
}

/// 判断对象的@type是否匹配（容忍schema.org前缀与数组形式）
fn node_has_type(obj: &serde_json::Map<String, Value>, type_name: &str) -> bool {
    let matches_one = |s: &str| {
        let clean = s
            .strip_prefix("https://schema.org/")
            .or_else(|| s.strip_prefix("http://schema.org/"))
            .unwrap_or(s);
        clean.eq_ignore_ascii_case(type_name)
    };

    match obj.get("@type") {
        Some(Value::String(s)) => matches_one(s),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str())
            .any(matches_one),
        _ => false,
    }
}

/// 从JSON-LD节点读取字符串字段，容忍 {"@value": ...} 包装
pub fn string_field(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => obj
            .get("@value")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// 从image字段读取首个图片URL（字符串、对象或数组形式）
pub fn image_field(node: &Value) -> Option<String> {
    match node.get("image")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("url")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        Value::Array(arr) => arr.first().and_then(|first| match first {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("url")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            _ => None,
        }),
        _ => None,
    }
}

/// 从offers字段读取价格
pub fn offer_price(node: &Value) -> Option<String> {
    let offers = node.get("offers")?;
    let offer = match offers {
        Value::Array(arr) => arr.first()?,
        other => other,
    };
    match offer.get("price")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
