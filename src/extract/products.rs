// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_result::ProductRecord;
use crate::extract::structured;
use crate::utils::normalizer;
use crate::utils::url_utils;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// 商品详情页常见的路径片段
const PRODUCT_PATH_HINTS: &[&str] = &["/product", "/products/", "/item/", "/p/", "/dp/", "/shop/"];

/// 非商品链接的路径片段
const EXCLUDED_PATH_HINTS: &[&str] = &[
    "/cart",
    "/checkout",
    "/account",
    "/login",
    "/wishlist",
    "/compare",
    "/filter",
    "/sort",
    "add-to-cart",
];

/// 电商平台的商品卡片选择器
const PLATFORM_CARD_SELECTORS: &[&str] = &[
    // Shopify
    ".product-card, .grid__item .card, [data-product-card]",
    // WooCommerce
    "li.product, .woocommerce ul.products li",
    // Magento
    ".product-item, .products-grid .item",
    // BigCommerce
    ".productGrid .product, article.card",
];

/// 通用商品卡片选择器
const GENERIC_CARD_SELECTORS: &[&str] = &[
    "[class*='product'][class*='card']",
    "[class*='product-item']",
    "[class*='product_item']",
    "[itemtype*='schema.org/Product']",
];

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$€£¥₹]\s*\d[\d.,]*|\d[\d.,]*\s*(?:USD|EUR|GBP|元)").unwrap());

/// 提取策略：按序尝试，首个产出非空结果的策略胜出
type Strategy = fn(&str, &Html, &Url) -> Vec<ProductRecord>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("json-ld", from_json_ld),
    ("platform-cards", from_platform_cards),
    ("product-anchors", from_product_anchors),
    ("generic-cards", from_generic_cards),
    ("last-resort", from_priced_blocks),
];

/// 从HTML中提取商品记录
///
/// 策略按可信度降序排列：JSON-LD结构化数据、已知平台卡片、
/// 商品永久链接锚点、通用卡片、最后兜底的"标题+价格"块。
/// 首个非空策略的结果即为最终结果，不做跨策略合并。
pub fn extract_products(html: &str, base: &Url) -> Vec<ProductRecord> {
    let document = Html::parse_document(html);
    for (name, strategy) in STRATEGIES {
        let mut products = dedup_by_link(strategy(html, &document, base));
        if !products.is_empty() {
            // Price strings that fail numeric parsing are dropped
            for product in &mut products {
                if !product.price.is_empty()
                    && normalizer::normalize_price(&product.price).is_none()
                {
                    product.price.clear();
                }
            }
            tracing::debug!(strategy = name, count = products.len(), "products extracted");
            return products;
        }
    }
    Vec::new()
}

/// 策略1：JSON-LD Product节点
fn from_json_ld(html: &str, _document: &Html, base: &Url) -> Vec<ProductRecord> {
    structured::typed_nodes(html, "Product")
        .iter()
        .filter_map(|node| {
            let title = structured::string_field(node, "name")?;
            let link = structured::string_field(node, "url")
                .and_then(|u| resolve(&u, base))
                .unwrap_or_default();
            Some(ProductRecord {
                title: normalizer::clean_text(&title),
                price: structured::offer_price(node).unwrap_or_default(),
                image: structured::image_field(node)
                    .and_then(|u| resolve(&u, base))
                    .unwrap_or_default(),
                link,
                description: structured::string_field(node, "description")
                    .map(|d| normalizer::clean_text(&d))
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// 策略2：已知电商平台的商品卡片
fn from_platform_cards(_html: &str, document: &Html, base: &Url) -> Vec<ProductRecord> {
    cards_by_selectors(document, base, PLATFORM_CARD_SELECTORS)
}

/// 策略3：指向商品详情页的锚点
fn from_product_anchors(_html: &str, document: &Html, base: &Url) -> Vec<ProductRecord> {
    let anchor_sel = Selector::parse("a[href]").expect("static selector");
    let img_sel = Selector::parse("img").expect("static selector");
    let mut products = Vec::new();

    for anchor in document.select(&anchor_sel) {
        let href = anchor.value().attr("href").unwrap_or("");
        let Some(link) = resolve(href, base) else {
            continue;
        };
        if !has_product_path(&link) || is_excluded_link(&link) {
            continue;
        }

        let title = normalizer::clean_text(&anchor.text().collect::<String>());
        let title = if title.is_empty() {
            anchor
                .select(&img_sel)
                .next()
                .and_then(|img| img.value().attr("alt"))
                .map(normalizer::clean_text)
                .unwrap_or_default()
        } else {
            title
        };
        if title.is_empty() {
            continue;
        }

        let image = anchor
            .select(&img_sel)
            .next()
            .and_then(|img| img.value().attr("src").or(img.value().attr("data-src")))
            .and_then(|src| resolve(src, base))
            .unwrap_or_default();

        products.push(ProductRecord {
            title,
            price: String::new(),
            image,
            link,
            description: String::new(),
        });
    }
    products
}

/// 策略4：类名暗示商品的通用卡片
fn from_generic_cards(_html: &str, document: &Html, base: &Url) -> Vec<ProductRecord> {
    cards_by_selectors(document, base, GENERIC_CARD_SELECTORS)
}

/// 策略5：兜底，"有标题且有数字价格"的块
///
/// 仍需满足接受条件：链接是商品路径，或块内有图片
fn from_priced_blocks(_html: &str, document: &Html, base: &Url) -> Vec<ProductRecord> {
    let block_sel = Selector::parse("article, li, div[class]").expect("static selector");
    let heading_sel = Selector::parse("h1, h2, h3, h4").expect("static selector");
    let mut products = Vec::new();

    for block in document.select(&block_sel) {
        let text = block.text().collect::<String>();
        let Some(price_match) = PRICE_RE.find(&text) else {
            continue;
        };
        let Some(heading) = block.select(&heading_sel).next() else {
            continue;
        };
        let title = normalizer::clean_text(&heading.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let record = build_card(&block, base, title, price_match.as_str().to_string());
        if !has_product_path(&record.link) && record.image.is_empty() {
            continue;
        }
        products.push(record);
        if products.len() >= 50 {
            break;
        }
    }
    products
}

/// 用一组选择器扫描卡片
fn cards_by_selectors(document: &Html, base: &Url, selectors: &[&str]) -> Vec<ProductRecord> {
    let mut products = Vec::new();
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for card in document.select(&selector) {
            if let Some(product) = card_to_product(&card, base) {
                products.push(product);
            }
        }
        if !products.is_empty() {
            break;
        }
    }
    products
}

/// 将单个卡片元素转为商品记录
///
/// 接受条件：有标题，且（链接是商品路径，或同时有图片与数字价格）
fn card_to_product(card: &ElementRef, base: &Url) -> Option<ProductRecord> {
    let title_sel =
        Selector::parse("h1, h2, h3, h4, [class*='title'], [class*='name'], a").expect("static selector");
    let title = card
        .select(&title_sel)
        .map(|el| normalizer::clean_text(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())?;

    let text = card.text().collect::<String>();
    let price = PRICE_RE
        .find(&text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let record = build_card(card, base, title, price);
    if is_excluded_link(&record.link) {
        return None;
    }

    let accepted = has_product_path(&record.link)
        || (!record.image.is_empty() && !record.price.is_empty());
    accepted.then_some(record)
}

fn build_card(card: &ElementRef, base: &Url, title: String, price: String) -> ProductRecord {
    let anchor_sel = Selector::parse("a[href]").expect("static selector");
    let img_sel = Selector::parse("img").expect("static selector");

    let link = card
        .select(&anchor_sel)
        .filter_map(|a| resolve(a.value().attr("href").unwrap_or(""), base))
        .find(|l| !is_excluded_link(l))
        .unwrap_or_default();

    let image = card
        .select(&img_sel)
        .filter_map(|img| {
            img.value()
                .attr("src")
                .or(img.value().attr("data-src"))
                .or(img.value().attr("data-lazy-src"))
        })
        .filter_map(|src| resolve(src, base))
        .next()
        .unwrap_or_default();

    ProductRecord {
        title,
        price,
        image,
        link,
        description: String::new(),
    }
}

fn has_product_path(link: &str) -> bool {
    let lower = link.to_lowercase();
    PRODUCT_PATH_HINTS.iter().any(|hint| lower.contains(hint))
}

fn is_excluded_link(link: &str) -> bool {
    let lower = link.to_lowercase();
    EXCLUDED_PATH_HINTS.iter().any(|hint| lower.contains(hint))
}

/// 按解析后的链接URL去重；无链接的记录按标题去重
fn dedup_by_link(products: Vec<ProductRecord>) -> Vec<ProductRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    products
        .into_iter()
        .filter(|p| {
            let key = if p.link.is_empty() {
                format!("title:{}", p.title)
            } else {
                p.link.clone()
            };
            seen.insert(key)
        })
        .collect()
}

fn resolve(raw: &str, base: &Url) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("javascript:") {
        return None;
    }
    let resolved = url_utils::resolve_url(base, trimmed).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    Some(resolved.to_string())
}
