// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 每次请求图片结果上限
pub const MAX_IMAGES: usize = 100;

/// 每次请求视频结果上限
pub const MAX_VIDEOS: usize = 50;

/// 每次请求商品结果上限
pub const MAX_PRODUCTS: usize = 50;

/// 每次请求资源结果上限
pub const MAX_ASSETS: usize = 50;

/// 每类联系方式上限
pub const MAX_CONTACTS_PER_KIND: usize = 20;

/// 标题条目上限
pub const MAX_HEADINGS: usize = 50;

/// 段落条目上限
pub const MAX_PARAGRAPHS: usize = 100;

/// 商品标题最大长度
pub const MAX_TITLE_LEN: usize = 500;

/// 图片记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 绝对URL
    pub url: String,
    /// 替代文本
    #[serde(default)]
    pub alt: String,
    /// 宽度（像素，未知为0）
    #[serde(default)]
    pub width: u32,
    /// 高度（像素，未知为0）
    #[serde(default)]
    pub height: u32,
}

/// 视频记录
///
/// 字符串字段空值表示缺失，数值字段0表示未知，序列化时省略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// 绝对URL
    pub url: String,
    /// 标题
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// 封面图URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub poster: String,
    /// 时长（ISO 8601或秒）
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    /// 宽度
    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: u32,
    /// 高度
    #[serde(default, skip_serializing_if = "is_zero")]
    pub height: u32,
    /// 提供方（youtube、vimeo、direct等）
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    /// MIME类型
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    /// 是否为嵌入式播放器而非直接媒体文件
    #[serde(default)]
    pub is_embedded: bool,
}

/// 商品记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// 标题
    pub title: String,
    /// 价格字符串
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub price: String,
    /// 主图URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// 商品页链接
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
    /// 描述
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// 联系方式记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactsRecord {
    /// 邮箱列表
    #[serde(default)]
    pub emails: Vec<String>,
    /// 电话列表
    #[serde(default)]
    pub phones: Vec<String>,
    /// 社交链接列表
    #[serde(default)]
    pub socials: Vec<String>,
}

impl ContactsRecord {
    /// 三类均为空
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.socials.is_empty()
    }
}

/// 可下载资源记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// 文件名
    pub filename: String,
    /// 绝对URL
    pub url: String,
    /// 类型（小写扩展名）
    pub r#type: String,
}

/// 页面文本记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    /// 页面标题
    #[serde(default)]
    pub title: String,
    /// meta描述
    #[serde(default)]
    pub meta: String,
    /// 标题列表（h1-h3）
    #[serde(default)]
    pub headings: Vec<String>,
    /// 段落列表
    #[serde(default)]
    pub paragraphs: Vec<String>,
}

impl TextRecord {
    /// 没有任何文本内容
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.meta.is_empty()
            && self.headings.is_empty()
            && self.paragraphs.is_empty()
    }
}

/// 抓取结果
///
/// 稀疏记录：每个模块对应一个可选字段，字段存在即非空。
/// 每次请求新建，返回后不可变。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// 图片
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageRecord>>,
    /// 视频
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<VideoRecord>>,
    /// 商品
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ProductRecord>>,
    /// 联系方式
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<ContactsRecord>,
    /// 可下载资源
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<AssetRecord>>,
    /// 同主机URL列表
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl: Option<Vec<String>>,
    /// 页面文本
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextRecord>,
    /// base64编码的截图
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl ScrapeResult {
    /// 所有模块字段均缺席
    pub fn is_empty(&self) -> bool {
        self.images.is_none()
            && self.videos.is_none()
            && self.products.is_none()
            && self.contacts.is_none()
            && self.assets.is_none()
            && self.crawl.is_none()
            && self.text.is_none()
            && self.screenshot.is_none()
    }

    /// 设置列表字段；空列表归一化为None，保持"存在即非空"不变式
    pub fn set_images(&mut self, images: Vec<ImageRecord>) {
        self.images = non_empty(truncated(images, MAX_IMAGES));
    }

    /// 设置视频列表
    pub fn set_videos(&mut self, videos: Vec<VideoRecord>) {
        self.videos = non_empty(truncated(videos, MAX_VIDEOS));
    }

    /// 设置商品列表
    pub fn set_products(&mut self, products: Vec<ProductRecord>) {
        self.products = non_empty(truncated(products, MAX_PRODUCTS));
    }

    /// 设置联系方式；各类截断到每类上限
    pub fn set_contacts(&mut self, mut contacts: ContactsRecord) {
        contacts.emails.truncate(MAX_CONTACTS_PER_KIND);
        contacts.phones.truncate(MAX_CONTACTS_PER_KIND);
        contacts.socials.truncate(MAX_CONTACTS_PER_KIND);
        if !contacts.is_empty() {
            self.contacts = Some(contacts);
        }
    }

    /// 设置资源列表
    pub fn set_assets(&mut self, assets: Vec<AssetRecord>) {
        self.assets = non_empty(truncated(assets, MAX_ASSETS));
    }

    /// 设置爬取链接列表
    pub fn set_crawl(&mut self, urls: Vec<String>, cap: usize) {
        self.crawl = non_empty(truncated(urls, cap));
    }

    /// 设置页面文本；标题与段落列表截断到上限
    pub fn set_text(&mut self, mut text: TextRecord) {
        text.headings.truncate(MAX_HEADINGS);
        text.paragraphs.truncate(MAX_PARAGRAPHS);
        if !text.is_empty() {
            self.text = Some(text);
        }
    }
}

fn truncated<T>(mut items: Vec<T>, cap: usize) -> Vec<T> {
    items.truncate(cap);
    items
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// 实时DOM链接爬取的上限：随深度增长，封顶500
pub fn crawl_cap_for_depth(depth: u32) -> usize {
    ((depth as usize) * 50).clamp(50, 500)
}
