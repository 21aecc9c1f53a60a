// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 可下载资源提取
pub mod assets;

/// 联系方式提取
pub mod contacts;

/// 图片提取与CDN画质升级
pub mod images;

/// 同主机链接提取
pub mod links;

/// 商品提取策略级联
pub mod products;

/// JSON-LD结构化数据遍历
pub mod structured;

/// 页面文本提取
pub mod text;

/// 视频候选收集与有效性分类
pub mod videos;
